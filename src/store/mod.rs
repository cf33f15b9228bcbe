//! Transactional storage for payroll records and ledger transactions.
//!
//! A [`PayrollStore`] hands out [`PayrollUnit`]s. Everything written through
//! a unit becomes visible together on [`PayrollUnit::commit`] or not at all.
//! Both backends enforce, at storage level, that an employee has at most one
//! `processing` or `paid` record per period.

mod memory;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{LedgerTransaction, PayrollRecord, PayrollStats};

pub use memory::{MemoryStore, StaticAttendance, StaticHolidays};
pub use sqlite::SqliteStore;

/// Name reported when the one-active-record-per-period rule is violated.
pub const ACTIVE_PERIOD_CONSTRAINT: &str = "ux_payroll_active_period";

/// Durable storage for payroll output.
#[async_trait]
pub trait PayrollStore: Send + Sync {
    /// Starts an atomic unit of work.
    async fn begin(&self) -> Result<Box<dyn PayrollUnit>, StoreError>;

    /// Finds a record by id.
    async fn find_record(&self, record_id: Uuid) -> Result<Option<PayrollRecord>, StoreError>;

    /// Finds the `processing` or `paid` record for an employee and period.
    async fn find_active_record(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> Result<Option<PayrollRecord>, StoreError>;

    /// All records of an employee, oldest first.
    async fn records_for_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<PayrollRecord>, StoreError>;

    /// All ledger transactions of an employee, oldest first.
    async fn transactions_for_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<LedgerTransaction>, StoreError>;

    /// Records that a paid record was exported.
    async fn mark_exported(
        &self,
        record_id: Uuid,
        reference: &str,
        exported_at: DateTime<Utc>,
    ) -> Result<PayrollRecord, StoreError>;
}

/// One atomic unit of work.
///
/// Dropping a unit without committing discards its writes.
#[async_trait]
pub trait PayrollUnit: Send {
    /// Finds the `processing` or `paid` record for an employee and period,
    /// as seen inside this unit.
    async fn find_active_record(
        &mut self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> Result<Option<PayrollRecord>, StoreError>;

    /// Inserts a record.
    ///
    /// Fails with [`StoreError::UniqueViolation`] if the employee already has
    /// an active record for the period.
    async fn insert_record(&mut self, record: &PayrollRecord) -> Result<(), StoreError>;

    /// Inserts a ledger transaction.
    async fn insert_transaction(&mut self, transaction: &LedgerTransaction)
    -> Result<(), StoreError>;

    /// Moves a record to `paid`, linking the transaction.
    async fn mark_paid(
        &mut self,
        record_id: Uuid,
        transaction_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Reads an employee's payroll statistics.
    async fn employee_stats(&mut self, employee_id: &str) -> Result<PayrollStats, StoreError>;

    /// Replaces an employee's payroll statistics.
    async fn update_employee_stats(
        &mut self,
        employee_id: &str,
        stats: &PayrollStats,
    ) -> Result<(), StoreError>;

    /// Makes every write of the unit visible.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards every write of the unit.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
