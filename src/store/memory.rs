//! In-memory reference implementations.
//!
//! [`MemoryStore`] is both an employee directory and a payroll store. A unit
//! holds the store lock from `begin` until it commits or rolls back and
//! works on a private copy of the state, so units are serialised and a
//! dropped unit leaves nothing behind.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::collaborators::{AttendanceSource, EmployeeDirectory, HolidayCalendar};
use crate::error::{CollaboratorError, StoreError};
use crate::models::{
    AttendanceFact, Employee, ExportInfo, LedgerTransaction, PayrollRecord, PayrollStats,
    PayrollStatus, PublicHoliday,
};

use super::{ACTIVE_PERIOD_CONSTRAINT, PayrollStore, PayrollUnit};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    employees: BTreeMap<String, Employee>,
    records: Vec<PayrollRecord>,
    transactions: Vec<LedgerTransaction>,
}

impl MemoryState {
    fn active_record(&self, employee_id: &str, month: u32, year: i32) -> Option<&PayrollRecord> {
        self.records.iter().find(|record| {
            record.employee_id == employee_id
                && record.period.month == month
                && record.period.year == year
                && record.status.is_active()
        })
    }

    fn record_mut(&mut self, record_id: Uuid) -> Result<&mut PayrollRecord, StoreError> {
        self.records
            .iter_mut()
            .find(|record| record.id == record_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "payroll_record".to_string(),
                id: record_id.to_string(),
            })
    }

    fn employee_mut(&mut self, employee_id: &str) -> Result<&mut Employee, StoreError> {
        self.employees
            .get_mut(employee_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "employee".to_string(),
                id: employee_id.to_string(),
            })
    }
}

/// An in-memory employee directory and payroll store.
///
/// # Example
///
/// ```
/// use payroll_engine::store::{MemoryStore, PayrollStore};
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// let records = store.records_for_employee("emp_001").await.unwrap();
/// assert!(records.is_empty());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an employee.
    pub async fn insert_employee(&self, employee: Employee) {
        let mut state = self.state.lock().await;
        state.employees.insert(employee.id.clone(), employee);
    }

    /// Returns an employee as currently stored.
    pub async fn employee(&self, employee_id: &str) -> Option<Employee> {
        self.state.lock().await.employees.get(employee_id).cloned()
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryStore {
    async fn find_employee(&self, employee_id: &str) -> Result<Option<Employee>, CollaboratorError> {
        Ok(self.employee(employee_id).await)
    }

    async fn list_employees(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Employee>, CollaboratorError> {
        let state = self.state.lock().await;
        Ok(state
            .employees
            .values()
            .filter(|employee| employee.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn PayrollUnit>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnit { guard, working }))
    }

    async fn find_record(&self, record_id: Uuid) -> Result<Option<PayrollRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .iter()
            .find(|record| record.id == record_id)
            .cloned())
    }

    async fn find_active_record(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> Result<Option<PayrollRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.active_record(employee_id, month, year).cloned())
    }

    async fn records_for_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<PayrollRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .iter()
            .filter(|record| record.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn transactions_for_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<LedgerTransaction>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .filter(|transaction| transaction.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn mark_exported(
        &self,
        record_id: Uuid,
        reference: &str,
        exported_at: DateTime<Utc>,
    ) -> Result<PayrollRecord, StoreError> {
        let mut state = self.state.lock().await;
        let record = state.record_mut(record_id)?;
        record.export = Some(ExportInfo {
            exported_at,
            reference: reference.to_string(),
        });
        Ok(record.clone())
    }
}

struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl PayrollUnit for MemoryUnit {
    async fn find_active_record(
        &mut self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> Result<Option<PayrollRecord>, StoreError> {
        Ok(self.working.active_record(employee_id, month, year).cloned())
    }

    async fn insert_record(&mut self, record: &PayrollRecord) -> Result<(), StoreError> {
        if record.status.is_active()
            && self
                .working
                .active_record(&record.employee_id, record.period.month, record.period.year)
                .is_some()
        {
            return Err(StoreError::UniqueViolation {
                constraint: ACTIVE_PERIOD_CONSTRAINT.to_string(),
            });
        }
        self.working.records.push(record.clone());
        Ok(())
    }

    async fn insert_transaction(
        &mut self,
        transaction: &LedgerTransaction,
    ) -> Result<(), StoreError> {
        self.working.transactions.push(transaction.clone());
        Ok(())
    }

    async fn mark_paid(
        &mut self,
        record_id: Uuid,
        transaction_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = self.working.record_mut(record_id)?;
        if !record.status.can_transition_to(PayrollStatus::Paid) {
            return Err(StoreError::InvalidTransition {
                record_id: record_id.to_string(),
                from: record.status.to_string(),
                to: PayrollStatus::Paid.to_string(),
            });
        }
        record.status = PayrollStatus::Paid;
        record.transaction_id = Some(transaction_id);
        record.paid_at = Some(paid_at);
        Ok(())
    }

    async fn employee_stats(&mut self, employee_id: &str) -> Result<PayrollStats, StoreError> {
        Ok(self.working.employee_mut(employee_id)?.payroll_stats.clone())
    }

    async fn update_employee_stats(
        &mut self,
        employee_id: &str,
        stats: &PayrollStats,
    ) -> Result<(), StoreError> {
        self.working.employee_mut(employee_id)?.payroll_stats = stats.clone();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUnit { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Attendance facts held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticAttendance {
    facts: HashMap<(String, i32, u32), AttendanceFact>,
}

impl StaticAttendance {
    /// Creates a source with no facts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the fact for an employee and month.
    pub fn with_fact(
        mut self,
        employee_id: impl Into<String>,
        year: i32,
        month: u32,
        fact: AttendanceFact,
    ) -> Self {
        self.facts.insert((employee_id.into(), year, month), fact);
        self
    }
}

#[async_trait]
impl AttendanceSource for StaticAttendance {
    async fn attendance(
        &self,
        _organization_id: &str,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Option<AttendanceFact>, CollaboratorError> {
        Ok(self
            .facts
            .get(&(employee_id.to_string(), year, month))
            .copied())
    }
}

/// A fixed holiday list shared by every organization.
#[derive(Debug, Clone, Default)]
pub struct StaticHolidays {
    holidays: Vec<PublicHoliday>,
}

impl StaticHolidays {
    /// Creates a calendar from a holiday list.
    pub fn new(holidays: Vec<PublicHoliday>) -> Self {
        Self { holidays }
    }
}

#[async_trait]
impl HolidayCalendar for StaticHolidays {
    async fn holidays(
        &self,
        _organization_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PublicHoliday>, CollaboratorError> {
        Ok(self
            .holidays
            .iter()
            .filter(|holiday| holiday.date >= start && holiday.date <= end)
            .cloned()
            .collect())
    }
}
