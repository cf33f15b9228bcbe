//! Traits for the systems the engine reads from and reports to.
//!
//! The engine never administers employees, keeps attendance or sends
//! notifications itself. It reaches those systems through these traits,
//! held as `Arc<dyn Trait>`.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CollaboratorError;
use crate::models::{AttendanceFact, Employee, PayPeriod, PublicHoliday};

/// Read access to employees and their compensation profiles.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Finds an employee by id.
    async fn find_employee(&self, employee_id: &str) -> Result<Option<Employee>, CollaboratorError>;

    /// Lists every employee of an organization, in a stable order.
    async fn list_employees(&self, organization_id: &str)
    -> Result<Vec<Employee>, CollaboratorError>;
}

/// Attendance facts for one employee and month.
#[async_trait]
pub trait AttendanceSource: Send + Sync {
    /// Returns the attendance fact, or `None` when nothing was recorded.
    async fn attendance(
        &self,
        organization_id: &str,
        employee_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Option<AttendanceFact>, CollaboratorError>;
}

/// Public holidays observed by an organization.
#[async_trait]
pub trait HolidayCalendar: Send + Sync {
    /// Returns the holidays from `start` to `end` inclusive.
    async fn holidays(
        &self,
        organization_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PublicHoliday>, CollaboratorError>;
}

/// Sent after a payroll commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryProcessedEvent {
    /// The employee paid.
    pub employee_id: String,
    /// The committed payroll record.
    pub payroll_id: Uuid,
    /// The period paid.
    pub period: PayPeriod,
    /// Gross salary.
    pub gross_salary: Decimal,
    /// Net salary.
    pub net_salary: Decimal,
    /// The linked ledger transaction.
    pub transaction_id: Uuid,
}

/// Totals for a bulk run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Employees considered.
    pub total: usize,
    /// Employees paid.
    pub successful: usize,
    /// Employees that failed.
    pub failed: usize,
    /// Employees not started because the run was cancelled.
    pub skipped: usize,
    /// Sum of gross salaries paid.
    pub total_gross: Decimal,
    /// Sum of net salaries paid.
    pub total_net: Decimal,
}

/// Sent once when a bulk run finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCompletedEvent {
    /// The organization processed.
    pub organization_id: String,
    /// Month processed.
    pub month: u32,
    /// Year processed.
    pub year: i32,
    /// Outcome counts and totals.
    pub summary: BatchSummary,
}

/// Receives payroll events.
///
/// Delivery is best effort: the engine logs and ignores errors.
#[async_trait]
pub trait PayrollNotifier: Send + Sync {
    /// A single payroll committed.
    async fn salary_processed(&self, event: SalaryProcessedEvent) -> Result<(), CollaboratorError>;

    /// A bulk run finished.
    async fn batch_completed(&self, event: BatchCompletedEvent) -> Result<(), CollaboratorError>;
}
