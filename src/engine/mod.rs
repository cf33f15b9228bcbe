//! The payroll processing engine.
//!
//! [`PayrollEngine`] turns a salary breakdown into a committed payroll
//! record and ledger transaction, exactly once per employee and period, and
//! runs that protocol across whole organizations.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use payroll_engine::config::EngineConfig;
//! use payroll_engine::engine::{PayrollEngine, PayrollRequest};
//! use payroll_engine::store::MemoryStore;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MemoryStore::new();
//! let engine = PayrollEngine::builder(
//!     EngineConfig::default(),
//!     Arc::new(store.clone()),
//!     Arc::new(store),
//! )
//! .build()
//! .unwrap();
//!
//! let result = engine.process(PayrollRequest::new("emp_404", 2024, 3)).await;
//! assert_eq!(result.unwrap_err().code(), "EMPLOYEE_NOT_FOUND");
//! # }
//! ```

mod bulk;
mod processor;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::collaborators::{
    AttendanceSource, BatchSummary, EmployeeDirectory, HolidayCalendar, PayrollNotifier,
};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::models::{AttendanceFact, LedgerTransaction, PayrollRecord};
use crate::store::PayrollStore;

/// Calculates and commits payroll.
///
/// Cheap to clone; every collaborator is shared.
#[derive(Clone)]
pub struct PayrollEngine {
    config: Arc<EngineConfig>,
    employees: Arc<dyn EmployeeDirectory>,
    store: Arc<dyn PayrollStore>,
    attendance: Option<Arc<dyn AttendanceSource>>,
    holidays: Option<Arc<dyn HolidayCalendar>>,
    notifier: Option<Arc<dyn PayrollNotifier>>,
}

impl PayrollEngine {
    /// Starts building an engine from its required parts.
    pub fn builder(
        config: EngineConfig,
        employees: Arc<dyn EmployeeDirectory>,
        store: Arc<dyn PayrollStore>,
    ) -> PayrollEngineBuilder {
        PayrollEngineBuilder {
            config,
            employees,
            store,
            attendance: None,
            holidays: None,
            notifier: None,
        }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Builder for [`PayrollEngine`].
pub struct PayrollEngineBuilder {
    config: EngineConfig,
    employees: Arc<dyn EmployeeDirectory>,
    store: Arc<dyn PayrollStore>,
    attendance: Option<Arc<dyn AttendanceSource>>,
    holidays: Option<Arc<dyn HolidayCalendar>>,
    notifier: Option<Arc<dyn PayrollNotifier>>,
}

impl PayrollEngineBuilder {
    /// Uses an attendance source for requests that carry no attendance.
    pub fn attendance(mut self, source: Arc<dyn AttendanceSource>) -> Self {
        self.attendance = Some(source);
        self
    }

    /// Uses a holiday calendar when counting working days.
    pub fn holidays(mut self, calendar: Arc<dyn HolidayCalendar>) -> Self {
        self.holidays = Some(calendar);
        self
    }

    /// Sends payroll events to a notifier.
    pub fn notifier(mut self, notifier: Arc<dyn PayrollNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Validates the configuration and builds the engine.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration fails validation.
    pub fn build(self) -> EngineResult<PayrollEngine> {
        self.config.validate()?;
        Ok(PayrollEngine {
            config: Arc::new(self.config),
            employees: self.employees,
            store: self.store,
            attendance: self.attendance,
            holidays: self.holidays,
            notifier: self.notifier,
        })
    }
}

/// A request to pay one employee for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRequest {
    /// The employee to pay.
    pub employee_id: String,
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Attendance supplied by the caller; takes precedence over the
    /// attendance source.
    #[serde(default)]
    pub attendance: Option<AttendanceFact>,
    /// Who triggered the run.
    #[serde(default)]
    pub processed_by: Option<String>,
}

impl PayrollRequest {
    /// Creates a request without attendance or operator.
    pub fn new(employee_id: impl Into<String>, year: i32, month: u32) -> Self {
        Self {
            employee_id: employee_id.into(),
            month,
            year,
            attendance: None,
            processed_by: None,
        }
    }

    /// Supplies the attendance fact directly.
    pub fn with_attendance(mut self, attendance: AttendanceFact) -> Self {
        self.attendance = Some(attendance);
        self
    }

    /// Records who triggered the run.
    pub fn processed_by(mut self, operator: impl Into<String>) -> Self {
        self.processed_by = Some(operator.into());
        self
    }
}

/// The committed output of one payroll run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedPayroll {
    /// The paid record.
    pub record: PayrollRecord,
    /// The linked ledger transaction.
    pub transaction: LedgerTransaction,
}

/// A request to pay many employees of one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRequest {
    /// The organization to pay.
    pub organization_id: String,
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Employees to pay; every employee of the organization when `None`.
    #[serde(default)]
    pub employee_ids: Option<Vec<String>>,
    /// Who triggered the run.
    #[serde(default)]
    pub processed_by: Option<String>,
}

impl BulkRequest {
    /// Creates a request for every employee of an organization.
    pub fn new(organization_id: impl Into<String>, year: i32, month: u32) -> Self {
        Self {
            organization_id: organization_id.into(),
            month,
            year,
            employee_ids: None,
            processed_by: None,
        }
    }
}

/// One employee that could not be paid in a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    /// The employee.
    pub employee_id: String,
    /// Stable error code, see [`EngineError::code`](crate::error::EngineError::code).
    pub code: String,
    /// Human-readable error.
    pub error: String,
}

/// The outcome of a bulk run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    /// Employees considered.
    pub total: usize,
    /// Employees paid.
    pub successful: Vec<ProcessedPayroll>,
    /// Employees that failed.
    pub failed: Vec<BulkFailure>,
    /// Employees not started because the run was cancelled.
    pub skipped: Vec<String>,
    /// True if cancellation was requested during the run.
    pub cancelled: bool,
}

impl BulkResult {
    /// Counts and money totals of the run.
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.total,
            successful: self.successful.len(),
            failed: self.failed.len(),
            skipped: self.skipped.len(),
            total_gross: self
                .successful
                .iter()
                .map(|paid| paid.record.breakdown.gross_salary)
                .sum(),
            total_net: self
                .successful
                .iter()
                .map(|paid| paid.record.breakdown.net_salary)
                .sum(),
        }
    }
}

/// Cooperative cancellation for bulk runs.
///
/// Checked before each employee starts; an employee already in progress
/// always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates a flag that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
