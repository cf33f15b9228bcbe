//! Persisted payroll records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuditTrace, PayPeriod, PayrollBreakdown};

/// Lifecycle status of a payroll record.
///
/// The processing protocol only ever persists `processing` and `paid`
/// inside one atomic unit. `failed` and `cancelled` are terminal
/// alternatives reachable only before `paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    /// Created but not yet being processed.
    Pending,
    /// Inside the atomic unit; no transaction linked yet.
    Processing,
    /// The linked ledger transaction exists.
    Paid,
    /// Processing failed.
    Failed,
    /// Processing was cancelled.
    Cancelled,
}

impl PayrollStatus {
    /// Returns the snake_case name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            PayrollStatus::Pending => "pending",
            PayrollStatus::Processing => "processing",
            PayrollStatus::Paid => "paid",
            PayrollStatus::Failed => "failed",
            PayrollStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a snake_case status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PayrollStatus::Pending),
            "processing" => Some(PayrollStatus::Processing),
            "paid" => Some(PayrollStatus::Paid),
            "failed" => Some(PayrollStatus::Failed),
            "cancelled" => Some(PayrollStatus::Cancelled),
            _ => None,
        }
    }

    /// Returns true if a record in this status blocks another run for the
    /// same employee and period.
    pub fn is_active(self) -> bool {
        matches!(self, PayrollStatus::Processing | PayrollStatus::Paid)
    }

    /// Returns true if the status can never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PayrollStatus::Paid | PayrollStatus::Failed | PayrollStatus::Cancelled
        )
    }

    /// Returns true if moving from `self` to `next` is allowed.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::PayrollStatus;
    ///
    /// assert!(PayrollStatus::Processing.can_transition_to(PayrollStatus::Paid));
    /// assert!(!PayrollStatus::Paid.can_transition_to(PayrollStatus::Cancelled));
    /// ```
    pub fn can_transition_to(self, next: PayrollStatus) -> bool {
        match self {
            PayrollStatus::Pending => matches!(
                next,
                PayrollStatus::Processing | PayrollStatus::Failed | PayrollStatus::Cancelled
            ),
            PayrollStatus::Processing => matches!(
                next,
                PayrollStatus::Paid | PayrollStatus::Failed | PayrollStatus::Cancelled
            ),
            PayrollStatus::Paid | PayrollStatus::Failed | PayrollStatus::Cancelled => false,
        }
    }
}

impl fmt::Display for PayrollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export bookkeeping on a paid record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportInfo {
    /// When the record was exported.
    pub exported_at: DateTime<Utc>,
    /// The reference assigned by the export target (e.g., a bank batch id).
    pub reference: String,
}

/// One employee's committed payroll for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRecord {
    /// Unique identifier for this record.
    pub id: Uuid,
    /// The employee paid.
    pub employee_id: String,
    /// The employee's organization.
    pub organization_id: String,
    /// The period paid.
    pub period: PayPeriod,
    /// The computed breakdown.
    pub breakdown: PayrollBreakdown,
    /// The calculation's audit trace.
    pub audit_trace: AuditTrace,
    /// Current status.
    pub status: PayrollStatus,
    /// The linked ledger transaction, set when the record becomes paid.
    pub transaction_id: Option<Uuid>,
    /// When the record became paid.
    pub paid_at: Option<DateTime<Utc>>,
    /// Who triggered the run.
    pub processed_by: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Export bookkeeping.
    #[serde(default)]
    pub export: Option<ExportInfo>,
}
