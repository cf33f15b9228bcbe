//! Employee model and related types.
//!
//! The employee entity is owned by an external HR system; the engine reads
//! its status, employment window and compensation, and writes back only the
//! [`PayrollStats`] running totals.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CompensationProfile;
use crate::calculation::round_currency;

/// Lifecycle status of an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    /// Currently employed and working.
    Active,
    /// Employed but on approved leave; still paid.
    OnLeave,
    /// Employment suspended; not paid.
    Suspended,
    /// Employment ended.
    Terminated,
}

impl EmployeeStatus {
    /// Returns true if payroll may run for an employee in this status.
    pub fn is_payable(self) -> bool {
        matches!(self, EmployeeStatus::Active | EmployeeStatus::OnLeave)
    }

    /// Returns the snake_case name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::OnLeave => "on_leave",
            EmployeeStatus::Suspended => "suspended",
            EmployeeStatus::Terminated => "terminated",
        }
    }
}

/// Running payroll statistics kept on the employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PayrollStats {
    /// Net amount paid over the employee's lifetime.
    pub total_paid: Decimal,
    /// Number of payments over the employee's lifetime.
    pub payment_count: u32,
    /// Number of payments in `stats_year`.
    pub payments_this_year: u32,
    /// The calendar year `payments_this_year` counts.
    pub stats_year: Option<i32>,
    /// `total_paid / payment_count`, rounded to whole units.
    pub average_monthly: Decimal,
    /// Date of the most recent payment.
    pub last_payment_date: Option<NaiveDate>,
    /// Expected date of the next payment.
    pub next_payment_date: Option<NaiveDate>,
}

impl PayrollStats {
    /// Returns the statistics after one more payment of `net_amount` at
    /// `paid_at`.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::PayrollStats;
    /// use chrono::{TimeZone, Utc, NaiveDate};
    /// use rust_decimal::Decimal;
    ///
    /// let paid_at = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
    /// let stats = PayrollStats::default().record_payment(Decimal::from(50_000), paid_at);
    ///
    /// assert_eq!(stats.total_paid, Decimal::from(50_000));
    /// assert_eq!(stats.payments_this_year, 1);
    /// assert_eq!(stats.next_payment_date, NaiveDate::from_ymd_opt(2024, 4, 30));
    /// ```
    pub fn record_payment(&self, net_amount: Decimal, paid_at: DateTime<Utc>) -> Self {
        let paid_on = paid_at.date_naive();
        let total_paid = self.total_paid + net_amount;
        let payment_count = self.payment_count + 1;
        let payments_this_year = if self.stats_year == Some(paid_on.year()) {
            self.payments_this_year + 1
        } else {
            1
        };

        Self {
            total_paid,
            payment_count,
            payments_this_year,
            stats_year: Some(paid_on.year()),
            average_monthly: round_currency(total_paid / Decimal::from(payment_count)),
            last_payment_date: Some(paid_on),
            next_payment_date: paid_on.checked_add_months(Months::new(1)),
        }
    }
}

/// Represents an employee the engine can pay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// The organization (tenant) the employee belongs to.
    pub organization_id: String,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: EmployeeStatus,
    /// First day of employment.
    pub hire_date: NaiveDate,
    /// Last day of employment, if terminated or scheduled to terminate.
    #[serde(default)]
    pub termination_date: Option<NaiveDate>,
    /// Compensation terms; `None` means the profile was never linked.
    #[serde(default)]
    pub compensation: Option<CompensationProfile>,
    /// Running payroll statistics.
    #[serde(default)]
    pub payroll_stats: PayrollStats,
}

impl Employee {
    /// Returns the reason the employee cannot be paid, or `None` if eligible.
    ///
    /// Eligibility requires a payable status and a positive base amount.
    pub fn ineligibility_reason(&self) -> Option<String> {
        if !self.status.is_payable() {
            return Some(format!("status is {}", self.status.as_str()));
        }
        match &self.compensation {
            Some(profile) if profile.base_amount > Decimal::ZERO => None,
            Some(profile) => Some(format!(
                "base compensation {} is not positive",
                profile.base_amount
            )),
            None => Some("no compensation profile".to_string()),
        }
    }
}
