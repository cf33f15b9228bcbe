//! Proration of compensation across partial employment windows.
//!
//! An employee hired or terminated inside a pay period is paid for the
//! fraction of the period's working days they were employed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::AuditStep;

use super::working_days::{HolidaySet, Workweek, count_working_days};

/// Why a period was or was not prorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProrationReason {
    /// Employed for the whole period.
    Full,
    /// Hired after the period started.
    NewHire,
    /// Terminated before the period ended.
    Termination,
    /// Hired after the start and terminated before the end.
    Both,
}

impl ProrationReason {
    /// The snake_case name used in audit output.
    pub fn as_str(self) -> &'static str {
        match self {
            ProrationReason::Full => "full",
            ProrationReason::NewHire => "new_hire",
            ProrationReason::Termination => "termination",
            ProrationReason::Both => "both",
        }
    }
}

/// Employment dates and the period being paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProrationInput {
    /// First day of employment.
    pub hire_date: NaiveDate,
    /// Last day of employment, if terminated.
    pub termination_date: Option<NaiveDate>,
    /// First day of the pay period.
    pub period_start: NaiveDate,
    /// Last day of the pay period.
    pub period_end: NaiveDate,
}

/// The proration outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProrationResult {
    /// Effective working days over period working days, in `[0, 1]`.
    pub ratio: Decimal,
    /// True when `ratio < 1`.
    pub is_prorated: bool,
    /// Why the ratio is what it is.
    pub reason: ProrationReason,
    /// Working days in the whole period.
    pub period_working_days: u32,
    /// Working days inside the employment window.
    pub effective_working_days: u32,
}

/// The result of a proration calculation, including the audit step.
#[derive(Debug, Clone)]
pub struct ProrationCalculation {
    /// The proration outcome.
    pub result: ProrationResult,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Determines the proration reason from the raw employment dates.
fn proration_reason(input: &ProrationInput) -> ProrationReason {
    let hired_inside = input.hire_date > input.period_start;
    let terminated_inside = input
        .termination_date
        .is_some_and(|end| end < input.period_end);

    match (hired_inside, terminated_inside) {
        (true, true) => ProrationReason::Both,
        (true, false) => ProrationReason::NewHire,
        (false, true) => ProrationReason::Termination,
        (false, false) => ProrationReason::Full,
    }
}

/// Calculates the fraction of a pay period an employee was employed for,
/// measured in working days.
///
/// The employment window is clipped to the period. When the window does not
/// intersect the period at all the ratio is zero, though the reason and the
/// period's working days are still reported. A period with no working days
/// also yields a zero ratio.
///
/// # Arguments
///
/// * `input` - Employment dates and period bounds
/// * `workweek` - The organization's working weekdays
/// * `holidays` - Holiday dates excluded from working days
/// * `step_number` - The step number for audit trail sequencing
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::{
///     calculate_proration, HolidaySet, ProrationInput, ProrationReason, Workweek,
/// };
/// use chrono::NaiveDate;
///
/// let input = ProrationInput {
///     hire_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
///     termination_date: None,
///     period_start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
///     period_end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
/// };
///
/// let calculation = calculate_proration(&input, &Workweek::default(), &HolidaySet::new(), 1);
/// // 11 of 21 working days
/// assert_eq!(calculation.result.period_working_days, 21);
/// assert_eq!(calculation.result.effective_working_days, 11);
/// assert_eq!(calculation.result.reason, ProrationReason::NewHire);
/// assert!(calculation.result.is_prorated);
/// ```
pub fn calculate_proration(
    input: &ProrationInput,
    workweek: &Workweek,
    holidays: &HolidaySet,
    step_number: u32,
) -> ProrationCalculation {
    let reason = proration_reason(input);
    let period_working_days =
        count_working_days(input.period_start, input.period_end, workweek, holidays)
            .working_days;

    let effective_start = input.hire_date.max(input.period_start);
    let effective_end = input
        .termination_date
        .unwrap_or(input.period_end)
        .min(input.period_end);

    let inactive = effective_start > input.period_end
        || input
            .termination_date
            .is_some_and(|end| end < input.period_start);

    let effective_working_days = if inactive {
        0
    } else {
        count_working_days(effective_start, effective_end, workweek, holidays).working_days
    };

    let ratio = if inactive || period_working_days == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(effective_working_days) / Decimal::from(period_working_days))
            .clamp(Decimal::ZERO, Decimal::ONE)
    };
    let is_prorated = ratio < Decimal::ONE;

    let result = ProrationResult {
        ratio,
        is_prorated,
        reason,
        period_working_days,
        effective_working_days,
    };

    let reasoning = if inactive {
        format!(
            "Employment window does not intersect {} to {}; nothing is payable",
            input.period_start, input.period_end
        )
    } else if is_prorated {
        format!(
            "Employed {} of {} working days ({}), ratio {}",
            effective_working_days,
            period_working_days,
            reason.as_str(),
            ratio.round_dp(4).normalize()
        )
    } else {
        format!(
            "Employed for all {} working days; no proration",
            period_working_days
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "proration".to_string(),
        rule_name: "Working-Day Proration".to_string(),
        input: serde_json::json!({
            "hire_date": input.hire_date,
            "termination_date": input.termination_date,
            "period_start": input.period_start,
            "period_end": input.period_end,
        }),
        output: serde_json::json!({
            "ratio": ratio.normalize().to_string(),
            "is_prorated": is_prorated,
            "reason": reason.as_str(),
            "period_working_days": period_working_days,
            "effective_working_days": effective_working_days,
        }),
        reasoning,
    };

    ProrationCalculation { result, audit_step }
}
