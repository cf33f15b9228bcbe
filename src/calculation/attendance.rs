//! Attendance-driven absence deduction.

use rust_decimal::Decimal;

use crate::models::{AttendanceFact, AuditStep};

use super::money::round_currency;

/// The result of an attendance deduction calculation.
#[derive(Debug, Clone)]
pub struct AttendanceDeduction {
    /// The amount deducted for absence, already rounded and capped.
    pub deduction: Decimal,
    /// Prorated base divided by expected days, unrounded.
    pub daily_rate: Decimal,
    /// Expected minus actual days, never negative.
    pub absent_days: i32,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates the absence deduction from the prorated base.
///
/// `daily_rate = prorated_base / expected_days`, or zero when no days were
/// expected. The deduction is `round(absent_days × daily_rate)`, capped at
/// `max_deduction_percent` of `round(daily_rate × expected_days)`. Without
/// an attendance fact nothing is deducted.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::calculate_attendance_deduction;
/// use payroll_engine::models::AttendanceFact;
/// use rust_decimal::Decimal;
///
/// let fact = AttendanceFact { expected_days: 22, actual_days: 20 };
/// let result = calculate_attendance_deduction(
///     Decimal::from(110_000),
///     Some(&fact),
///     Decimal::ONE_HUNDRED,
///     4,
/// );
/// // 2 days at 5000
/// assert_eq!(result.deduction, Decimal::from(10_000));
/// ```
pub fn calculate_attendance_deduction(
    prorated_base: Decimal,
    attendance: Option<&AttendanceFact>,
    max_deduction_percent: Decimal,
    step_number: u32,
) -> AttendanceDeduction {
    let Some(fact) = attendance else {
        return AttendanceDeduction {
            deduction: Decimal::ZERO,
            daily_rate: Decimal::ZERO,
            absent_days: 0,
            audit_step: AuditStep {
                step_number,
                rule_id: "attendance_deduction".to_string(),
                rule_name: "Absence Deduction".to_string(),
                input: serde_json::json!({
                    "prorated_base": prorated_base.normalize().to_string(),
                    "attendance": null,
                }),
                output: serde_json::json!({ "deduction": "0" }),
                reasoning: "No attendance record; nothing deducted".to_string(),
            },
        };
    };

    let daily_rate = if fact.expected_days > 0 {
        prorated_base / Decimal::from(fact.expected_days)
    } else {
        Decimal::ZERO
    };
    let absent_days = fact.absent_days();

    let uncapped = round_currency(Decimal::from(absent_days) * daily_rate);
    let cap = round_currency(
        daily_rate * Decimal::from(fact.expected_days.max(0)) * max_deduction_percent
            / Decimal::ONE_HUNDRED,
    );
    let deduction = uncapped.min(cap);

    let reasoning = if absent_days == 0 {
        format!(
            "Attended {} of {} expected days; nothing deducted",
            fact.actual_days, fact.expected_days
        )
    } else if deduction < uncapped {
        format!(
            "{} absent days at {} capped at {}% ({})",
            absent_days,
            daily_rate.round_dp(2).normalize(),
            max_deduction_percent.normalize(),
            deduction
        )
    } else {
        format!(
            "{} absent days at {} per day = {}",
            absent_days,
            daily_rate.round_dp(2).normalize(),
            deduction
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "attendance_deduction".to_string(),
        rule_name: "Absence Deduction".to_string(),
        input: serde_json::json!({
            "prorated_base": prorated_base.normalize().to_string(),
            "expected_days": fact.expected_days,
            "actual_days": fact.actual_days,
            "max_deduction_percent": max_deduction_percent.normalize().to_string(),
        }),
        output: serde_json::json!({
            "daily_rate": daily_rate.round_dp(4).normalize().to_string(),
            "absent_days": absent_days,
            "deduction": deduction.normalize().to_string(),
        }),
        reasoning,
    };

    AttendanceDeduction {
        deduction,
        daily_rate,
        absent_days,
        audit_step,
    }
}
