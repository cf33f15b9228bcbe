//! Effective-dated allowance and deduction resolution.
//!
//! Picks the profile items that are active in a pay period and scales them
//! by the proration ratio.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Allowance, AuditStep, BreakdownLine, CompensationProfile, Deduction, LineSource};

use super::money::round_currency;

/// Scales an amount by the optional proration ratio.
fn scaled(amount: Decimal, scale: Option<Decimal>) -> Decimal {
    match scale {
        Some(ratio) => round_currency(amount * ratio),
        None => amount,
    }
}

/// Resolves the allowances payable for a period.
///
/// An allowance participates when it is recurring and its window overlaps
/// `period_start..=period_end`. With `scale` set, each amount becomes
/// `round(amount × scale)`; otherwise amounts are copied verbatim.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::resolve_allowances;
/// use payroll_engine::models::{Allowance, EffectiveWindow};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let housing = Allowance {
///     allowance_type: "housing".to_string(),
///     amount: Decimal::from(20_000),
///     taxable: true,
///     recurring: true,
///     window: EffectiveWindow::From { start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() },
/// };
///
/// let lines = resolve_allowances(
///     &[housing],
///     NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
///     Some(Decimal::from(11) / Decimal::from(21)),
/// );
/// assert_eq!(lines[0].amount, Decimal::from(10_476));
/// ```
pub fn resolve_allowances(
    allowances: &[Allowance],
    period_start: NaiveDate,
    period_end: NaiveDate,
    scale: Option<Decimal>,
) -> Vec<BreakdownLine> {
    allowances
        .iter()
        .filter(|allowance| allowance.recurring)
        .filter(|allowance| allowance.window.overlaps(period_start, period_end))
        .map(|allowance| BreakdownLine {
            line_type: allowance.allowance_type.clone(),
            description: None,
            amount: scaled(allowance.amount, scale),
            taxable: allowance.taxable,
            source: LineSource::Profile,
        })
        .collect()
}

/// Resolves the deductions applied for a period.
///
/// A deduction participates when it is automatic or recurring and its window
/// overlaps the period. Scaling follows [`resolve_allowances`].
pub fn resolve_deductions(
    deductions: &[Deduction],
    period_start: NaiveDate,
    period_end: NaiveDate,
    scale: Option<Decimal>,
) -> Vec<BreakdownLine> {
    deductions
        .iter()
        .filter(|deduction| deduction.auto || deduction.recurring)
        .filter(|deduction| deduction.window.overlaps(period_start, period_end))
        .map(|deduction| BreakdownLine {
            line_type: deduction.deduction_type.clone(),
            description: deduction.description.clone(),
            amount: scaled(deduction.amount, scale),
            taxable: false,
            source: LineSource::Profile,
        })
        .collect()
}

/// Effective allowances and deductions for one period.
#[derive(Debug, Clone)]
pub struct CompensationResolution {
    /// Allowance lines.
    pub allowances: Vec<BreakdownLine>,
    /// Deduction lines.
    pub deductions: Vec<BreakdownLine>,
    /// The audit step recording this resolution.
    pub audit_step: AuditStep,
}

/// Resolves both item lists of a profile and records the audit step.
pub fn resolve_compensation(
    profile: &CompensationProfile,
    period_start: NaiveDate,
    period_end: NaiveDate,
    scale: Option<Decimal>,
    step_number: u32,
) -> CompensationResolution {
    let allowances = resolve_allowances(&profile.allowances, period_start, period_end, scale);
    let deductions = resolve_deductions(&profile.deductions, period_start, period_end, scale);

    let skipped = profile.allowances.len() - allowances.len() + profile.deductions.len()
        - deductions.len();

    let reasoning = match scale {
        Some(ratio) => format!(
            "{} allowances and {} deductions effective, scaled by {}; {} skipped",
            allowances.len(),
            deductions.len(),
            ratio.round_dp(4).normalize(),
            skipped
        ),
        None => format!(
            "{} allowances and {} deductions effective at full amount; {} skipped",
            allowances.len(),
            deductions.len(),
            skipped
        ),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "effective_items".to_string(),
        rule_name: "Effective Allowances and Deductions".to_string(),
        input: serde_json::json!({
            "allowances": profile.allowances.len(),
            "deductions": profile.deductions.len(),
            "period_start": period_start,
            "period_end": period_end,
            "scale": scale.map(|ratio| ratio.normalize().to_string()),
        }),
        output: serde_json::json!({
            "allowances": allowances
                .iter()
                .map(|line| serde_json::json!({
                    "type": line.line_type,
                    "amount": line.amount.normalize().to_string(),
                }))
                .collect::<Vec<_>>(),
            "deductions": deductions
                .iter()
                .map(|line| serde_json::json!({
                    "type": line.line_type,
                    "amount": line.amount.normalize().to_string(),
                }))
                .collect::<Vec<_>>(),
        }),
        reasoning,
    };

    CompensationResolution {
        allowances,
        deductions,
        audit_step,
    }
}
