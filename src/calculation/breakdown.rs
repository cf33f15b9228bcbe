//! Salary breakdown assembly.
//!
//! Runs the calculators in a fixed order and assembles the
//! [`PayrollBreakdown`] with its audit trace. The order matters: every
//! amount is rounded when produced, so reordering the steps changes results.

use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceFact, AuditStep, AuditTrace, BreakdownLine, CompensationProfile, LineSource,
    PayPeriod, PayrollBreakdown, ProrationSummary,
};

use super::attendance::calculate_attendance_deduction;
use super::compensation::resolve_compensation;
use super::money::round_currency;
use super::proration::{ProrationInput, ProrationResult, calculate_proration};
use super::tax::{TaxResult, calculate_progressive_tax};
use super::working_days::HolidaySet;

/// Everything the assembler needs for one employee and period.
#[derive(Debug, Clone)]
pub struct BreakdownInput<'a> {
    /// The employee's compensation terms.
    pub profile: &'a CompensationProfile,
    /// First day of employment.
    pub hire_date: NaiveDate,
    /// Last day of employment, if terminated.
    pub termination_date: Option<NaiveDate>,
    /// The period being paid.
    pub period: &'a PayPeriod,
    /// Holidays inside the period.
    pub holidays: &'a HolidaySet,
    /// Attendance for the period, if known.
    pub attendance: Option<AttendanceFact>,
}

/// The assembled breakdown with the intermediate results behind it.
#[derive(Debug, Clone)]
pub struct BreakdownCalculation {
    /// The breakdown to persist.
    pub breakdown: PayrollBreakdown,
    /// Full proration details.
    pub proration: ProrationResult,
    /// Tax details.
    pub tax: TaxResult,
    /// Audit trace of every step.
    pub audit_trace: AuditTrace,
}

fn as_days(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// Calculates the salary breakdown for one employee and period.
///
/// Steps, in order:
///
/// 1. Proration ratio from the employment window.
/// 2. `prorated_base = round(monthly_base × ratio)`.
/// 3. Effective allowances and deductions, scaled by the ratio when
///    `proration.prorate_items` is set and the period is prorated.
/// 4. Absence deduction from the prorated base; an `absence` line is added
///    when positive.
/// 5. `gross = prorated_base + Σ allowances`.
/// 6. `taxable = prorated_base + Σ taxable allowances`.
/// 7. Progressive tax on the taxable amount; a `tax` line is added when
///    positive.
/// 8. `net = gross − Σ deductions`, synthetic lines included.
///
/// The same input always produces the same breakdown.
///
/// # Errors
///
/// Returns `CalculationError` if the base amount is negative.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::{calculate_breakdown, BreakdownInput, HolidaySet};
/// use payroll_engine::config::EngineConfig;
/// use payroll_engine::models::{CompensationProfile, PayFrequency, PayPeriod};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let profile = CompensationProfile {
///     base_amount: Decimal::from(100_000),
///     currency: "NGN".to_string(),
///     frequency: PayFrequency::Monthly,
///     allowances: vec![],
///     deductions: vec![],
/// };
/// let period = PayPeriod::for_month(2024, 3).unwrap();
/// let holidays = HolidaySet::new();
/// let input = BreakdownInput {
///     profile: &profile,
///     hire_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
///     termination_date: None,
///     period: &period,
///     holidays: &holidays,
///     attendance: None,
/// };
///
/// let calculation = calculate_breakdown(&input, &EngineConfig::default()).unwrap();
/// // 11 of 21 working days
/// assert_eq!(calculation.breakdown.base_amount, Decimal::from(52_381));
/// assert_eq!(calculation.breakdown.pro_rated_amount, Decimal::from(47_619));
/// ```
pub fn calculate_breakdown(
    input: &BreakdownInput<'_>,
    config: &EngineConfig,
) -> EngineResult<BreakdownCalculation> {
    let start_time = Instant::now();
    let mut steps: Vec<AuditStep> = Vec::new();
    let mut step_number: u32 = 1;

    let full_base = input.profile.monthly_base();
    if full_base < Decimal::ZERO {
        return Err(EngineError::CalculationError {
            message: format!("base amount {} is negative", full_base),
        });
    }

    // Step 1: proration ratio
    let proration = calculate_proration(
        &ProrationInput {
            hire_date: input.hire_date,
            termination_date: input.termination_date,
            period_start: input.period.start_date,
            period_end: input.period.end_date,
        },
        &config.workweek,
        input.holidays,
        step_number,
    );
    let proration_result = proration.result;
    steps.push(proration.audit_step);
    step_number += 1;

    // Step 2: prorated base
    let prorated_base = round_currency(full_base * proration_result.ratio);
    let pro_rated_amount = full_base - prorated_base;
    steps.push(AuditStep {
        step_number,
        rule_id: "base_proration".to_string(),
        rule_name: "Prorated Base Salary".to_string(),
        input: serde_json::json!({
            "monthly_base": full_base.normalize().to_string(),
            "ratio": proration_result.ratio.normalize().to_string(),
        }),
        output: serde_json::json!({
            "prorated_base": prorated_base.normalize().to_string(),
            "pro_rated_amount": pro_rated_amount.normalize().to_string(),
        }),
        reasoning: format!(
            "{} x {} = {}",
            full_base.normalize(),
            proration_result.ratio.round_dp(4).normalize(),
            prorated_base
        ),
    });
    step_number += 1;

    // Step 3: effective items
    let scale = (config.proration.prorate_items && proration_result.is_prorated)
        .then_some(proration_result.ratio);
    let items = resolve_compensation(
        input.profile,
        input.period.start_date,
        input.period.end_date,
        scale,
        step_number,
    );
    let allowances = items.allowances;
    let mut deductions = items.deductions;
    steps.push(items.audit_step);
    step_number += 1;

    // Step 4: absence deduction
    let absence = calculate_attendance_deduction(
        prorated_base,
        input.attendance.as_ref(),
        config.attendance.max_deduction_percent,
        step_number,
    );
    if absence.deduction > Decimal::ZERO {
        deductions.push(BreakdownLine {
            line_type: "absence".to_string(),
            description: Some(format!("{} absent days", absence.absent_days)),
            amount: absence.deduction,
            taxable: false,
            source: LineSource::Absence,
        });
    }
    let attendance_deduction = absence.deduction;
    steps.push(absence.audit_step);
    step_number += 1;

    // Steps 5 and 6: gross and taxable
    let allowance_total: Decimal = allowances.iter().map(|line| line.amount).sum();
    let taxable_allowances: Decimal = allowances
        .iter()
        .filter(|line| line.taxable)
        .map(|line| line.amount)
        .sum();
    let gross_salary = prorated_base + allowance_total;
    let taxable_amount = prorated_base + taxable_allowances;

    // Step 7: tax
    let tax = calculate_progressive_tax(
        taxable_amount,
        &input.profile.currency,
        &config.tax_tables,
        config.default_tax_currency.as_deref(),
        step_number,
    );
    let tax_result = tax.result;
    if tax_result.amount > Decimal::ZERO {
        deductions.push(BreakdownLine {
            line_type: "tax".to_string(),
            description: Some("Income tax".to_string()),
            amount: tax_result.amount,
            taxable: false,
            source: LineSource::Tax,
        });
    }
    steps.push(tax.audit_step);
    step_number += 1;

    // Step 8: net
    let deduction_total: Decimal = deductions.iter().map(|line| line.amount).sum();
    let net_salary = gross_salary - deduction_total;
    steps.push(AuditStep {
        step_number,
        rule_id: "salary_totals".to_string(),
        rule_name: "Gross and Net Salary".to_string(),
        input: serde_json::json!({
            "prorated_base": prorated_base.normalize().to_string(),
            "allowances": allowance_total.normalize().to_string(),
            "deductions": deduction_total.normalize().to_string(),
        }),
        output: serde_json::json!({
            "gross_salary": gross_salary.normalize().to_string(),
            "taxable_amount": taxable_amount.normalize().to_string(),
            "net_salary": net_salary.normalize().to_string(),
        }),
        reasoning: format!(
            "Gross {} + {} = {}; net {} - {} = {}",
            prorated_base, allowance_total, gross_salary, gross_salary, deduction_total, net_salary
        ),
    });

    let (working_days, actual_days) = match input.attendance {
        Some(fact) => (fact.expected_days, fact.actual_days),
        None => (
            as_days(proration_result.period_working_days),
            as_days(proration_result.effective_working_days),
        ),
    };

    let breakdown = PayrollBreakdown {
        base_amount: prorated_base,
        allowances,
        deductions,
        gross_salary,
        net_salary,
        taxable_amount,
        tax_amount: tax_result.amount,
        working_days,
        actual_days,
        pro_rated_amount,
        attendance_deduction,
        proration: ProrationSummary {
            ratio: proration_result.ratio,
            is_prorated: proration_result.is_prorated,
            reason: proration_result.reason,
        },
    };

    let duration_us = u64::try_from(start_time.elapsed().as_micros()).unwrap_or(u64::MAX);
    debug!(
        steps = steps.len(),
        gross_salary = %breakdown.gross_salary,
        net_salary = %breakdown.net_salary,
        duration_us,
        "Calculated breakdown"
    );

    Ok(BreakdownCalculation {
        breakdown,
        proration: proration_result,
        tax: tax_result,
        audit_trace: AuditTrace {
            steps,
            warnings: Vec::new(),
            duration_us,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{TaxBracket, TaxTable, ProrationReason};
    use crate::models::{Allowance, Deduction, EffectiveWindow, PayFrequency};
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn housing(amount: i64) -> Allowance {
        Allowance {
            allowance_type: "housing".to_string(),
            amount: Decimal::from(amount),
            taxable: true,
            recurring: true,
            window: EffectiveWindow::From {
                start: date(2024, 1, 1),
            },
        }
    }

    fn profile(base: i64, allowances: Vec<Allowance>, deductions: Vec<Deduction>) -> CompensationProfile {
        CompensationProfile {
            base_amount: Decimal::from(base),
            currency: "NGN".to_string(),
            frequency: PayFrequency::Monthly,
            allowances,
            deductions,
        }
    }

    fn ngn_config() -> EngineConfig {
        let table = TaxTable::new(
            "NGN",
            vec![
                TaxBracket { min: dec("0"), max: Some(dec("300000")), rate: dec("0.07") },
                TaxBracket { min: dec("300000"), max: Some(dec("600000")), rate: dec("0.11") },
                TaxBracket { min: dec("600000"), max: Some(dec("1100000")), rate: dec("0.15") },
                TaxBracket { min: dec("1100000"), max: Some(dec("1600000")), rate: dec("0.19") },
                TaxBracket { min: dec("1600000"), max: Some(dec("3200000")), rate: dec("0.21") },
                TaxBracket { min: dec("3200000"), max: None, rate: dec("0.24") },
            ],
        )
        .unwrap();
        EngineConfig::default().with_tax_table(table)
    }

    fn run(
        profile: &CompensationProfile,
        hire: NaiveDate,
        attendance: Option<AttendanceFact>,
        config: &EngineConfig,
    ) -> BreakdownCalculation {
        let period = PayPeriod::for_month(2024, 3).unwrap();
        let holidays = HolidaySet::new();
        let input = BreakdownInput {
            profile,
            hire_date: hire,
            termination_date: None,
            period: &period,
            holidays: &holidays,
            attendance,
        };
        calculate_breakdown(&input, config).unwrap()
    }

    /// BD-001: new hire on 15 March with a housing allowance
    #[test]
    fn test_bd_001_new_hire_end_to_end() {
        let profile = profile(100_000, vec![housing(20_000)], vec![]);
        let calculation = run(&profile, date(2024, 3, 15), None, &EngineConfig::default());
        let breakdown = &calculation.breakdown;

        assert_eq!(calculation.proration.period_working_days, 21);
        assert_eq!(calculation.proration.effective_working_days, 11);
        assert_eq!(breakdown.proration.reason, ProrationReason::NewHire);
        assert!(breakdown.proration.is_prorated);
        assert_eq!(breakdown.base_amount, dec("52381"));
        assert_eq!(breakdown.allowances[0].amount, dec("10476"));
        assert_eq!(breakdown.gross_salary, dec("62857"));
        assert_eq!(breakdown.taxable_amount, dec("62857"));
        assert_eq!(breakdown.pro_rated_amount, dec("47619"));
        assert_eq!(breakdown.working_days, 21);
        assert_eq!(breakdown.actual_days, 11);
        // no tax tables configured
        assert_eq!(breakdown.tax_amount, Decimal::ZERO);
        assert_eq!(breakdown.net_salary, dec("62857"));
    }

    /// BD-002: tax line appended and subtracted from net
    #[test]
    fn test_bd_002_tax_deducted() {
        let profile = profile(100_000, vec![housing(20_000)], vec![]);
        let calculation = run(&profile, date(2024, 3, 15), None, &ngn_config());
        let breakdown = &calculation.breakdown;

        assert_eq!(breakdown.tax_amount, dec("6429"));
        let tax_line = breakdown.deductions.last().unwrap();
        assert_eq!(tax_line.source, LineSource::Tax);
        assert_eq!(tax_line.amount, dec("6429"));
        assert_eq!(breakdown.net_salary, dec("56428"));
    }

    /// BD-003: full period, no proration
    #[test]
    fn test_bd_003_full_period() {
        let profile = profile(100_000, vec![housing(20_000)], vec![]);
        let calculation = run(&profile, date(2020, 1, 1), None, &EngineConfig::default());
        let breakdown = &calculation.breakdown;

        assert_eq!(breakdown.base_amount, dec("100000"));
        assert_eq!(breakdown.pro_rated_amount, Decimal::ZERO);
        assert_eq!(breakdown.gross_salary, dec("120000"));
        assert_eq!(breakdown.proration.reason, ProrationReason::Full);
    }

    /// BD-004: attendance deduction taken from the prorated base
    #[test]
    fn test_bd_004_absence_line() {
        let profile = profile(110_000, vec![], vec![]);
        let attendance = AttendanceFact {
            expected_days: 22,
            actual_days: 20,
        };
        let calculation = run(&profile, date(2020, 1, 1), Some(attendance), &EngineConfig::default());
        let breakdown = &calculation.breakdown;

        assert_eq!(breakdown.attendance_deduction, dec("10000"));
        assert_eq!(breakdown.deductions[0].source, LineSource::Absence);
        assert_eq!(breakdown.working_days, 22);
        assert_eq!(breakdown.actual_days, 20);
        assert_eq!(breakdown.gross_salary, dec("110000"));
        assert_eq!(breakdown.net_salary, dec("100000"));
    }

    /// BD-005: non-taxable allowance raises gross but not taxable income
    #[test]
    fn test_bd_005_non_taxable_allowance() {
        let mut meal = housing(10_000);
        meal.allowance_type = "meal".to_string();
        meal.taxable = false;
        let profile = profile(100_000, vec![meal], vec![]);
        let calculation = run(&profile, date(2020, 1, 1), None, &EngineConfig::default());

        assert_eq!(calculation.breakdown.gross_salary, dec("110000"));
        assert_eq!(calculation.breakdown.taxable_amount, dec("100000"));
    }

    /// BD-006: item proration can be switched off
    #[test]
    fn test_bd_006_items_not_prorated_when_disabled() {
        let mut config = EngineConfig::default();
        config.proration.prorate_items = false;
        let profile = profile(100_000, vec![housing(20_000)], vec![]);
        let calculation = run(&profile, date(2024, 3, 15), None, &config);

        assert_eq!(calculation.breakdown.base_amount, dec("52381"));
        assert_eq!(calculation.breakdown.allowances[0].amount, dec("20000"));
    }

    /// BD-007: profile deductions prorate with allowances
    #[test]
    fn test_bd_007_deductions_prorated() {
        let loan = Deduction {
            deduction_type: "loan".to_string(),
            amount: Decimal::from(10_000),
            auto: false,
            recurring: true,
            window: EffectiveWindow::Always,
            description: None,
        };
        let profile = profile(100_000, vec![], vec![loan]);
        let calculation = run(&profile, date(2024, 3, 15), None, &EngineConfig::default());

        assert_eq!(calculation.breakdown.deductions[0].amount, dec("5238"));
        assert_eq!(calculation.breakdown.net_salary, dec("47143"));
    }

    #[test]
    fn test_annual_base_normalised() {
        let mut annual = profile(1_200_000, vec![], vec![]);
        annual.frequency = PayFrequency::Annual;
        let calculation = run(&annual, date(2020, 1, 1), None, &EngineConfig::default());
        assert_eq!(calculation.breakdown.base_amount, dec("100000"));
    }

    #[test]
    fn test_negative_base_is_rejected() {
        let negative = profile(-1, vec![], vec![]);
        let period = PayPeriod::for_month(2024, 3).unwrap();
        let holidays = HolidaySet::new();
        let input = BreakdownInput {
            profile: &negative,
            hire_date: date(2020, 1, 1),
            termination_date: None,
            period: &period,
            holidays: &holidays,
            attendance: None,
        };
        assert!(matches!(
            calculate_breakdown(&input, &EngineConfig::default()),
            Err(EngineError::CalculationError { .. })
        ));
    }

    #[test]
    fn test_audit_steps_are_sequential() {
        let profile = profile(100_000, vec![housing(20_000)], vec![]);
        let calculation = run(&profile, date(2024, 3, 15), None, &ngn_config());
        let numbers: Vec<u32> = calculation
            .audit_trace
            .steps
            .iter()
            .map(|step| step.step_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(calculation.audit_trace.steps[0].rule_id, "proration");
        assert_eq!(calculation.audit_trace.steps[5].rule_id, "salary_totals");
    }

    #[test]
    fn test_same_input_same_breakdown() {
        let profile = profile(100_000, vec![housing(20_000)], vec![]);
        let first = run(&profile, date(2024, 3, 15), None, &ngn_config());
        let second = run(&profile, date(2024, 3, 15), None, &ngn_config());
        assert_eq!(first.breakdown, second.breakdown);
    }

    proptest! {
        #[test]
        fn prop_totals_are_consistent(
            base in 0i64..5_000_000,
            allowance in 0i64..500_000,
            hire_day in 1u32..=31,
            expected in 0i32..30,
            actual in 0i32..30,
        ) {
            let profile = profile(base, vec![housing(allowance)], vec![]);
            let attendance = AttendanceFact { expected_days: expected, actual_days: actual };
            let calculation = run(&profile, date(2024, 3, hire_day), Some(attendance), &ngn_config());
            let breakdown = &calculation.breakdown;

            prop_assert_eq!(breakdown.gross_salary, breakdown.base_amount + breakdown.total_allowances());
            prop_assert_eq!(breakdown.net_salary, breakdown.gross_salary - breakdown.total_deductions());
            prop_assert!(breakdown.base_amount <= Decimal::from(base));
            prop_assert_eq!(breakdown.base_amount + breakdown.pro_rated_amount, Decimal::from(base));
            prop_assert!(breakdown.attendance_deduction <= breakdown.base_amount);
        }
    }
}
