//! Payroll breakdown models.
//!
//! This module contains the [`PayrollBreakdown`] type and its line items, plus
//! the audit trace every calculation produces alongside it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::ProrationReason;

/// Where a breakdown line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSource {
    /// An allowance or deduction on the compensation profile.
    Profile,
    /// The synthetic absence deduction.
    Absence,
    /// The synthetic income tax deduction.
    Tax,
}

/// One allowance or deduction line on a breakdown.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{BreakdownLine, LineSource};
/// use rust_decimal::Decimal;
///
/// let line = BreakdownLine {
///     line_type: "housing".to_string(),
///     description: None,
///     amount: Decimal::from(10_476),
///     taxable: true,
///     source: LineSource::Profile,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownLine {
    /// The allowance or deduction type (e.g., "housing", "absence", "tax").
    #[serde(rename = "type")]
    pub line_type: String,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The amount for this period, already scaled and rounded.
    pub amount: Decimal,
    /// Whether the amount counts toward taxable income (allowances only).
    #[serde(default)]
    pub taxable: bool,
    /// Where the line came from.
    pub source: LineSource,
}

/// The proration facts carried on a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProrationSummary {
    /// Fraction of the period worked, in `[0, 1]`.
    pub ratio: Decimal,
    /// True when `ratio < 1`.
    pub is_prorated: bool,
    /// Why the period was (or was not) prorated.
    pub reason: ProrationReason,
}

/// The full monetary breakdown for one employee and period.
///
/// Immutable once produced; embedded into the payroll record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollBreakdown {
    /// The base amount after proration.
    pub base_amount: Decimal,
    /// Effective allowances, scaled to the period.
    pub allowances: Vec<BreakdownLine>,
    /// Effective deductions, plus the synthetic absence and tax lines.
    pub deductions: Vec<BreakdownLine>,
    /// Prorated base plus all allowances.
    pub gross_salary: Decimal,
    /// Gross minus all deductions.
    pub net_salary: Decimal,
    /// Prorated base plus taxable allowances.
    pub taxable_amount: Decimal,
    /// Monthly income tax.
    pub tax_amount: Decimal,
    /// Expected working days (attendance, or the period's working days).
    pub working_days: i32,
    /// Days worked (attendance, or the effective working days).
    pub actual_days: i32,
    /// Amount removed from the full base by proration.
    pub pro_rated_amount: Decimal,
    /// The absence deduction, zero when attendance was unavailable.
    pub attendance_deduction: Decimal,
    /// Proration facts.
    pub proration: ProrationSummary,
}

impl PayrollBreakdown {
    /// Sum of all allowance lines.
    pub fn total_allowances(&self) -> Decimal {
        self.allowances.iter().map(|line| line.amount).sum()
    }

    /// Sum of all deduction lines, including synthetic ones.
    pub fn total_deductions(&self) -> Decimal {
        self.deductions.iter().map(|line| line.amount).sum()
    }
}

/// A single step in the audit trace recording a calculation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings indicate conditions that did not stop the calculation but
/// changed its inputs, such as an unreachable attendance source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The complete audit trace for a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(line_type: &str, amount: &str, source: LineSource) -> BreakdownLine {
        BreakdownLine {
            line_type: line_type.to_string(),
            description: None,
            amount: dec(amount),
            taxable: false,
            source,
        }
    }

    fn create_breakdown() -> PayrollBreakdown {
        PayrollBreakdown {
            base_amount: dec("100000"),
            allowances: vec![
                line("housing", "20000", LineSource::Profile),
                line("transport", "5000", LineSource::Profile),
            ],
            deductions: vec![
                line("pension", "8000", LineSource::Profile),
                line("tax", "9500", LineSource::Tax),
            ],
            gross_salary: dec("125000"),
            net_salary: dec("107500"),
            taxable_amount: dec("120000"),
            tax_amount: dec("9500"),
            working_days: 21,
            actual_days: 21,
            pro_rated_amount: Decimal::ZERO,
            attendance_deduction: Decimal::ZERO,
            proration: ProrationSummary {
                ratio: Decimal::ONE,
                is_prorated: false,
                reason: ProrationReason::Full,
            },
        }
    }

    /// BD-001: gross equals base plus allowances
    #[test]
    fn test_gross_equals_base_plus_allowances() {
        let breakdown = create_breakdown();
        assert_eq!(
            breakdown.gross_salary,
            breakdown.base_amount + breakdown.total_allowances()
        );
    }

    /// BD-002: net equals gross minus deductions
    #[test]
    fn test_net_equals_gross_minus_deductions() {
        let breakdown = create_breakdown();
        assert_eq!(
            breakdown.net_salary,
            breakdown.gross_salary - breakdown.total_deductions()
        );
    }

    #[test]
    fn test_line_source_serialization() {
        assert_eq!(
            serde_json::to_string(&LineSource::Absence).unwrap(),
            "\"absence\""
        );
    }

    #[test]
    fn test_line_serializes_type_and_skips_empty_description() {
        let json = serde_json::to_string(&line("tax", "100", LineSource::Tax)).unwrap();
        assert!(json.contains("\"type\":\"tax\""));
        assert!(!json.contains("description"));
    }

    #[test]
    fn test_breakdown_json_round_trip_preserves_amounts() {
        let breakdown = create_breakdown();
        let json = serde_json::to_string(&breakdown).unwrap();
        let restored: PayrollBreakdown = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, breakdown);
    }
}
