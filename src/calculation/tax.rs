//! Progressive income tax.
//!
//! Monthly income is annualised, taxed bracket by bracket, and the annual
//! tax is brought back to a monthly amount.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::AuditStep;

use super::money::round_currency;

const MONTHS_PER_YEAR: i64 = 12;

/// One marginal tax bracket over annual income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Lower bound of annual income taxed in this bracket.
    pub min: Decimal,
    /// Upper bound, or `None` for the top bracket.
    #[serde(default)]
    pub max: Option<Decimal>,
    /// Marginal rate as a fraction, e.g. `0.07`.
    pub rate: Decimal,
}

/// A validated progressive tax table for one currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxTable {
    currency: String,
    brackets: Vec<TaxBracket>,
}

impl TaxTable {
    /// Builds a table, checking the brackets are well formed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the table is empty, a rate is outside
    /// `[0, 1]`, a bracket's max is not above its min, brackets overlap or
    /// are out of order, or any bracket but the last is unbounded.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::calculation::{TaxBracket, TaxTable};
    /// use rust_decimal::Decimal;
    ///
    /// let table = TaxTable::new("GHS", vec![
    ///     TaxBracket { min: Decimal::ZERO, max: Some(Decimal::from(5_000)), rate: Decimal::ZERO },
    ///     TaxBracket { min: Decimal::from(5_000), max: None, rate: Decimal::new(1, 1) },
    /// ]);
    /// assert!(table.is_ok());
    /// ```
    pub fn new(currency: impl Into<String>, brackets: Vec<TaxBracket>) -> EngineResult<Self> {
        let currency = currency.into();
        let invalid = |message: String| EngineError::InvalidConfig {
            message: format!("tax table '{}': {}", currency, message),
        };

        if brackets.is_empty() {
            return Err(invalid("at least one bracket is required".to_string()));
        }

        let last = brackets.len() - 1;
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(invalid(format!(
                    "bracket {} rate {} is outside [0, 1]",
                    index, bracket.rate
                )));
            }
            if bracket.min < Decimal::ZERO {
                return Err(invalid(format!("bracket {} has a negative min", index)));
            }
            match bracket.max {
                Some(max) if max <= bracket.min => {
                    return Err(invalid(format!(
                        "bracket {} max {} is not above min {}",
                        index, max, bracket.min
                    )));
                }
                None if index != last => {
                    return Err(invalid(format!(
                        "only the last bracket may be unbounded (bracket {})",
                        index
                    )));
                }
                _ => {}
            }
        }

        for (index, pair) in brackets.windows(2).enumerate() {
            if let Some(previous_max) = pair[0].max {
                if pair[1].min < previous_max {
                    return Err(invalid(format!(
                        "bracket {} overlaps bracket {}",
                        index + 1,
                        index
                    )));
                }
            }
        }

        Ok(Self { currency, brackets })
    }

    /// The currency this table applies to.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Brackets in ascending order.
    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Unrounded annual tax on an annual income.
    pub fn annual_tax(&self, annual_income: Decimal) -> Decimal {
        self.brackets
            .iter()
            .filter(|bracket| annual_income > bracket.min)
            .map(|bracket| {
                let top = bracket
                    .max
                    .map_or(annual_income, |max| annual_income.min(max));
                (top - bracket.min) * bracket.rate
            })
            .sum()
    }
}

/// Tax tables keyed by currency.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaxTables {
    tables: BTreeMap<String, TaxTable>,
}

impl TaxTables {
    /// Adds a table, replacing any existing table for the same currency.
    pub fn insert(&mut self, table: TaxTable) {
        self.tables.insert(table.currency.clone(), table);
    }

    /// Looks up the table for a currency.
    pub fn get(&self, currency: &str) -> Option<&TaxTable> {
        self.tables.get(currency)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true when no tables are loaded.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// The table for `currency`, falling back to `default_currency`'s table.
    pub fn resolve(&self, currency: &str, default_currency: Option<&str>) -> Option<&TaxTable> {
        self.get(currency)
            .or_else(|| default_currency.and_then(|fallback| self.get(fallback)))
    }
}

/// Monthly tax and the rate it represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxResult {
    /// Monthly tax, rounded to whole units.
    pub amount: Decimal,
    /// `amount / monthly_income`, or zero when income is not positive.
    pub effective_rate: Decimal,
}

/// The result of a tax calculation, including the audit step.
#[derive(Debug, Clone)]
pub struct TaxCalculation {
    /// The tax outcome.
    pub result: TaxResult,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates monthly progressive tax on monthly taxable income.
///
/// The income is annualised (×12) and run through the brackets of the
/// currency's table in ascending order. The annual tax is divided by 12 and
/// rounded. A currency without a table uses the `default_currency` table,
/// and with neither the tax is zero.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::{calculate_progressive_tax, TaxBracket, TaxTable, TaxTables};
/// use rust_decimal::Decimal;
///
/// let mut tables = TaxTables::default();
/// tables.insert(TaxTable::new("NGN", vec![
///     TaxBracket { min: Decimal::ZERO, max: Some(Decimal::from(300_000)), rate: Decimal::new(7, 2) },
///     TaxBracket { min: Decimal::from(300_000), max: None, rate: Decimal::new(11, 2) },
/// ]).unwrap());
///
/// // 50000 a month is 600000 a year: 21000 + 33000 = 54000, / 12 = 4500
/// let calculation = calculate_progressive_tax(Decimal::from(50_000), "NGN", &tables, None, 7);
/// assert_eq!(calculation.result.amount, Decimal::from(4_500));
/// ```
pub fn calculate_progressive_tax(
    monthly_income: Decimal,
    currency: &str,
    tables: &TaxTables,
    default_currency: Option<&str>,
    step_number: u32,
) -> TaxCalculation {
    let table = tables.resolve(currency, default_currency);
    let annual_income = monthly_income * Decimal::from(MONTHS_PER_YEAR);

    let annual_tax = table.map_or(Decimal::ZERO, |table| table.annual_tax(annual_income));
    let amount = round_currency(annual_tax / Decimal::from(MONTHS_PER_YEAR));
    let effective_rate = if monthly_income > Decimal::ZERO {
        amount / monthly_income
    } else {
        Decimal::ZERO
    };

    let reasoning = match table {
        None => format!("No tax table for {}; no tax withheld", currency),
        Some(table) if table.currency() != currency => format!(
            "No tax table for {}; {} table applied, annual tax {} / 12 = {}",
            currency,
            table.currency(),
            annual_tax.round_dp(2).normalize(),
            amount
        ),
        Some(table) => format!(
            "{} table on annual income {}: annual tax {} / 12 = {}",
            table.currency(),
            annual_income.normalize(),
            annual_tax.round_dp(2).normalize(),
            amount
        ),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "progressive_tax".to_string(),
        rule_name: "Progressive Income Tax".to_string(),
        input: serde_json::json!({
            "monthly_income": monthly_income.normalize().to_string(),
            "currency": currency,
            "table": table.map(TaxTable::currency),
        }),
        output: serde_json::json!({
            "annual_income": annual_income.normalize().to_string(),
            "annual_tax": annual_tax.normalize().to_string(),
            "monthly_tax": amount.normalize().to_string(),
            "effective_rate": effective_rate.round_dp(4).normalize().to_string(),
        }),
        reasoning,
    };

    TaxCalculation {
        result: TaxResult {
            amount,
            effective_rate,
        },
        audit_step,
    }
}
