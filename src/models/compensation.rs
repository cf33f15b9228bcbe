//! Compensation profile models.
//!
//! An employee's [`CompensationProfile`] carries the base amount plus the
//! effective-dated [`Allowance`] and [`Deduction`] items the resolver filters
//! per period.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::round_currency;

/// How often the profile's base amount is quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayFrequency {
    /// The base amount is a monthly salary.
    #[default]
    Monthly,
    /// The base amount is an annual salary.
    Annual,
}

/// The date window an allowance or deduction is active in.
///
/// Open ends are explicit variants, so "no start" never means "since
/// 1970" and "no end" never means "until 9999".
///
/// # Example
///
/// ```
/// use payroll_engine::models::EffectiveWindow;
/// use chrono::NaiveDate;
///
/// let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let window = EffectiveWindow::from_bounds(Some(from), None);
/// assert_eq!(window, EffectiveWindow::From { start: from });
///
/// let march_start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let march_end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
/// assert!(window.overlaps(march_start, march_end));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectiveWindow {
    /// Active for all time.
    #[default]
    Always,
    /// Active from `start` (inclusive) with no end.
    From {
        /// First active day.
        start: NaiveDate,
    },
    /// Active until `end` (inclusive) with no start.
    Until {
        /// Last active day.
        end: NaiveDate,
    },
    /// Active from `start` to `end`, both inclusive.
    Between {
        /// First active day.
        start: NaiveDate,
        /// Last active day.
        end: NaiveDate,
    },
}

impl EffectiveWindow {
    /// Builds a window from optional bounds.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        match (start, end) {
            (None, None) => EffectiveWindow::Always,
            (Some(start), None) => EffectiveWindow::From { start },
            (None, Some(end)) => EffectiveWindow::Until { end },
            (Some(start), Some(end)) => EffectiveWindow::Between { start, end },
        }
    }

    /// Returns the inclusive start bound, if any.
    pub fn start(&self) -> Option<NaiveDate> {
        match self {
            EffectiveWindow::From { start } | EffectiveWindow::Between { start, .. } => {
                Some(*start)
            }
            _ => None,
        }
    }

    /// Returns the inclusive end bound, if any.
    pub fn end(&self) -> Option<NaiveDate> {
        match self {
            EffectiveWindow::Until { end } | EffectiveWindow::Between { end, .. } => Some(*end),
            _ => None,
        }
    }

    /// Returns true if this window shares at least one day with
    /// `[range_start, range_end]`.
    pub fn overlaps(&self, range_start: NaiveDate, range_end: NaiveDate) -> bool {
        let starts_in_time = self.start().is_none_or(|start| start <= range_end);
        let ends_in_time = self.end().is_none_or(|end| end >= range_start);
        starts_in_time && ends_in_time
    }
}

/// A recurring or one-off addition to pay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allowance {
    /// The allowance type (e.g., "housing", "transport").
    #[serde(rename = "type")]
    pub allowance_type: String,
    /// The full-period amount.
    pub amount: Decimal,
    /// Whether the allowance counts toward taxable income.
    #[serde(default = "default_true")]
    pub taxable: bool,
    /// Whether the allowance is paid automatically every period.
    #[serde(default = "default_true")]
    pub recurring: bool,
    /// When the allowance is active.
    #[serde(default)]
    pub window: EffectiveWindow,
}

/// A recurring or one-off subtraction from pay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deduction {
    /// The deduction type (e.g., "pension", "loan").
    #[serde(rename = "type")]
    pub deduction_type: String,
    /// The full-period amount.
    pub amount: Decimal,
    /// Whether the deduction is applied automatically.
    #[serde(default)]
    pub auto: bool,
    /// Whether the deduction recurs every period.
    #[serde(default)]
    pub recurring: bool,
    /// When the deduction is active.
    #[serde(default)]
    pub window: EffectiveWindow,
    /// Free-text description carried onto the breakdown line.
    #[serde(default)]
    pub description: Option<String>,
}

/// An employee's compensation terms.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{CompensationProfile, PayFrequency};
/// use rust_decimal::Decimal;
///
/// let profile = CompensationProfile {
///     base_amount: Decimal::from(1_200_000),
///     currency: "NGN".to_string(),
///     frequency: PayFrequency::Annual,
///     allowances: vec![],
///     deductions: vec![],
/// };
/// assert_eq!(profile.monthly_base(), Decimal::from(100_000));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationProfile {
    /// The base salary, quoted per `frequency`.
    pub base_amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// How often `base_amount` is quoted.
    #[serde(default)]
    pub frequency: PayFrequency,
    /// Allowances on the profile.
    #[serde(default)]
    pub allowances: Vec<Allowance>,
    /// Deductions on the profile.
    #[serde(default)]
    pub deductions: Vec<Deduction>,
}

impl CompensationProfile {
    /// Returns the base amount normalised to one month.
    pub fn monthly_base(&self) -> Decimal {
        match self.frequency {
            PayFrequency::Monthly => self.base_amount,
            PayFrequency::Annual => round_currency(self.base_amount / Decimal::from(12)),
        }
    }
}

fn default_true() -> bool {
    true
}
