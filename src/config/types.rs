//! Configuration types for the payroll engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{TaxBracket, TaxTable, TaxTables, Workweek};
use crate::error::{EngineError, EngineResult};
use crate::models::PaymentMethod;

/// How allowances and deductions react to proration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProrationConfig {
    /// Scale every effective allowance and deduction by the proration ratio.
    ///
    /// Fixed-amount deductions such as loan installments follow the same
    /// rule as allowances.
    pub prorate_items: bool,
}

impl Default for ProrationConfig {
    fn default() -> Self {
        Self {
            prorate_items: true,
        }
    }
}

/// Attendance deduction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Cap on the absence deduction as a percentage of the prorated base.
    pub max_deduction_percent: Decimal,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            max_deduction_percent: Decimal::ONE_HUNDRED,
        }
    }
}

/// Ledger transaction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Payment method recorded on salary transactions.
    pub payment_method: PaymentMethod,
    /// Accounting category for salary transactions.
    pub category: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            payment_method: PaymentMethod::BankTransfer,
            category: "salary".to_string(),
        }
    }
}

/// Bulk processing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Maximum number of employees processed at once. `1` is sequential.
    pub max_concurrency: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self { max_concurrency: 1 }
    }
}

/// A tax table file (`tax/<currency>.yaml`).
#[derive(Debug, Clone, Deserialize)]
pub struct TaxTableFile {
    /// The currency the table applies to.
    pub currency: String,
    /// Brackets in ascending order.
    pub brackets: Vec<TaxBracket>,
}

/// The complete engine configuration.
///
/// # Example
///
/// ```
/// use payroll_engine::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.bulk.max_concurrency, 1);
/// assert!(config.proration.prorate_items);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Currency whose tax table is used when no table matches.
    pub default_tax_currency: Option<String>,
    /// Which weekdays are working days.
    pub workweek: Workweek,
    /// Proration settings.
    pub proration: ProrationConfig,
    /// Attendance settings.
    pub attendance: AttendanceConfig,
    /// Ledger settings.
    pub ledger: LedgerConfig,
    /// Bulk settings.
    pub bulk: BulkConfig,
    /// Progressive tax tables by currency, loaded from `tax/*.yaml`.
    #[serde(skip)]
    pub tax_tables: TaxTables,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_tax_currency: None,
            workweek: Workweek::default(),
            proration: ProrationConfig::default(),
            attendance: AttendanceConfig::default(),
            ledger: LedgerConfig::default(),
            bulk: BulkConfig::default(),
            tax_tables: TaxTables::default(),
        }
    }
}

impl EngineConfig {
    /// Checks cross-field rules the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the workweek is empty, concurrency is zero,
    /// the attendance cap is negative, or the default tax currency has no
    /// table.
    pub fn validate(&self) -> EngineResult<()> {
        if self.workweek.is_empty() {
            return Err(EngineError::InvalidConfig {
                message: "workweek must contain at least one day".to_string(),
            });
        }
        if self.bulk.max_concurrency == 0 {
            return Err(EngineError::InvalidConfig {
                message: "bulk.max_concurrency must be at least 1".to_string(),
            });
        }
        if self.attendance.max_deduction_percent < Decimal::ZERO {
            return Err(EngineError::InvalidConfig {
                message: "attendance.max_deduction_percent must not be negative".to_string(),
            });
        }
        if let Some(currency) = &self.default_tax_currency {
            if self.tax_tables.get(currency).is_none() {
                return Err(EngineError::InvalidConfig {
                    message: format!("default_tax_currency '{}' has no tax table", currency),
                });
            }
        }
        Ok(())
    }

    /// Adds (or replaces) the tax table for the table's currency.
    pub fn with_tax_table(mut self, table: TaxTable) -> Self {
        self.tax_tables.insert(table);
        self
    }

    /// Sets the currency whose table applies when no table matches.
    pub fn with_default_tax_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_tax_currency = Some(currency.into());
        self
    }
}
