//! Ledger transactions produced by payroll processing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BreakdownLine, PayPeriod};

/// Direction of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money leaving the organization.
    Expense,
    /// Money entering the organization.
    Income,
}

/// How the salary is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Direct bank transfer.
    #[default]
    BankTransfer,
    /// Cash payout.
    Cash,
    /// Cheque.
    Cheque,
    /// Mobile money wallet.
    MobileMoney,
}

/// Structured audit metadata attached to a salary transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    /// The period paid.
    pub period: PayPeriod,
    /// Prorated base amount.
    pub base_amount: Decimal,
    /// Allowance lines.
    pub allowances: Vec<BreakdownLine>,
    /// Deduction lines, including absence and tax.
    pub deductions: Vec<BreakdownLine>,
    /// Tax amount.
    pub tax_amount: Decimal,
    /// Gross salary.
    pub gross_salary: Decimal,
    /// Net salary.
    pub net_salary: Decimal,
}

/// An accounting record of one money movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique identifier for this transaction.
    pub id: Uuid,
    /// The paying organization.
    pub organization_id: String,
    /// The employee paid.
    pub employee_id: String,
    /// Transaction direction; salaries are expenses.
    pub kind: TransactionKind,
    /// Accounting category (e.g., "salary").
    pub category: String,
    /// The amount moved.
    pub amount: Decimal,
    /// ISO currency code.
    pub currency: String,
    /// How the money is paid.
    pub payment_method: PaymentMethod,
    /// The payroll record this transaction settles.
    pub reference: Uuid,
    /// Human-readable description.
    pub description: String,
    /// Structured breakdown metadata.
    pub metadata: TransactionMetadata,
    /// Who triggered the run.
    pub created_by: Option<String>,
    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}
