//! Core data models for the Payroll Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod breakdown;
mod compensation;
mod employee;
mod pay_period;
mod payroll_record;
mod transaction;

pub use attendance::AttendanceFact;
pub use breakdown::{
    AuditStep, AuditTrace, AuditWarning, BreakdownLine, LineSource, PayrollBreakdown,
    ProrationSummary,
};
pub use compensation::{Allowance, CompensationProfile, Deduction, EffectiveWindow, PayFrequency};
pub use employee::{Employee, EmployeeStatus, PayrollStats};
pub use pay_period::{PayPeriod, PublicHoliday};
pub use payroll_record::{ExportInfo, PayrollRecord, PayrollStatus};
pub use transaction::{LedgerTransaction, PaymentMethod, TransactionKind, TransactionMetadata};
