//! Calculation logic for the Payroll Engine.
//!
//! This module contains the pure calculation functions behind a salary
//! breakdown: working-day counting, proration across partial employment
//! windows, effective-dated allowance and deduction resolution, the
//! attendance-driven absence deduction, progressive-bracket tax, and the
//! assembler that runs them in order.

mod attendance;
mod breakdown;
mod compensation;
mod money;
mod proration;
mod tax;
mod working_days;

pub use attendance::{AttendanceDeduction, calculate_attendance_deduction};
pub use breakdown::{BreakdownCalculation, BreakdownInput, calculate_breakdown};
pub use compensation::{
    CompensationResolution, resolve_allowances, resolve_compensation, resolve_deductions,
};
pub use money::round_currency;
pub use proration::{
    ProrationCalculation, ProrationInput, ProrationReason, ProrationResult, calculate_proration,
};
pub use tax::{TaxBracket, TaxCalculation, TaxResult, TaxTable, TaxTables, calculate_progressive_tax};
pub use working_days::{
    DayClass, HolidaySet, WorkingDaysCount, Workweek, classify_day, count_working_days,
};
