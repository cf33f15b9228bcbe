//! Payroll Engine for monthly salaried staff
//!
//! This crate calculates salary breakdowns (working-day proration, effective
//! allowances and deductions, absence deductions, progressive income tax) and
//! commits each employee's monthly payroll exactly once, together with its
//! ledger transaction, against a transactional store.

#![warn(missing_docs)]

pub mod calculation;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
