//! Configuration loading and management for the Payroll Engine.
//!
//! This module loads the engine configuration from YAML files: the working
//! week, proration and attendance policies, ledger defaults, bulk
//! concurrency, and one progressive tax table per currency.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap().into_config();
//! println!("Tax tables loaded: {}", config.tax_tables.len());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AttendanceConfig, BulkConfig, EngineConfig, LedgerConfig, ProrationConfig, TaxTableFile,
};
