//! Error types for the Payroll Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while calculating and committing
//! payroll.

use thiserror::Error;

/// Errors raised by a [`PayrollStore`](crate::store::PayrollStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write violated a storage-level uniqueness constraint.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// The name of the violated constraint.
        constraint: String,
    },

    /// The addressed entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g., "payroll_record").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A payroll record status change is not permitted.
    #[error("Invalid status transition for record {record_id}: {from} -> {to}")]
    InvalidTransition {
        /// The record whose status was being changed.
        record_id: String,
        /// The current status.
        from: String,
        /// The requested status.
        to: String,
    },

    /// The underlying database reported an error.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
                StoreError::UniqueViolation {
                    constraint: db_error.message().to_string(),
                }
            }
            sqlx::Error::RowNotFound => StoreError::NotFound {
                entity: "row".to_string(),
                id: "unknown".to_string(),
            },
            _ => StoreError::Database(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

/// Errors raised by external collaborators (attendance, holidays,
/// employee directory, notifications).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The collaborator could not be reached.
    #[error("{collaborator} unavailable: {message}")]
    Unavailable {
        /// The collaborator name.
        collaborator: String,
        /// A description of the failure.
        message: String,
    },

    /// The collaborator was reached but the call failed.
    #[error("{collaborator} failed: {message}")]
    Failed {
        /// The collaborator name.
        collaborator: String,
        /// A description of the failure.
        message: String,
    },
}

/// The main error type for the Payroll Engine.
///
/// All engine operations return this error type. The taxonomy separates
/// caller mistakes that must not be retried (`NotEligible`,
/// `DuplicatePayroll`, `ValidationError`) from storage failures, which are
/// surfaced unmodified so the host can decide its own retry policy.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::DuplicatePayroll {
///     employee_id: "emp_001".to_string(),
///     month: 3,
///     year: 2024,
/// };
/// assert_eq!(
///     error.to_string(),
///     "Payroll already processed for employee 'emp_001' in 3/2024"
/// );
/// assert_eq!(error.code(), "DUPLICATE_PAYROLL");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Configuration parsed but is semantically invalid.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// A description of what is wrong.
        message: String,
    },

    /// The employee directory has no employee with this id.
    #[error("Employee not found: {employee_id}")]
    EmployeeNotFound {
        /// The employee id that was looked up.
        employee_id: String,
    },

    /// The employee fails the status or compensation check.
    #[error("Employee '{employee_id}' is not eligible for payroll: {reason}")]
    NotEligible {
        /// The employee id.
        employee_id: String,
        /// Why the employee is not eligible.
        reason: String,
    },

    /// The period already has a processing or paid record.
    #[error("Payroll already processed for employee '{employee_id}' in {month}/{year}")]
    DuplicatePayroll {
        /// The employee id.
        employee_id: String,
        /// The period month (1-12).
        month: u32,
        /// The period year.
        year: i32,
    },

    /// Required data is missing or malformed.
    #[error("Validation failed for '{field}': {message}")]
    ValidationError {
        /// The offending field.
        field: String,
        /// A description of the problem.
        message: String,
    },

    /// No payroll record exists with this id.
    #[error("Payroll record not found: {record_id}")]
    RecordNotFound {
        /// The record id that was looked up.
        record_id: String,
    },

    /// The storage backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A collaborator call failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Returns a stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                "CONFIG_ERROR"
            }
            EngineError::InvalidConfig { .. } => "INVALID_CONFIG",
            EngineError::EmployeeNotFound { .. } => "EMPLOYEE_NOT_FOUND",
            EngineError::NotEligible { .. } => "NOT_ELIGIBLE",
            EngineError::DuplicatePayroll { .. } => "DUPLICATE_PAYROLL",
            EngineError::ValidationError { .. } => "VALIDATION_ERROR",
            EngineError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            EngineError::Store(_) => "STORAGE_ERROR",
            EngineError::Collaborator(_) => "COLLABORATOR_ERROR",
            EngineError::CalculationError { .. } => "CALCULATION_ERROR",
        }
    }

    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        EngineError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
