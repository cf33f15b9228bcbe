//! SQLite-backed store.
//!
//! Money is stored as TEXT so decimals round-trip exactly. Breakdowns, audit
//! traces and transaction metadata are stored as JSON. The partial unique
//! index `ux_payroll_active_period` enforces one `processing` or `paid`
//! record per employee and period.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use uuid::Uuid;

use crate::collaborators::EmployeeDirectory;
use crate::error::{CollaboratorError, StoreError};
use crate::models::{
    Employee, ExportInfo, LedgerTransaction, PayrollRecord, PayrollStats, PayrollStatus,
};

use super::{ACTIVE_PERIOD_CONSTRAINT, PayrollStore, PayrollUnit};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS employees (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    hire_date TEXT NOT NULL,
    termination_date TEXT,
    compensation TEXT,
    payroll_stats TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ix_employees_organization ON employees (organization_id);

CREATE TABLE IF NOT EXISTS payroll_records (
    id TEXT PRIMARY KEY,
    employee_id TEXT NOT NULL,
    organization_id TEXT NOT NULL,
    period_month INTEGER NOT NULL,
    period_year INTEGER NOT NULL,
    period TEXT NOT NULL,
    breakdown TEXT NOT NULL,
    audit_trace TEXT NOT NULL,
    status TEXT NOT NULL,
    transaction_id TEXT,
    paid_at TEXT,
    processed_by TEXT,
    created_at TEXT NOT NULL,
    export TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_payroll_active_period
    ON payroll_records (employee_id, period_month, period_year)
    WHERE status IN ('processing', 'paid');

CREATE TABLE IF NOT EXISTS ledger_transactions (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    employee_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    category TEXT NOT NULL,
    amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    payment_method TEXT NOT NULL,
    reference TEXT NOT NULL,
    description TEXT NOT NULL,
    metadata TEXT NOT NULL,
    created_by TEXT,
    created_at TEXT NOT NULL
);
"#;

const RECORD_COLUMNS: &str = "id, employee_id, organization_id, period, breakdown, audit_trace, \
     status, transaction_id, paid_at, processed_by, created_at, export";

const TRANSACTION_COLUMNS: &str = "id, organization_id, employee_id, kind, category, amount, \
     currency, payment_method, reference, description, metadata, created_by, created_at";

const EMPLOYEE_COLUMNS: &str = "id, organization_id, name, status, hire_date, termination_date, \
     compensation, payroll_stats";

/// A payroll store and employee directory on SQLite.
///
/// The pool holds a single connection. A unit owns that connection from
/// `begin` until it finishes, so units are serialised.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `database_url` and
    /// applies the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Opens a private in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        // An in-memory database lives as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    /// Wraps an existing pool and applies the schema.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Adds or replaces an employee.
    pub async fn insert_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        let compensation = employee
            .compensation
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT OR REPLACE INTO employees
                (id, organization_id, name, status, hire_date, termination_date,
                 compensation, payroll_stats)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&employee.id)
        .bind(&employee.organization_id)
        .bind(&employee.name)
        .bind(enum_text(&employee.status)?)
        .bind(employee.hire_date)
        .bind(employee.termination_date)
        .bind(compensation)
        .bind(serde_json::to_string(&employee.payroll_stats)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns an employee as currently stored.
    pub async fn employee(&self, employee_id: &str) -> Result<Option<Employee>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM employees WHERE id = ?",
            EMPLOYEE_COLUMNS
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_employee).transpose()
    }
}

fn enum_text<T: Serialize>(value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(text) => Ok(text),
        other => Err(StoreError::Serialization(format!(
            "expected a string variant, got {}",
            other
        ))),
    }
}

fn enum_from_text<T: DeserializeOwned>(text: String) -> Result<T, StoreError> {
    Ok(serde_json::from_value(serde_json::Value::String(text))?)
}

fn json_column<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T, StoreError> {
    let text: String = row.try_get(column)?;
    Ok(serde_json::from_str(&text)?)
}

fn optional_json_column<T: DeserializeOwned>(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<T>, StoreError> {
    let text: Option<String> = row.try_get(column)?;
    text.map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(StoreError::from)
}

fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid, StoreError> {
    let text: String = row.try_get(column)?;
    Uuid::parse_str(&text)
        .map_err(|e| StoreError::Serialization(format!("column '{}': {}", column, e)))
}

fn optional_uuid_column(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, StoreError> {
    let text: Option<String> = row.try_get(column)?;
    text.map(|text| {
        Uuid::parse_str(&text)
            .map_err(|e| StoreError::Serialization(format!("column '{}': {}", column, e)))
    })
    .transpose()
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, StoreError> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text)
        .map_err(|e| StoreError::Serialization(format!("column '{}': {}", column, e)))
}

fn row_to_record(row: &SqliteRow) -> Result<PayrollRecord, StoreError> {
    Ok(PayrollRecord {
        id: uuid_column(row, "id")?,
        employee_id: row.try_get("employee_id")?,
        organization_id: row.try_get("organization_id")?,
        period: json_column(row, "period")?,
        breakdown: json_column(row, "breakdown")?,
        audit_trace: json_column(row, "audit_trace")?,
        status: enum_from_text(row.try_get("status")?)?,
        transaction_id: optional_uuid_column(row, "transaction_id")?,
        paid_at: row.try_get::<Option<DateTime<Utc>>, _>("paid_at")?,
        processed_by: row.try_get("processed_by")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        export: optional_json_column(row, "export")?,
    })
}

fn row_to_transaction(row: &SqliteRow) -> Result<LedgerTransaction, StoreError> {
    Ok(LedgerTransaction {
        id: uuid_column(row, "id")?,
        organization_id: row.try_get("organization_id")?,
        employee_id: row.try_get("employee_id")?,
        kind: enum_from_text(row.try_get("kind")?)?,
        category: row.try_get("category")?,
        amount: decimal_column(row, "amount")?,
        currency: row.try_get("currency")?,
        payment_method: enum_from_text(row.try_get("payment_method")?)?,
        reference: uuid_column(row, "reference")?,
        description: row.try_get("description")?,
        metadata: json_column(row, "metadata")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_employee(row: &SqliteRow) -> Result<Employee, StoreError> {
    Ok(Employee {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        name: row.try_get("name")?,
        status: enum_from_text(row.try_get("status")?)?,
        hire_date: row.try_get::<NaiveDate, _>("hire_date")?,
        termination_date: row.try_get::<Option<NaiveDate>, _>("termination_date")?,
        compensation: optional_json_column(row, "compensation")?,
        payroll_stats: json_column(row, "payroll_stats")?,
    })
}

fn directory_error(error: StoreError) -> CollaboratorError {
    CollaboratorError::Failed {
        collaborator: "sqlite employee directory".to_string(),
        message: error.to_string(),
    }
}

#[async_trait]
impl EmployeeDirectory for SqliteStore {
    async fn find_employee(&self, employee_id: &str) -> Result<Option<Employee>, CollaboratorError> {
        self.employee(employee_id).await.map_err(directory_error)
    }

    async fn list_employees(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Employee>, CollaboratorError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM employees WHERE organization_id = ? ORDER BY id",
            EMPLOYEE_COLUMNS
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| directory_error(e.into()))?;

        rows.iter()
            .map(row_to_employee)
            .collect::<Result<Vec<_>, _>>()
            .map_err(directory_error)
    }
}

#[async_trait]
impl PayrollStore for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn PayrollUnit>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteUnit { tx }))
    }

    async fn find_record(&self, record_id: Uuid) -> Result<Option<PayrollRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM payroll_records WHERE id = ?",
            RECORD_COLUMNS
        ))
        .bind(record_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_active_record(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> Result<Option<PayrollRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM payroll_records
             WHERE employee_id = ? AND period_month = ? AND period_year = ?
               AND status IN ('processing', 'paid')",
            RECORD_COLUMNS
        ))
        .bind(employee_id)
        .bind(i64::from(month))
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn records_for_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<PayrollRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM payroll_records WHERE employee_id = ? ORDER BY created_at, rowid",
            RECORD_COLUMNS
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn transactions_for_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<LedgerTransaction>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ledger_transactions WHERE employee_id = ? ORDER BY created_at, rowid",
            TRANSACTION_COLUMNS
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_transaction).collect()
    }

    async fn mark_exported(
        &self,
        record_id: Uuid,
        reference: &str,
        exported_at: DateTime<Utc>,
    ) -> Result<PayrollRecord, StoreError> {
        let export = serde_json::to_string(&ExportInfo {
            exported_at,
            reference: reference.to_string(),
        })?;

        let result = sqlx::query("UPDATE payroll_records SET export = ? WHERE id = ?")
            .bind(export)
            .bind(record_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "payroll_record".to_string(),
                id: record_id.to_string(),
            });
        }

        self.find_record(record_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "payroll_record".to_string(),
                id: record_id.to_string(),
            })
    }
}

struct SqliteUnit {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl PayrollUnit for SqliteUnit {
    async fn find_active_record(
        &mut self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> Result<Option<PayrollRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM payroll_records
             WHERE employee_id = ? AND period_month = ? AND period_year = ?
               AND status IN ('processing', 'paid')",
            RECORD_COLUMNS
        ))
        .bind(employee_id)
        .bind(i64::from(month))
        .bind(year)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn insert_record(&mut self, record: &PayrollRecord) -> Result<(), StoreError> {
        let export = record.export.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            "INSERT INTO payroll_records
                (id, employee_id, organization_id, period_month, period_year, period,
                 breakdown, audit_trace, status, transaction_id, paid_at, processed_by,
                 created_at, export)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.employee_id)
        .bind(&record.organization_id)
        .bind(i64::from(record.period.month))
        .bind(record.period.year)
        .bind(serde_json::to_string(&record.period)?)
        .bind(serde_json::to_string(&record.breakdown)?)
        .bind(serde_json::to_string(&record.audit_trace)?)
        .bind(record.status.as_str())
        .bind(record.transaction_id.map(|id| id.to_string()))
        .bind(record.paid_at)
        .bind(record.processed_by.as_deref())
        .bind(record.created_at)
        .bind(export)
        .execute(&mut *self.tx)
        .await
        .map_err(|error| match StoreError::from(error) {
            // SQLite names the columns, not the index
            StoreError::UniqueViolation { constraint } if constraint.contains("period_month") => {
                StoreError::UniqueViolation {
                    constraint: ACTIVE_PERIOD_CONSTRAINT.to_string(),
                }
            }
            other => other,
        })?;

        Ok(())
    }

    async fn insert_transaction(
        &mut self,
        transaction: &LedgerTransaction,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO ledger_transactions
                (id, organization_id, employee_id, kind, category, amount, currency,
                 payment_method, reference, description, metadata, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(transaction.id.to_string())
        .bind(&transaction.organization_id)
        .bind(&transaction.employee_id)
        .bind(enum_text(&transaction.kind)?)
        .bind(&transaction.category)
        .bind(transaction.amount.to_string())
        .bind(&transaction.currency)
        .bind(enum_text(&transaction.payment_method)?)
        .bind(transaction.reference.to_string())
        .bind(&transaction.description)
        .bind(serde_json::to_string(&transaction.metadata)?)
        .bind(transaction.created_by.as_deref())
        .bind(transaction.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn mark_paid(
        &mut self,
        record_id: Uuid,
        transaction_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let row = sqlx::query("SELECT status FROM payroll_records WHERE id = ?")
            .bind(record_id.to_string())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "payroll_record".to_string(),
                id: record_id.to_string(),
            })?;

        let status_text: String = row.try_get("status")?;
        let status = PayrollStatus::parse(&status_text).ok_or_else(|| {
            StoreError::Serialization(format!("unknown payroll status '{}'", status_text))
        })?;
        if !status.can_transition_to(PayrollStatus::Paid) {
            return Err(StoreError::InvalidTransition {
                record_id: record_id.to_string(),
                from: status.to_string(),
                to: PayrollStatus::Paid.to_string(),
            });
        }

        sqlx::query(
            "UPDATE payroll_records SET status = ?, transaction_id = ?, paid_at = ? WHERE id = ?",
        )
        .bind(PayrollStatus::Paid.as_str())
        .bind(transaction_id.to_string())
        .bind(paid_at)
        .bind(record_id.to_string())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn employee_stats(&mut self, employee_id: &str) -> Result<PayrollStats, StoreError> {
        let row = sqlx::query("SELECT payroll_stats FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "employee".to_string(),
                id: employee_id.to_string(),
            })?;

        json_column(&row, "payroll_stats")
    }

    async fn update_employee_stats(
        &mut self,
        employee_id: &str,
        stats: &PayrollStats,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE employees SET payroll_stats = ? WHERE id = ?")
            .bind(serde_json::to_string(stats)?)
            .bind(employee_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "employee".to_string(),
                id: employee_id.to_string(),
            });
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
