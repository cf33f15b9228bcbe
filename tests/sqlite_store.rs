//! Integration tests for the SQLite store.
//!
//! Each test opens a private in-memory database, so tests are independent.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use payroll_engine::collaborators::EmployeeDirectory;
use payroll_engine::config::EngineConfig;
use payroll_engine::engine::{BulkRequest, CancelFlag, PayrollEngine, PayrollRequest};
use payroll_engine::error::{EngineError, StoreError};
use payroll_engine::models::{
    Allowance, CompensationProfile, Deduction, EffectiveWindow, Employee, EmployeeStatus,
    PayFrequency, PayrollStats, PayrollStatus, PaymentMethod, TransactionKind,
};
use payroll_engine::store::{ACTIVE_PERIOD_CONSTRAINT, PayrollStore, SqliteStore};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn create_employee(id: &str, hire_date: NaiveDate) -> Employee {
    Employee {
        id: id.to_string(),
        organization_id: "org_001".to_string(),
        name: "Chidi Eze".to_string(),
        status: EmployeeStatus::Active,
        hire_date,
        termination_date: None,
        compensation: Some(CompensationProfile {
            base_amount: Decimal::from(100_000),
            currency: "NGN".to_string(),
            frequency: PayFrequency::Monthly,
            allowances: vec![Allowance {
                allowance_type: "housing".to_string(),
                amount: Decimal::from(20_000),
                taxable: true,
                recurring: true,
                window: EffectiveWindow::Always,
            }],
            deductions: vec![Deduction {
                deduction_type: "pension".to_string(),
                amount: Decimal::from(8_000),
                auto: true,
                recurring: true,
                window: EffectiveWindow::Always,
                description: Some("Employee pension".to_string()),
            }],
        }),
        payroll_stats: PayrollStats::default(),
    }
}

async fn store_with(employees: &[Employee]) -> SqliteStore {
    let store = SqliteStore::in_memory().await.unwrap();
    for employee in employees {
        store.insert_employee(employee).await.unwrap();
    }
    store
}

fn engine_for(store: &SqliteStore) -> PayrollEngine {
    PayrollEngine::builder(
        EngineConfig::default(),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    )
    .build()
    .unwrap()
}

#[tokio::test]
async fn test_employee_round_trip() {
    let employee = create_employee("emp_001", date(2024, 3, 15));
    let store = store_with(std::slice::from_ref(&employee)).await;

    let loaded = store.find_employee("emp_001").await.unwrap();
    assert_eq!(loaded, Some(employee));
    assert!(store.find_employee("emp_404").await.unwrap().is_none());

    let listed = store.list_employees("org_001").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(store.list_employees("org_002").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_process_persists_record_and_transaction() {
    let store = store_with(&[create_employee("emp_001", date(2024, 3, 15))]).await;
    let engine = engine_for(&store);

    let processed = engine
        .process(PayrollRequest::new("emp_001", 2024, 3))
        .await
        .unwrap();

    // prorated: base 52381, housing 10476, pension 4190
    assert_eq!(processed.record.breakdown.gross_salary, dec("62857"));
    assert_eq!(processed.record.breakdown.net_salary, dec("58667"));

    let stored = engine
        .find_payroll("emp_001", 3, 2024)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, processed.record.id);
    assert_eq!(stored.status, PayrollStatus::Paid);
    assert_eq!(stored.transaction_id, Some(processed.transaction.id));
    assert_eq!(stored.breakdown, processed.record.breakdown);
    assert_eq!(stored.audit_trace.steps, processed.record.audit_trace.steps);
    assert_eq!(stored.period, processed.record.period);

    let transactions = store.transactions_for_employee("emp_001").await.unwrap();
    assert_eq!(transactions.len(), 1);
    let transaction = &transactions[0];
    assert_eq!(transaction.id, processed.transaction.id);
    assert_eq!(transaction.kind, TransactionKind::Expense);
    assert_eq!(transaction.payment_method, PaymentMethod::BankTransfer);
    assert_eq!(transaction.amount, dec("58667"));
    assert_eq!(transaction.reference, processed.record.id);
    assert_eq!(transaction.metadata, processed.transaction.metadata);
}

#[tokio::test]
async fn test_stats_persisted() {
    let store = store_with(&[create_employee("emp_001", date(2020, 1, 1))]).await;
    let engine = engine_for(&store);

    engine
        .process(PayrollRequest::new("emp_001", 2024, 3))
        .await
        .unwrap();

    let employee = store.employee("emp_001").await.unwrap().unwrap();
    assert_eq!(employee.payroll_stats.payment_count, 1);
    assert_eq!(employee.payroll_stats.total_paid, dec("112000"));
}

#[tokio::test]
async fn test_duplicate_rejected() {
    let store = store_with(&[create_employee("emp_001", date(2020, 1, 1))]).await;
    let engine = engine_for(&store);

    engine
        .process(PayrollRequest::new("emp_001", 2024, 3))
        .await
        .unwrap();
    let second = engine
        .process(PayrollRequest::new("emp_001", 2024, 3))
        .await;

    assert!(matches!(second, Err(EngineError::DuplicatePayroll { .. })));
    assert_eq!(store.records_for_employee("emp_001").await.unwrap().len(), 1);
    assert_eq!(
        store.transactions_for_employee("emp_001").await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_unique_index_rejects_second_active_record() {
    let store = store_with(&[create_employee("emp_001", date(2020, 1, 1))]).await;
    let engine = engine_for(&store);
    let processed = engine
        .process(PayrollRequest::new("emp_001", 2024, 3))
        .await
        .unwrap();

    let mut copy = processed.record.clone();
    copy.id = Uuid::new_v4();
    copy.status = PayrollStatus::Processing;
    copy.transaction_id = None;
    copy.paid_at = None;

    let mut unit = store.begin().await.unwrap();
    let result = unit.insert_record(&copy).await;
    unit.rollback().await.unwrap();

    match result {
        Err(StoreError::UniqueViolation { constraint }) => {
            assert_eq!(constraint, ACTIVE_PERIOD_CONSTRAINT)
        }
        other => panic!("Expected UniqueViolation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_record_does_not_block_period() {
    let store = store_with(&[create_employee("emp_001", date(2020, 1, 1))]).await;
    let engine = engine_for(&store);
    let preview = engine
        .preview(&PayrollRequest::new("emp_001", 2024, 3))
        .await
        .unwrap();

    let failed = payroll_engine::models::PayrollRecord {
        id: Uuid::new_v4(),
        employee_id: "emp_001".to_string(),
        organization_id: "org_001".to_string(),
        period: payroll_engine::models::PayPeriod::for_month(2024, 3).unwrap(),
        breakdown: preview.breakdown,
        audit_trace: preview.audit_trace,
        status: PayrollStatus::Failed,
        transaction_id: None,
        paid_at: None,
        processed_by: None,
        created_at: chrono::Utc::now(),
        export: None,
    };
    let mut unit = store.begin().await.unwrap();
    unit.insert_record(&failed).await.unwrap();
    unit.commit().await.unwrap();

    assert!(engine.find_payroll("emp_001", 3, 2024).await.unwrap().is_none());
    assert!(
        engine
            .process(PayrollRequest::new("emp_001", 2024, 3))
            .await
            .is_ok()
    );
    assert_eq!(store.records_for_employee("emp_001").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rollback_discards_record() {
    let store = store_with(&[create_employee("emp_001", date(2020, 1, 1))]).await;
    let engine = engine_for(&store);
    let preview = engine
        .preview(&PayrollRequest::new("emp_001", 2024, 3))
        .await
        .unwrap();

    let record = payroll_engine::models::PayrollRecord {
        id: Uuid::new_v4(),
        employee_id: "emp_001".to_string(),
        organization_id: "org_001".to_string(),
        period: payroll_engine::models::PayPeriod::for_month(2024, 3).unwrap(),
        breakdown: preview.breakdown,
        audit_trace: preview.audit_trace,
        status: PayrollStatus::Processing,
        transaction_id: None,
        paid_at: None,
        processed_by: None,
        created_at: chrono::Utc::now(),
        export: None,
    };
    let mut unit = store.begin().await.unwrap();
    unit.insert_record(&record).await.unwrap();
    assert!(
        unit.find_active_record("emp_001", 3, 2024)
            .await
            .unwrap()
            .is_some()
    );
    unit.rollback().await.unwrap();

    assert!(store.find_record(record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_mark_exported_persisted() {
    let store = store_with(&[create_employee("emp_001", date(2020, 1, 1))]).await;
    let engine = engine_for(&store);
    let processed = engine
        .process(PayrollRequest::new("emp_001", 2024, 3))
        .await
        .unwrap();

    engine
        .mark_exported(processed.record.id, "NIBSS-0042")
        .await
        .unwrap();

    let stored = store.find_record(processed.record.id).await.unwrap().unwrap();
    assert_eq!(stored.export.unwrap().reference, "NIBSS-0042");
}

#[tokio::test]
async fn test_bulk_over_sqlite() {
    let employees: Vec<Employee> = (1..=3)
        .map(|index| create_employee(&format!("emp_{:03}", index), date(2020, 1, 1)))
        .collect();
    let store = store_with(&employees).await;
    let mut config = EngineConfig::default();
    config.bulk.max_concurrency = 2;
    let engine = PayrollEngine::builder(config, Arc::new(store.clone()), Arc::new(store.clone()))
        .build()
        .unwrap();

    let result = engine
        .process_bulk(BulkRequest::new("org_001", 2024, 3), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(result.successful.len(), 3);
    assert!(result.failed.is_empty());
    assert_eq!(result.summary().total_net, dec("336000"));
}
