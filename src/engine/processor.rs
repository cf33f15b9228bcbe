//! Single-employee payroll processing.

use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::calculation::{BreakdownCalculation, BreakdownInput, HolidaySet, calculate_breakdown};
use crate::collaborators::SalaryProcessedEvent;
use crate::error::{EngineError, EngineResult, StoreError};
use crate::models::{
    AttendanceFact, AuditWarning, CompensationProfile, Employee, LedgerTransaction, PayPeriod,
    PayrollRecord, PayrollStatus, TransactionKind, TransactionMetadata,
};
use crate::store::PayrollUnit;

use super::{PayrollEngine, PayrollRequest, ProcessedPayroll};

/// Collaborator data gathered before a calculation.
struct CalculationInputs {
    holidays: HolidaySet,
    attendance: Option<AttendanceFact>,
    warnings: Vec<AuditWarning>,
}

/// Checks the employee's linkage and eligibility, returning the profile.
fn payable_profile(employee: &Employee) -> EngineResult<&CompensationProfile> {
    if employee.organization_id.trim().is_empty() {
        return Err(EngineError::validation(
            "organization_id",
            format!("employee '{}' has no organization", employee.id),
        ));
    }
    let profile = employee.compensation.as_ref().ok_or_else(|| {
        EngineError::validation(
            "compensation",
            format!("employee '{}' has no compensation profile", employee.id),
        )
    })?;
    if profile.currency.trim().is_empty() {
        return Err(EngineError::validation(
            "currency",
            format!("compensation profile of '{}' has no currency", employee.id),
        ));
    }
    if let Some(reason) = employee.ineligibility_reason() {
        return Err(EngineError::NotEligible {
            employee_id: employee.id.clone(),
            reason,
        });
    }
    Ok(profile)
}

impl PayrollEngine {
    /// Calculates the breakdown a [`process`](Self::process) call would
    /// commit, without writing anything.
    ///
    /// # Errors
    ///
    /// Same as `process` for employee lookup, eligibility, holiday lookup
    /// and calculation.
    pub async fn preview(&self, request: &PayrollRequest) -> EngineResult<BreakdownCalculation> {
        let period = PayPeriod::for_month(request.year, request.month)?;
        let employee = self.load_employee(&request.employee_id).await?;
        let profile = payable_profile(&employee)?;
        let inputs = self
            .gather_inputs(&employee, &period, request.attendance)
            .await?;
        self.calculate(&employee, profile, &period, inputs)
    }

    /// Calculates and commits one employee's payroll for one month.
    ///
    /// The duplicate check, the record, the ledger transaction, the paid
    /// status and the employee statistics are written in one unit: either
    /// all of them commit or none do. Collaborator reads happen before the
    /// unit opens. A `salary processed` event is sent after commit.
    ///
    /// # Errors
    ///
    /// - `EmployeeNotFound` if the directory has no such employee
    /// - `ValidationError` if the profile, currency or organization is missing
    /// - `NotEligible` if the status or base amount forbids payment
    /// - `ValidationError` if deductions exceed gross pay; nothing is written
    /// - `DuplicatePayroll` if the period is already processing or paid;
    ///   fetch it with [`find_payroll`](Self::find_payroll) instead of retrying
    /// - `Store` and `Collaborator` errors unmodified
    pub async fn process(&self, request: PayrollRequest) -> EngineResult<ProcessedPayroll> {
        self.process_for(request, None).await
    }

    /// Processes a request, optionally requiring the employee to belong to
    /// `organization_id`.
    pub(super) async fn process_for(
        &self,
        request: PayrollRequest,
        organization_id: Option<&str>,
    ) -> EngineResult<ProcessedPayroll> {
        let start_time = Instant::now();
        let period = PayPeriod::for_month(request.year, request.month)?;
        let employee = self.load_employee(&request.employee_id).await?;
        if let Some(expected) = organization_id {
            if employee.organization_id != expected {
                return Err(EngineError::validation(
                    "organization_id",
                    format!(
                        "employee '{}' does not belong to organization '{}'",
                        employee.id, expected
                    ),
                ));
            }
        }
        let profile = payable_profile(&employee)?;
        let inputs = self
            .gather_inputs(&employee, &period, request.attendance)
            .await?;

        let mut unit = self.store.begin().await?;
        let written = self
            .write_payroll(unit.as_mut(), &employee, profile, &period, inputs, &request)
            .await;

        let processed = match written {
            Ok(processed) => processed,
            Err(failure) => {
                if let Err(rollback_error) = unit.rollback().await {
                    error!(
                        employee_id = %employee.id,
                        month = period.month,
                        year = period.year,
                        error = %rollback_error,
                        "Rollback failed"
                    );
                }
                return Err(failure);
            }
        };
        unit.commit().await?;

        let duration_us = u64::try_from(start_time.elapsed().as_micros()).unwrap_or(u64::MAX);
        info!(
            employee_id = %employee.id,
            month = period.month,
            year = period.year,
            record_id = %processed.record.id,
            net_salary = %processed.record.breakdown.net_salary,
            duration_us,
            "Payroll committed"
        );

        self.notify_processed(&processed).await;
        Ok(processed)
    }

    /// Returns the processing or paid record for an employee and month.
    pub async fn find_payroll(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> EngineResult<Option<PayrollRecord>> {
        Ok(self
            .store
            .find_active_record(employee_id, month, year)
            .await?)
    }

    /// Records that a paid payroll was exported, e.g. to a bank file.
    ///
    /// # Errors
    ///
    /// - `RecordNotFound` if no record has this id
    /// - `ValidationError` if the record is not paid or the reference is blank
    pub async fn mark_exported(
        &self,
        record_id: Uuid,
        reference: &str,
    ) -> EngineResult<PayrollRecord> {
        if reference.trim().is_empty() {
            return Err(EngineError::validation(
                "reference",
                "export reference must not be blank",
            ));
        }
        let record = self
            .store
            .find_record(record_id)
            .await?
            .ok_or_else(|| EngineError::RecordNotFound {
                record_id: record_id.to_string(),
            })?;
        if record.status != PayrollStatus::Paid {
            return Err(EngineError::validation(
                "status",
                format!(
                    "record {} is {}, only paid records can be exported",
                    record_id, record.status
                ),
            ));
        }

        Ok(self
            .store
            .mark_exported(record_id, reference, Utc::now())
            .await?)
    }

    async fn load_employee(&self, employee_id: &str) -> EngineResult<Employee> {
        self.employees
            .find_employee(employee_id)
            .await?
            .ok_or_else(|| EngineError::EmployeeNotFound {
                employee_id: employee_id.to_string(),
            })
    }

    /// Reads holidays and attendance. Holiday failures propagate since they
    /// change proration; attendance failures become a warning.
    async fn gather_inputs(
        &self,
        employee: &Employee,
        period: &PayPeriod,
        attendance: Option<AttendanceFact>,
    ) -> EngineResult<CalculationInputs> {
        let holidays = match &self.holidays {
            Some(calendar) => calendar
                .holidays(&employee.organization_id, period.start_date, period.end_date)
                .await?
                .into_iter()
                .map(|holiday| holiday.date)
                .collect(),
            None => HolidaySet::new(),
        };

        let mut warnings = Vec::new();
        let attendance = match (attendance, &self.attendance) {
            (Some(fact), _) => Some(fact),
            (None, Some(source)) => match source
                .attendance(
                    &employee.organization_id,
                    &employee.id,
                    period.year,
                    period.month,
                )
                .await
            {
                Ok(fact) => fact,
                Err(lookup_error) => {
                    warn!(
                        employee_id = %employee.id,
                        month = period.month,
                        year = period.year,
                        error = %lookup_error,
                        "Attendance lookup failed, continuing without absence deduction"
                    );
                    warnings.push(AuditWarning {
                        code: "ATTENDANCE_UNAVAILABLE".to_string(),
                        message: format!("Attendance lookup failed: {}", lookup_error),
                        severity: "medium".to_string(),
                    });
                    None
                }
            },
            (None, None) => None,
        };

        Ok(CalculationInputs {
            holidays,
            attendance,
            warnings,
        })
    }

    fn calculate(
        &self,
        employee: &Employee,
        profile: &CompensationProfile,
        period: &PayPeriod,
        inputs: CalculationInputs,
    ) -> EngineResult<BreakdownCalculation> {
        let input = BreakdownInput {
            profile,
            hire_date: employee.hire_date,
            termination_date: employee.termination_date,
            period,
            holidays: &inputs.holidays,
            attendance: inputs.attendance,
        };
        let mut calculation = calculate_breakdown(&input, &self.config)?;
        calculation.audit_trace.warnings.extend(inputs.warnings);
        Ok(calculation)
    }

    /// Duplicate check, record, transaction, paid status and statistics,
    /// all written through `unit`.
    async fn write_payroll(
        &self,
        unit: &mut dyn PayrollUnit,
        employee: &Employee,
        profile: &CompensationProfile,
        period: &PayPeriod,
        inputs: CalculationInputs,
        request: &PayrollRequest,
    ) -> EngineResult<ProcessedPayroll> {
        let duplicate = || EngineError::DuplicatePayroll {
            employee_id: employee.id.clone(),
            month: period.month,
            year: period.year,
        };

        if unit
            .find_active_record(&employee.id, period.month, period.year)
            .await?
            .is_some()
        {
            return Err(duplicate());
        }

        let calculation = self.calculate(employee, profile, period, inputs)?;
        if calculation.breakdown.net_salary < Decimal::ZERO {
            return Err(EngineError::validation(
                "net_salary",
                format!(
                    "deductions exceed gross pay for '{}': net {}",
                    employee.id, calculation.breakdown.net_salary
                ),
            ));
        }

        let mut record = PayrollRecord {
            id: Uuid::new_v4(),
            employee_id: employee.id.clone(),
            organization_id: employee.organization_id.clone(),
            period: period.clone(),
            breakdown: calculation.breakdown,
            audit_trace: calculation.audit_trace,
            status: PayrollStatus::Processing,
            transaction_id: None,
            paid_at: None,
            processed_by: request.processed_by.clone(),
            created_at: Utc::now(),
            export: None,
        };
        unit.insert_record(&record).await.map_err(|store_error| match store_error {
            StoreError::UniqueViolation { .. } => duplicate(),
            other => other.into(),
        })?;

        let transaction = LedgerTransaction {
            id: Uuid::new_v4(),
            organization_id: employee.organization_id.clone(),
            employee_id: employee.id.clone(),
            kind: TransactionKind::Expense,
            category: self.config.ledger.category.clone(),
            amount: record.breakdown.net_salary,
            currency: profile.currency.clone(),
            payment_method: self.config.ledger.payment_method,
            reference: record.id,
            description: format!(
                "Salary for {} ({})",
                employee.name,
                period.start_date.format("%B %Y")
            ),
            metadata: TransactionMetadata {
                period: period.clone(),
                base_amount: record.breakdown.base_amount,
                allowances: record.breakdown.allowances.clone(),
                deductions: record.breakdown.deductions.clone(),
                tax_amount: record.breakdown.tax_amount,
                gross_salary: record.breakdown.gross_salary,
                net_salary: record.breakdown.net_salary,
            },
            created_by: request.processed_by.clone(),
            created_at: Utc::now(),
        };
        unit.insert_transaction(&transaction).await?;

        let paid_at = Utc::now();
        unit.mark_paid(record.id, transaction.id, paid_at).await?;
        record.status = PayrollStatus::Paid;
        record.transaction_id = Some(transaction.id);
        record.paid_at = Some(paid_at);

        let stats = unit.employee_stats(&employee.id).await?;
        let stats = stats.record_payment(record.breakdown.net_salary, paid_at);
        unit.update_employee_stats(&employee.id, &stats).await?;

        Ok(ProcessedPayroll {
            record,
            transaction,
        })
    }

    async fn notify_processed(&self, processed: &ProcessedPayroll) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let event = SalaryProcessedEvent {
            employee_id: processed.record.employee_id.clone(),
            payroll_id: processed.record.id,
            period: processed.record.period.clone(),
            gross_salary: processed.record.breakdown.gross_salary,
            net_salary: processed.record.breakdown.net_salary,
            transaction_id: processed.transaction.id,
        };
        if let Err(notify_error) = notifier.salary_processed(event).await {
            warn!(
                employee_id = %processed.record.employee_id,
                record_id = %processed.record.id,
                error = %notify_error,
                "Salary notification failed"
            );
        }
    }
}
