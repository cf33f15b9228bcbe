//! Organization-wide payroll runs.

use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::collaborators::BatchCompletedEvent;
use crate::error::EngineResult;
use crate::models::PayPeriod;

use super::{
    BulkFailure, BulkRequest, BulkResult, CancelFlag, PayrollEngine, PayrollRequest,
    ProcessedPayroll,
};

enum Outcome {
    Paid(Box<ProcessedPayroll>),
    Failed(BulkFailure),
    Skipped(String),
}

impl PayrollEngine {
    /// Pays every selected employee of an organization for one month.
    ///
    /// Each employee runs the full single-employee protocol in its own unit,
    /// so one failure never affects another. At most
    /// `bulk.max_concurrency` employees are in flight; results keep input
    /// order. Once `cancel` is set, employees not yet started are skipped.
    ///
    /// # Errors
    ///
    /// Only errors that prevent the run from starting are returned: an
    /// invalid period or a failed employee listing. Per-employee errors are
    /// collected in [`BulkResult::failed`].
    pub async fn process_bulk(
        &self,
        request: BulkRequest,
        cancel: &CancelFlag,
    ) -> EngineResult<BulkResult> {
        let start_time = Instant::now();
        let period = PayPeriod::for_month(request.year, request.month)?;
        let employee_ids = match request.employee_ids {
            Some(ids) => ids,
            None => self
                .employees
                .list_employees(&request.organization_id)
                .await?
                .into_iter()
                .map(|employee| employee.id)
                .collect(),
        };

        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            organization_id = %request.organization_id,
            month = period.month,
            year = period.year,
            employees = employee_ids.len(),
            max_concurrency = self.config.bulk.max_concurrency,
            "Bulk payroll started"
        );

        let (year, month) = (period.year, period.month);
        let organization_id = request.organization_id.as_str();
        let processed_by = request.processed_by.as_deref();
        let outcomes: Vec<Outcome> = stream::iter(employee_ids.iter().cloned())
            .map(|employee_id| async move {
                if cancel.is_cancelled() {
                    return Outcome::Skipped(employee_id);
                }
                let mut payroll = PayrollRequest::new(employee_id.clone(), year, month);
                payroll.processed_by = processed_by.map(str::to_string);

                match self.process_for(payroll, Some(organization_id)).await {
                    Ok(processed) => Outcome::Paid(Box::new(processed)),
                    Err(failure) => {
                        warn!(
                            %run_id,
                            employee_id = %employee_id,
                            code = failure.code(),
                            error = %failure,
                            "Employee payroll failed"
                        );
                        Outcome::Failed(BulkFailure {
                            employee_id,
                            code: failure.code().to_string(),
                            error: failure.to_string(),
                        })
                    }
                }
            })
            .buffered(self.config.bulk.max_concurrency)
            .collect()
            .await;

        let mut result = BulkResult {
            total: employee_ids.len(),
            cancelled: cancel.is_cancelled(),
            ..BulkResult::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Paid(processed) => result.successful.push(*processed),
                Outcome::Failed(failure) => result.failed.push(failure),
                Outcome::Skipped(employee_id) => result.skipped.push(employee_id),
            }
        }

        let summary = result.summary();
        info!(
            %run_id,
            organization_id = %request.organization_id,
            successful = summary.successful,
            failed = summary.failed,
            skipped = summary.skipped,
            total_net = %summary.total_net,
            cancelled = result.cancelled,
            duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Bulk payroll finished"
        );

        if let Some(notifier) = &self.notifier {
            let event = BatchCompletedEvent {
                organization_id: request.organization_id.clone(),
                month: period.month,
                year: period.year,
                summary,
            };
            if let Err(notify_error) = notifier.batch_completed(event).await {
                warn!(
                    %run_id,
                    organization_id = %request.organization_id,
                    error = %notify_error,
                    "Batch notification failed"
                );
            }
        }

        Ok(result)
    }
}
