//! Ledger access for a single periodic job.

use std::sync::Arc;
use tracing::{debug, error};

use crate::database::Repository;
use crate::error::ReconcilerResult;
use crate::models::PeriodicTask;

/// The `periodic_tasks` row of one job, bound to its configured interval
#[derive(Clone)]
pub struct Ledger {
    repository: Arc<dyn Repository>,
    job_name: String,
    interval_minutes: i32,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("job_name", &self.job_name)
            .field("interval_minutes", &self.interval_minutes)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    pub fn new(
        repository: Arc<dyn Repository>,
        job_name: impl Into<String>,
        interval_minutes: i32,
    ) -> Self {
        Self {
            repository,
            job_name: job_name.into(),
            interval_minutes,
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn interval_minutes(&self) -> i32 {
        self.interval_minutes
    }

    /// Read the job's row, creating it on first start.
    pub async fn load(&self) -> ReconcilerResult<PeriodicTask> {
        let task = self
            .repository
            .get_or_create_periodic_task(&self.job_name, self.interval_minutes)
            .await?;
        debug!(
            job_name = %task.job_name,
            last_run_time = ?task.last_run_time,
            failed = task.failed,
            "Loaded periodic task ledger"
        );
        Ok(task)
    }

    /// Stamp the completion of a cycle.
    pub async fn record(&self, failed: bool, error: Option<&str>) -> ReconcilerResult<PeriodicTask> {
        self.repository
            .upsert_periodic_task(&self.job_name, self.interval_minutes, failed, error)
            .await
            .inspect_err(|e| {
                error!(job_name = %self.job_name, error = %e, "Failed to record cycle in ledger");
            })
    }
}
