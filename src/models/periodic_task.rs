//! # Periodic Task Ledger Record
//!
//! Durable bookkeeping for the reconciliation job: one row per `job_name` holding the
//! configured interval and the outcome of the most recent cycle. The scheduler reads it
//! at start-up to anchor its timing; each cycle upserts it once on completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Maps to the `periodic_tasks` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PeriodicTask {
    pub id: i64,
    pub job_name: String,
    pub interval_in_minutes: i32,
    /// `None` means the job has never completed a cycle
    pub last_run_time: Option<DateTime<Utc>>,
    pub failed: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PeriodicTask {
    pub fn has_run(&self) -> bool {
        self.last_run_time.is_some()
    }
}
