//! # Reconciliation Cycle
//!
//! One end-to-end pass over the ongoing orders. The first attempt covers every ongoing
//! order; each later attempt covers only the orders that failed the attempt before it
//! with a retryable error, up to [`ORDER_TASK_MAX_ATTEMPTS`]. Whatever happens, the cycle ends with exactly one
//! ledger upsert and never surfaces an error to its caller.

use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::ledger::Ledger;
use super::order_updater::OrderProcessor;
use super::worker_pool::BoundedWorkerPool;
use crate::constants::{LEDGER_ERROR_SEPARATOR, ORDER_TASK_MAX_ATTEMPTS};
use crate::database::Repository;
use crate::logging::log_cycle_outcome;
use crate::metrics;
use crate::models::Order;

/// Summary of a finished cycle; the ledger row carries the persisted part of it
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub cycle_id: Uuid,
    /// Attempts actually run (0 when the cycle aborted before the first one)
    pub attempts: u32,
    /// Orders still failing after the last attempt
    pub failed_orders: Vec<Order>,
    /// Every order error across every attempt, in attempt order
    pub errors: Vec<String>,
    /// The ongoing-order fetch failed and no attempt ran
    pub aborted: bool,
    pub ledger_recorded: bool,
}

impl CycleOutcome {
    pub fn failed(&self) -> bool {
        self.aborted || !self.failed_orders.is_empty()
    }

    /// Value written to the ledger's error column
    pub fn joined_error(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.join(LEDGER_ERROR_SEPARATOR))
        }
    }

    fn outcome_label(&self) -> &'static str {
        if self.aborted {
            "aborted"
        } else if self.failed() {
            "failed"
        } else {
            "success"
        }
    }
}

#[derive(Clone)]
pub struct ReconciliationCycle {
    ledger: Ledger,
    repository: Arc<dyn Repository>,
    pool: BoundedWorkerPool,
    processor: Arc<dyn OrderProcessor>,
    max_attempts: u32,
}

impl std::fmt::Debug for ReconciliationCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationCycle")
            .field("ledger", &self.ledger)
            .field("pool", &self.pool)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl ReconciliationCycle {
    pub fn new(
        ledger: Ledger,
        repository: Arc<dyn Repository>,
        pool: BoundedWorkerPool,
        processor: Arc<dyn OrderProcessor>,
    ) -> Self {
        Self {
            ledger,
            repository,
            pool,
            processor,
            max_attempts: ORDER_TASK_MAX_ATTEMPTS,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn run(&self) -> CycleOutcome {
        let cycle_id = Uuid::new_v4();
        let started = Instant::now();
        info!(cycle_id = %cycle_id, job_name = %self.ledger.job_name(), "Reconciliation cycle started");

        let mut outcome = match self.repository.get_ongoing_orders().await {
            Ok(orders) => self.run_attempts(cycle_id, orders).await,
            Err(e) => {
                error!(cycle_id = %cycle_id, error = %e, "Failed to fetch ongoing orders, aborting cycle");
                CycleOutcome {
                    cycle_id,
                    attempts: 0,
                    failed_orders: Vec::new(),
                    errors: vec![e.to_string()],
                    aborted: true,
                    ledger_recorded: false,
                }
            }
        };

        let error = outcome.joined_error();
        outcome.ledger_recorded = self
            .ledger
            .record(outcome.failed(), error.as_deref())
            .await
            .is_ok();

        let duration_ms = started.elapsed().as_millis() as u64;
        log_cycle_outcome(
            &cycle_id.to_string(),
            self.ledger.job_name(),
            outcome.attempts,
            outcome.failed(),
            outcome.errors.len(),
            duration_ms,
        );
        metrics::cycles_total().add(1, &[KeyValue::new("outcome", outcome.outcome_label())]);
        metrics::cycle_duration_ms().record(duration_ms as f64, &[]);

        outcome
    }

    async fn run_attempts(&self, cycle_id: Uuid, orders: Vec<Order>) -> CycleOutcome {
        let mut pending = orders;
        // Failed with an error another attempt cannot fix
        let mut exhausted = Vec::new();
        let mut errors = Vec::new();
        let mut attempts = 0;

        debug!(cycle_id = %cycle_id, ongoing = pending.len(), "Fetched ongoing orders");

        while attempts < self.max_attempts && !pending.is_empty() {
            attempts += 1;
            let batch = self
                .pool
                .run_attempt(pending, self.processor.clone(), attempts)
                .await;

            debug!(
                cycle_id = %cycle_id,
                attempt = attempts,
                succeeded = batch.succeeded,
                failed = batch.failures.len(),
                "Attempt finished"
            );

            errors.extend(batch.failures.iter().map(ToString::to_string));
            let (retry, give_up): (Vec<_>, Vec<_>) = batch
                .failures
                .into_iter()
                .partition(|f| f.error.is_retryable());
            exhausted.extend(give_up.into_iter().map(|f| f.order));
            pending = retry.into_iter().map(|f| f.order).collect();
        }

        pending.extend(exhausted);
        pending.sort_by_key(|o| o.id);

        CycleOutcome {
            cycle_id,
            attempts,
            failed_orders: pending,
            errors,
            aborted: false,
            ledger_recorded: false,
        }
    }
}
