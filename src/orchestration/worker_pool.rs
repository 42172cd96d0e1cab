//! # Bounded Worker Pool
//!
//! Runs one [`OrderProcessor`] invocation per order with at most `max_concurrency`
//! in flight. A permit is acquired before each spawn, so the dispatch loop itself
//! applies backpressure. Every invocation runs under its own timeout and panic guard;
//! failures are collected into a shared accumulator and returned to the caller once
//! all workers have finished. A worker task that dies outside those guards still
//! reports its order as failed.

use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use super::order_updater::{OrderProcessor, UpdateOutcome};
use crate::error::ReconcilerError;
use crate::metrics;
use crate::models::Order;
use opentelemetry::KeyValue;

/// An order whose update did not succeed in a given attempt
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFailure {
    pub order: Order,
    pub error: ReconcilerError,
}

impl fmt::Display for OrderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order {}: {}", self.order.id, self.error)
    }
}

/// Result of one pass over a batch of orders
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failures: Vec<OrderFailure>,
}

impl BatchOutcome {
    /// Orders to feed into the next attempt
    pub fn failed_orders(&self) -> Vec<Order> {
        self.failures.iter().map(|f| f.order.clone()).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BoundedWorkerPool {
    max_concurrency: usize,
    task_timeout: Duration,
}

impl BoundedWorkerPool {
    /// A zero concurrency limit is raised to one so the pool always makes progress.
    pub fn new(max_concurrency: usize, task_timeout: Duration) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            task_timeout,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    /// Process every order once and return when all workers are done.
    pub async fn run(&self, orders: Vec<Order>, processor: Arc<dyn OrderProcessor>) -> BatchOutcome {
        self.run_attempt(orders, processor, 1).await
    }

    pub(crate) async fn run_attempt(
        &self,
        orders: Vec<Order>,
        processor: Arc<dyn OrderProcessor>,
        attempt: u32,
    ) -> BatchOutcome {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let failures: Arc<Mutex<Vec<OrderFailure>>> = Arc::new(Mutex::new(Vec::new()));
        // Orders whose worker has not reported back, keyed by dispatch index
        let in_flight: Arc<Mutex<HashMap<usize, Order>>> = Arc::new(Mutex::new(HashMap::new()));
        let mut workers = JoinSet::new();
        let total = orders.len();

        debug!(
            attempt = attempt,
            orders = total,
            max_concurrency = self.max_concurrency,
            "Dispatching order updates"
        );

        for (slot, order) in orders.into_iter().enumerate() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!(order_id = order.id, "Worker semaphore closed before dispatch");
                    failures.lock().push(OrderFailure {
                        order,
                        error: ReconcilerError::WorkerPanicked(
                            "worker semaphore closed".to_string(),
                        ),
                    });
                    continue;
                }
            };

            let processor = processor.clone();
            let failures = failures.clone();
            let in_flight = in_flight.clone();
            let timeout = self.task_timeout;
            in_flight.lock().insert(slot, order.clone());

            workers.spawn(async move {
                let result = Self::execute_with_timeout(processor.as_ref(), &order, timeout).await;
                drop(permit);
                in_flight.lock().remove(&slot);

                match result {
                    Ok(_) => {
                        metrics::orders_updated_total().add(1, &[]);
                    }
                    Err(error) => {
                        metrics::orders_failed_total()
                            .add(1, &[KeyValue::new("attempt", attempt as i64)]);
                        failures.lock().push(OrderFailure { order, error });
                    }
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Order worker task aborted");
            }
        }

        let mut failures = std::mem::take(&mut *failures.lock());
        for (_, order) in in_flight.lock().drain() {
            error!(order_id = order.id, "Order worker exited without reporting");
            metrics::orders_failed_total().add(1, &[KeyValue::new("attempt", attempt as i64)]);
            failures.push(OrderFailure {
                order,
                error: ReconcilerError::WorkerPanicked("order worker task aborted".to_string()),
            });
        }
        failures.sort_by_key(|f| f.order.id);

        BatchOutcome {
            succeeded: total - failures.len(),
            failures,
        }
    }

    /// Execute one order update with timeout and panic catching
    async fn execute_with_timeout(
        processor: &dyn OrderProcessor,
        order: &Order,
        timeout: Duration,
    ) -> Result<UpdateOutcome, ReconcilerError> {
        let start = Instant::now();
        let result = tokio::time::timeout(
            timeout,
            AssertUnwindSafe(processor.process(order)).catch_unwind(),
        )
        .await;

        match result {
            Ok(Ok(Ok(outcome))) => {
                debug!(
                    order_id = order.id,
                    outcome = ?outcome,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Order update completed"
                );
                Ok(outcome)
            }
            Ok(Ok(Err(e))) => {
                warn!(order_id = order.id, error = %e, "Order update failed");
                Err(e)
            }
            Ok(Err(panic_error)) => {
                let panic_msg = if let Some(s) = panic_error.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_error.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!(order_id = order.id, panic_msg = %panic_msg, "Order update panicked");
                Err(ReconcilerError::WorkerPanicked(panic_msg))
            }
            Err(_) => {
                warn!(
                    order_id = order.id,
                    timeout_secs = timeout.as_secs(),
                    "Order update timed out"
                );
                Err(ReconcilerError::Timeout {
                    order_id: order.id,
                    timeout_secs: timeout.as_secs(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcilerResult;
    use crate::state_machine::OrderStatus;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the configured ids, hangs on `hang`, panics on `panic_on`.
    #[derive(Default)]
    struct ScriptedProcessor {
        fail: HashSet<i64>,
        hang: HashSet<i64>,
        panic_on: HashSet<i64>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OrderProcessor for ScriptedProcessor {
        async fn process(&self, order: &Order) -> ReconcilerResult<UpdateOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if self.hang.contains(&order.id) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            } else {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panic_on.contains(&order.id) {
                panic!("processor exploded on order {}", order.id);
            }
            if self.fail.contains(&order.id) {
                return Err(ReconcilerError::FeedError(format!("feed down for {}", order.id)));
            }
            Ok(UpdateOutcome::Confirmed(order.status))
        }
    }

    fn orders(ids: impl IntoIterator<Item = i64>) -> Vec<Order> {
        ids.into_iter()
            .map(|id| Order::new(id, 1, OrderStatus::InProgress))
            .collect()
    }

    #[tokio::test]
    async fn test_failures_are_collected_by_order() {
        let processor = Arc::new(ScriptedProcessor {
            fail: [2, 4].into_iter().collect(),
            ..Default::default()
        });
        let pool = BoundedWorkerPool::new(3, Duration::from_secs(5));

        let outcome = pool.run(orders(1..=5), processor.clone()).await;

        assert_eq!(outcome.succeeded, 3);
        let failed: Vec<i64> = outcome.failed_orders().iter().map(|o| o.id).collect();
        assert_eq!(failed, vec![2, 4]);
        assert_eq!(processor.calls.load(Ordering::SeqCst), 5);
        assert_eq!(
            outcome.failures[0].to_string(),
            "order 2: Provider feed error: feed down for 2"
        );
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let processor = Arc::new(ScriptedProcessor::default());
        let pool = BoundedWorkerPool::new(3, Duration::from_secs(5));

        let outcome = pool.run(orders(1..=20), processor.clone()).await;

        assert!(outcome.is_clean());
        assert!(processor.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(processor.calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_only_the_slow_order() {
        let processor = Arc::new(ScriptedProcessor {
            hang: [3].into_iter().collect(),
            ..Default::default()
        });
        let pool = BoundedWorkerPool::new(2, Duration::from_secs(30));

        let outcome = pool.run(orders(1..=4), processor).await;

        assert_eq!(outcome.succeeded, 3);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(
            outcome.failures[0].error,
            ReconcilerError::Timeout {
                order_id: 3,
                timeout_secs: 30
            }
        );
    }

    #[tokio::test]
    async fn test_panic_is_recorded_as_failure() {
        let processor = Arc::new(ScriptedProcessor {
            panic_on: [1].into_iter().collect(),
            ..Default::default()
        });
        let pool = BoundedWorkerPool::new(2, Duration::from_secs(5));

        let outcome = pool.run(orders(1..=3), processor).await;

        assert_eq!(outcome.succeeded, 2);
        assert!(matches!(
            outcome.failures[0].error,
            ReconcilerError::WorkerPanicked(ref msg) if msg.contains("exploded")
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_is_clean() {
        let pool = BoundedWorkerPool::new(4, Duration::from_secs(5));
        let outcome = pool
            .run(Vec::new(), Arc::new(ScriptedProcessor::default()))
            .await;
        assert!(outcome.is_clean());
        assert_eq!(outcome.succeeded, 0);
    }

    /// Panics when dropped, i.e. outside the worker's unwind guard.
    struct PanicOnDrop;

    impl Drop for PanicOnDrop {
        fn drop(&mut self) {
            panic!("order state torn down mid-update");
        }
    }

    struct TeardownPanicProcessor;

    #[async_trait]
    impl OrderProcessor for TeardownPanicProcessor {
        async fn process(&self, order: &Order) -> ReconcilerResult<UpdateOutcome> {
            if order.id == 2 {
                let _guard = PanicOnDrop;
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(UpdateOutcome::Confirmed(order.status))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_worker_still_reports_its_order() {
        let pool = BoundedWorkerPool::new(2, Duration::from_secs(1));

        let outcome = pool.run(orders(1..=3), Arc::new(TeardownPanicProcessor)).await;

        assert_eq!(outcome.succeeded, 2);
        let failed: Vec<i64> = outcome.failed_orders().iter().map(|o| o.id).collect();
        assert_eq!(failed, vec![2]);
        assert!(matches!(
            outcome.failures[0].error,
            ReconcilerError::WorkerPanicked(ref msg) if msg.contains("aborted")
        ));
    }

    #[test]
    fn test_zero_concurrency_is_raised_to_one() {
        assert_eq!(BoundedWorkerPool::new(0, Duration::from_secs(1)).max_concurrency(), 1);
    }
}
