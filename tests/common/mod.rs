//! Shared fixtures for engine-level tests: a scripted provider feed, a counting
//! messenger and a builder that wires the real engine over an in-memory store.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shipment_reconciler::client::ProviderFeed;
use shipment_reconciler::database::InMemoryRepository;
use shipment_reconciler::error::{ReconcilerError, ReconcilerResult};
use shipment_reconciler::models::{FeedEntry, Order, Provider};
use shipment_reconciler::orchestration::{
    BoundedWorkerPool, Clock, Ledger, OrderUpdater, ReceiverMessenger, ReceiverNotifier,
    ReconciliationCycle,
};
use shipment_reconciler::state_machine::{AdvancePolicy, LatestEntryPolicy, OrderStatus};

pub const JOB_NAME: &str = "update_orders_status";

/// Wall clock that follows tokio's (pausable) time, starting at the real current time
#[derive(Debug, Clone)]
pub struct TokioClock {
    base: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            base: Utc::now(),
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + TimeDelta::from_std(self.start.elapsed()).unwrap_or(TimeDelta::zero())
    }
}

/// Per-provider feed script with failure injection, latency and call accounting
#[derive(Default)]
pub struct ScriptedFeed {
    feeds: DashMap<i64, Vec<FeedEntry>>,
    /// provider id -> remaining calls that fail
    failures: DashMap<i64, usize>,
    delays: DashMap<i64, Duration>,
    calls: Mutex<Vec<i64>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, provider_id: i64, codes: &[&str]) {
        self.feeds.insert(
            provider_id,
            codes.iter().map(|c| FeedEntry::with_status(*c)).collect(),
        );
    }

    pub fn fail_next(&self, provider_id: i64, times: usize) {
        self.failures.insert(provider_id, times);
    }

    pub fn delay(&self, provider_id: i64, delay: Duration) {
        self.delays.insert(provider_id, delay);
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().clone()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderFeed for ScriptedFeed {
    async fn fetch_statuses(&self, provider: &Provider) -> ReconcilerResult<Vec<FeedEntry>> {
        self.calls.lock().push(provider.id);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(&provider.id).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(mut left) = self.failures.get_mut(&provider.id) {
            if *left > 0 {
                *left -= 1;
                return Err(ReconcilerError::FeedError(format!(
                    "provider {} unavailable",
                    provider.id
                )));
            }
        }

        self.feeds
            .get(&provider.id)
            .map(|f| f.clone())
            .ok_or_else(|| ReconcilerError::FeedError(format!("no feed for provider {}", provider.id)))
    }
}

/// Counts dispatched pickup notices
#[derive(Default)]
pub struct CountingMessenger {
    sent: Mutex<Vec<i64>>,
}

impl CountingMessenger {
    pub fn sent(&self) -> Vec<i64> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl ReceiverMessenger for CountingMessenger {
    async fn send_pickup_notice(&self, order: &Order) -> ReconcilerResult<()> {
        self.sent.lock().push(order.id);
        Ok(())
    }
}

/// The real engine over an in-memory store
pub struct Harness {
    pub repo: Arc<InMemoryRepository>,
    pub feed: Arc<ScriptedFeed>,
    pub messenger: Arc<CountingMessenger>,
    pub cycle: ReconciliationCycle,
}

pub struct HarnessBuilder {
    max_concurrency: usize,
    timeout: Duration,
    policy: Arc<dyn AdvancePolicy>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            timeout: Duration::from_secs(30),
            policy: Arc::new(LatestEntryPolicy),
        }
    }
}

impl HarnessBuilder {
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(mut self, policy: Arc<dyn AdvancePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Harness {
        let repo = Arc::new(InMemoryRepository::new());
        let feed = Arc::new(ScriptedFeed::new());
        let messenger = Arc::new(CountingMessenger::default());

        let notifier = ReceiverNotifier::new(repo.clone(), messenger.clone());
        let updater = OrderUpdater::new(repo.clone(), feed.clone(), self.policy, notifier);
        let cycle = ReconciliationCycle::new(
            Ledger::new(repo.clone(), JOB_NAME, 1440),
            repo.clone(),
            BoundedWorkerPool::new(self.max_concurrency, self.timeout),
            Arc::new(updater),
        );

        Harness {
            repo,
            feed,
            messenger,
            cycle,
        }
    }
}

impl Harness {
    /// Seed one order with its own provider serving `codes`
    pub fn order(&self, id: i64, status: OrderStatus, codes: &[&str]) -> Order {
        let order = Order::new(id, id, status);
        self.repo
            .insert_provider(Provider::new(id, format!("provider-{id}"), format!("http://feed.test/{id}")));
        self.feed.serve(id, codes);
        self.repo.insert_order(order.clone());
        order
    }

    pub fn status_of(&self, id: i64) -> OrderStatus {
        self.repo
            .order(id)
            .map(|o| o.status)
            .expect("order seeded")
    }
}
