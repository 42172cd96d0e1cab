//! # Reconciliation Engine
//!
//! The runtime half of the crate: everything between a clock tick and a persisted order
//! status.
//!
//! ## Core Components
//!
//! - **Scheduler**: fires a cycle every interval, anchored to the ledger at start-up
//! - **ReconciliationCycle**: one pass over the ongoing orders with narrowing retries
//! - **BoundedWorkerPool**: concurrency-capped, timeout-guarded fan-out of order updates
//! - **OrderUpdater**: feed lookup, transition and persistence for a single order
//! - **ReceiverNotifier**: at-most-once pickup notification
//! - **Ledger**: the job's `periodic_tasks` row
//!
//! Control flows strictly downward: `Scheduler -> ReconciliationCycle -> BoundedWorkerPool
//! -> OrderUpdater -> {ProviderFeed, Repository, ReceiverNotifier}`.

pub mod ledger;
pub mod notifier;
pub mod order_updater;
pub mod reconciliation_cycle;
pub mod scheduler;
pub mod worker_pool;

pub use ledger::Ledger;
pub use notifier::{LoggingMessenger, NotificationOutcome, ReceiverMessenger, ReceiverNotifier};
pub use order_updater::{OrderProcessor, OrderUpdater, UpdateOutcome};
pub use reconciliation_cycle::{CycleOutcome, ReconciliationCycle};
pub use scheduler::{Clock, CycleHandle, ScheduleState, Scheduler, SystemClock, Wakeup};
pub use worker_pool::{BatchOutcome, BoundedWorkerPool, OrderFailure};
