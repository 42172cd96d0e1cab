#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Shipment Reconciler
//!
//! Background order-status reconciliation engine for a shipment platform.
//!
//! ## Overview
//!
//! A long-lived process periodically walks every in-flight order, asks the order's
//! provider for its status feed, and advances the order through its lifecycle
//! (`IN_PROGRESS -> PROVIDER_SEEN -> PICKED_UP -> DELIVERED`). Run bookkeeping is kept in
//! a durable ledger so the schedule survives restarts.
//!
//! ## Key Features
//!
//! - **Self-correcting schedule**: fixed cadence anchored to the last persisted run;
//!   overdue wakeups collapse into one immediate run
//! - **Bounded fan-out**: at most `PERIODIC_TASK_MAX_CONCURRENCY` order updates in flight,
//!   each under its own 30s deadline
//! - **Narrowing retries**: up to three attempts per cycle, each over only the orders
//!   that failed the previous one
//! - **At-most-once notification**: receivers are told about a pickup once, guarded by a
//!   conditional database write
//!
//! ## Module Organization
//!
//! - [`orchestration`] - scheduler, cycle, worker pool, order updater, notifier
//! - [`state_machine`] - order statuses, feed position mapping and transition table
//! - [`database`] - repository trait, PostgreSQL and in-memory stores, migrations
//! - [`client`] - provider status feed client
//! - [`models`] - orders, providers, ledger rows, feed payloads
//! - [`config`] - environment-driven configuration
//! - [`error`] - structured error handling
//! - [`logging`] / [`metrics`] - tracing set-up and OpenTelemetry instruments
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shipment_reconciler::client::HttpProviderFeed;
//! use shipment_reconciler::constants::{ORDER_TASK_JOB_NAME, ORDER_UPDATE_TIMEOUT};
//! use shipment_reconciler::database::InMemoryRepository;
//! use shipment_reconciler::orchestration::{
//!     BoundedWorkerPool, Ledger, LoggingMessenger, OrderUpdater, ReceiverNotifier,
//!     ReconciliationCycle,
//! };
//! use shipment_reconciler::state_machine::LatestEntryPolicy;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = Arc::new(InMemoryRepository::new());
//! let notifier = ReceiverNotifier::new(repo.clone(), Arc::new(LoggingMessenger));
//! let updater = OrderUpdater::new(
//!     repo.clone(),
//!     Arc::new(HttpProviderFeed::new(ORDER_UPDATE_TIMEOUT)?),
//!     Arc::new(LatestEntryPolicy),
//!     notifier,
//! );
//! let cycle = ReconciliationCycle::new(
//!     Ledger::new(repo.clone(), ORDER_TASK_JOB_NAME, 1440),
//!     repo,
//!     BoundedWorkerPool::new(10, ORDER_UPDATE_TIMEOUT),
//!     Arc::new(updater),
//! );
//!
//! let outcome = cycle.run().await;
//! println!("cycle {} failed: {}", outcome.cycle_id, outcome.failed());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and engine integration tests (in-memory store)
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod orchestration;
pub mod state_machine;

pub use config::{DatabaseConfig, ReconcilerConfig};
pub use error::{ReconcilerError, ReconcilerResult};
pub use models::{FeedEntry, Order, PeriodicTask, Provider};
pub use orchestration::{CycleOutcome, ReconciliationCycle, Scheduler};
pub use state_machine::OrderStatus;
