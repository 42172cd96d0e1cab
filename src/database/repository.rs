//! Persistence seam consumed by the reconciliation engine.

use async_trait::async_trait;

use crate::error::ReconcilerResult;
use crate::models::{Order, PeriodicTask, Provider};
use crate::state_machine::OrderStatus;

/// Storage operations the engine relies on.
///
/// Ledger writes are keyed by job name, so at most one row exists per job.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Whether the store answers at all
    async fn ping(&self) -> bool;

    /// Fetch the ledger row for `name`, creating it when missing.
    ///
    /// Re-asserts `interval_minutes` on an existing row and never touches
    /// `last_run_time`.
    async fn get_or_create_periodic_task(
        &self,
        name: &str,
        interval_minutes: i32,
    ) -> ReconcilerResult<PeriodicTask>;

    /// Record a completed cycle: stamps `last_run_time` with the current time.
    async fn upsert_periodic_task(
        &self,
        name: &str,
        interval_minutes: i32,
        failed: bool,
        error: Option<&str>,
    ) -> ReconcilerResult<PeriodicTask>;

    /// Orders whose status is in [`OrderStatus::ONGOING`]
    async fn get_ongoing_orders(&self) -> ReconcilerResult<Vec<Order>>;

    async fn get_provider(&self, provider_id: i64) -> ReconcilerResult<Provider>;

    /// Persist `status`; writing the current status again is a no-op.
    async fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
    ) -> ReconcilerResult<Order>;

    /// Set `notified_receiver` if it is still false.
    ///
    /// Returns `true` only for the call that flipped the flag.
    async fn update_order_notification(&self, order_id: i64) -> ReconcilerResult<bool>;
}
