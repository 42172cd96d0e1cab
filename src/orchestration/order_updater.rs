//! # Order Updater
//!
//! Per-order worker. One invocation resolves the order's provider, fetches the provider
//! feed once, runs the status transition table and applies at most one notification
//! and one status write, strictly in that order.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::notifier::ReceiverNotifier;
use crate::client::ProviderFeed;
use crate::database::Repository;
use crate::error::ReconcilerResult;
use crate::models::Order;
use crate::state_machine::{next_status, AdvancePolicy, OrderStatus, Transition};

/// What a successful update did to the order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No candidate status could be derived; nothing was written
    Unchanged,
    /// Feed confirmed the current status
    Confirmed(OrderStatus),
    Advanced { from: OrderStatus, to: OrderStatus },
}

/// Unit of work run by the bounded worker pool
#[async_trait]
pub trait OrderProcessor: Send + Sync {
    async fn process(&self, order: &Order) -> ReconcilerResult<UpdateOutcome>;
}

#[derive(Clone)]
pub struct OrderUpdater {
    repository: Arc<dyn Repository>,
    feed: Arc<dyn ProviderFeed>,
    policy: Arc<dyn AdvancePolicy>,
    notifier: ReceiverNotifier,
}

impl std::fmt::Debug for OrderUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderUpdater")
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

impl OrderUpdater {
    pub fn new(
        repository: Arc<dyn Repository>,
        feed: Arc<dyn ProviderFeed>,
        policy: Arc<dyn AdvancePolicy>,
        notifier: ReceiverNotifier,
    ) -> Self {
        Self {
            repository,
            feed,
            policy,
            notifier,
        }
    }
}

#[async_trait]
impl OrderProcessor for OrderUpdater {
    async fn process(&self, order: &Order) -> ReconcilerResult<UpdateOutcome> {
        if order.status.is_terminal() {
            return Ok(UpdateOutcome::Unchanged);
        }

        let provider = self.repository.get_provider(order.provider_id).await?;
        let feed = self.feed.fetch_statuses(&provider).await?;

        let offset = self.policy.offset(order, &feed);
        let next = match next_status(order.status, offset, &feed)? {
            Transition::Unchanged => {
                debug!(order_id = order.id, status = %order.status, "No feed position for order");
                return Ok(UpdateOutcome::Unchanged);
            }
            Transition::Candidate(next) => next,
        };

        if next != order.status && next == OrderStatus::PickedUp {
            self.notifier.notify_receiver(order).await?;
        }

        self.repository.update_order_status(order.id, next).await?;

        debug!(
            order_id = order.id,
            from = %order.status,
            to = %next,
            offset = offset.value(),
            "Order status reconciled"
        );

        if next == order.status {
            Ok(UpdateOutcome::Confirmed(next))
        } else {
            Ok(UpdateOutcome::Advanced {
                from: order.status,
                to: next,
            })
        }
    }
}
