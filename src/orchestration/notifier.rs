//! # Receiver Notification
//!
//! Guarded side effect fired when an order first reaches `PICKED_UP`. The persisted
//! `notified_receiver` flag is flipped with a conditional write, and the message is
//! dispatched only by the call that flipped it, so a receiver hears about a pickup at
//! most once per order even across retries.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::database::Repository;
use crate::error::{ReconcilerError, ReconcilerResult};
use crate::metrics;
use crate::models::Order;

/// Delivery channel for receiver messages (SMS, push, email...)
#[async_trait]
pub trait ReceiverMessenger: Send + Sync {
    async fn send_pickup_notice(&self, order: &Order) -> ReconcilerResult<()>;
}

/// Messenger that only writes a log line
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMessenger;

#[async_trait]
impl ReceiverMessenger for LoggingMessenger {
    async fn send_pickup_notice(&self, order: &Order) -> ReconcilerResult<()> {
        info!(order_id = order.id, "Receiver notified of pickup");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    AlreadyNotified,
}

#[derive(Clone)]
pub struct ReceiverNotifier {
    repository: Arc<dyn Repository>,
    messenger: Arc<dyn ReceiverMessenger>,
}

impl std::fmt::Debug for ReceiverNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverNotifier").finish_non_exhaustive()
    }
}

impl ReceiverNotifier {
    pub fn new(repository: Arc<dyn Repository>, messenger: Arc<dyn ReceiverMessenger>) -> Self {
        Self {
            repository,
            messenger,
        }
    }

    /// Notify the receiver of `order` unless that already happened.
    ///
    /// Fails only when the flag cannot be persisted. A dispatch error after the flag
    /// is set is logged and swallowed.
    pub async fn notify_receiver(&self, order: &Order) -> ReconcilerResult<NotificationOutcome> {
        if order.notified_receiver {
            debug!(order_id = order.id, "Receiver already notified");
            return Ok(NotificationOutcome::AlreadyNotified);
        }

        let flipped = self
            .repository
            .update_order_notification(order.id)
            .await
            .map_err(|e| {
                ReconcilerError::NotificationError(format!(
                    "failed to mark order {} as notified: {e}",
                    order.id
                ))
            })?;
        if !flipped {
            debug!(order_id = order.id, "Notification flag already set by an earlier attempt");
            return Ok(NotificationOutcome::AlreadyNotified);
        }

        if let Err(e) = self.messenger.send_pickup_notice(order).await {
            warn!(order_id = order.id, error = %e, "Receiver message dispatch failed");
        }
        metrics::notifications_total().add(1, &[]);
        Ok(NotificationOutcome::Sent)
    }
}
