//! Offset selection for the transition table.

use super::states::OrderStatus;
use super::transitions::FeedOffset;
use crate::models::{FeedEntry, Order};

/// Decides whether an order should read past its own feed position.
///
/// The offset is derived from feed content, never from chance. Implementations can
/// encode a provider-specific notion of the shipment's authoritative entry.
pub trait AdvancePolicy: Send + Sync {
    fn offset(&self, order: &Order, feed: &[FeedEntry]) -> FeedOffset;
}

/// Treats the last feed entry as the provider's authoritative current status.
///
/// When that entry disagrees with the order's own position the order is one step
/// behind the provider and advances; otherwise it stays.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestEntryPolicy;

impl AdvancePolicy for LatestEntryPolicy {
    fn offset(&self, order: &Order, feed: &[FeedEntry]) -> FeedOffset {
        let latest = feed.last().and_then(|entry| OrderStatus::from_feed_code(&entry.status));
        match latest {
            Some(status) if status.position_code() != order.status.position_code() => {
                FeedOffset::Advance
            }
            _ => FeedOffset::Stay,
        }
    }
}

/// Always returns the same offset; useful when a provider feed is known to be one step ahead.
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetPolicy(pub FeedOffset);

impl AdvancePolicy for FixedOffsetPolicy {
    fn offset(&self, _order: &Order, _feed: &[FeedEntry]) -> FeedOffset {
        self.0
    }
}
