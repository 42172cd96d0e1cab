//! Table-driven status transitions over an ordered provider feed.
//!
//! The order's current status is turned into a feed position code `c`; together with
//! an offset `o` the next feed entry is read at index `c - 1 + o` and its status code
//! is mapped back into an [`OrderStatus`]. `c == 0` with `o == 0` leaves the order alone.

use super::states::OrderStatus;
use crate::error::{ReconcilerError, ReconcilerResult};
use crate::models::FeedEntry;

/// How far past the order's own feed position to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOffset {
    Stay,
    Advance,
}

impl FeedOffset {
    pub fn value(&self) -> usize {
        match self {
            Self::Stay => 0,
            Self::Advance => 1,
        }
    }
}

/// Result of running the transition table for one order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to compute; the order keeps its status
    Unchanged,
    /// Status read from the feed, possibly equal to the current one
    Candidate(OrderStatus),
}

/// Compute the candidate next status for `current` from `feed`.
pub fn next_status(
    current: OrderStatus,
    offset: FeedOffset,
    feed: &[FeedEntry],
) -> ReconcilerResult<Transition> {
    let code = current.position_code();
    if code == 0 && offset == FeedOffset::Stay {
        return Ok(Transition::Unchanged);
    }

    let index = code + offset.value() - 1;
    let entry = feed
        .get(index)
        .ok_or(ReconcilerError::FeedPositionOutOfRange {
            index,
            len: feed.len(),
        })?;

    OrderStatus::from_feed_code(&entry.status)
        .map(Transition::Candidate)
        .ok_or_else(|| {
            ReconcilerError::UnknownStatus(format!(
                "feed status code '{}' at position {index}",
                entry.status
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feed(codes: &[&str]) -> Vec<FeedEntry> {
        codes.iter().map(|c| FeedEntry::with_status(*c)).collect()
    }

    #[test]
    fn test_in_progress_stay_reads_next_entry() {
        let feed = feed(&["2", "3", "1"]);
        let transition = next_status(OrderStatus::InProgress, FeedOffset::Stay, &feed).unwrap();
        assert_eq!(transition, Transition::Candidate(OrderStatus::Delivered));
    }

    #[test]
    fn test_in_progress_advance_skips_one_entry() {
        let feed = feed(&["2", "3", "1"]);
        let transition =
            next_status(OrderStatus::InProgress, FeedOffset::Advance, &feed).unwrap();
        assert_eq!(transition, Transition::Candidate(OrderStatus::PickedUp));
    }

    #[test]
    fn test_unpositioned_status_with_stay_is_unchanged() {
        let transition = next_status(OrderStatus::ProviderSeen, FeedOffset::Stay, &[]).unwrap();
        assert_eq!(transition, Transition::Unchanged);
    }

    #[test]
    fn test_unpositioned_status_with_advance_reads_first_entry() {
        let feed = feed(&["1", "3"]);
        let transition =
            next_status(OrderStatus::ProviderSeen, FeedOffset::Advance, &feed).unwrap();
        assert_eq!(transition, Transition::Candidate(OrderStatus::PickedUp));
    }

    #[test]
    fn test_short_feed_is_out_of_range() {
        let feed = feed(&["2"]);
        let err = next_status(OrderStatus::Delivered, FeedOffset::Stay, &feed).unwrap_err();
        assert_eq!(
            err,
            ReconcilerError::FeedPositionOutOfRange { index: 2, len: 1 }
        );
    }

    #[test]
    fn test_unknown_feed_code_is_rejected() {
        let feed = feed(&["9"]);
        let err = next_status(OrderStatus::PickedUp, FeedOffset::Stay, &feed).unwrap_err();
        assert!(matches!(err, ReconcilerError::UnknownStatus(_)));
    }

    proptest! {
        #[test]
        fn prop_candidate_is_always_positionable(
            codes in proptest::collection::vec(prop_oneof![Just("1"), Just("2"), Just("3")], 0..6),
            advance in any::<bool>(),
            status_idx in 0usize..5,
        ) {
            let statuses = [
                OrderStatus::Pending,
                OrderStatus::InProgress,
                OrderStatus::ProviderSeen,
                OrderStatus::PickedUp,
                OrderStatus::Delivered,
            ];
            let offset = if advance { FeedOffset::Advance } else { FeedOffset::Stay };
            let feed = feed(&codes);
            match next_status(statuses[status_idx], offset, &feed) {
                Ok(Transition::Candidate(next)) => prop_assert!(next.position_code() > 0),
                Ok(Transition::Unchanged) => {
                    prop_assert_eq!(statuses[status_idx].position_code(), 0);
                    prop_assert_eq!(offset, FeedOffset::Stay);
                }
                Err(ReconcilerError::FeedPositionOutOfRange { index, len }) => {
                    prop_assert!(index >= len)
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
    }
}
