// Order status state machine: lifecycle states, feed position mapping and the
// transition table the order updater consumes.

pub mod policy;
pub mod states;
pub mod transitions;

pub use policy::{AdvancePolicy, FixedOffsetPolicy, LatestEntryPolicy};
pub use states::OrderStatus;
pub use transitions::{next_status, FeedOffset, Transition};
