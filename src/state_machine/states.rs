use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status lifecycle: `PENDING → IN_PROGRESS → PROVIDER_SEEN → PICKED_UP → DELIVERED`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created but not yet assigned to a provider feed
    Pending,
    /// Handed to the provider
    InProgress,
    /// Provider acknowledged the shipment
    ProviderSeen,
    /// Courier collected the parcel
    PickedUp,
    /// Terminal state
    Delivered,
}

impl OrderStatus {
    /// Statuses eligible for reconciliation
    pub const ONGOING: [OrderStatus; 3] = [Self::InProgress, Self::ProviderSeen, Self::PickedUp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::ProviderSeen => "PROVIDER_SEEN",
            Self::PickedUp => "PICKED_UP",
            Self::Delivered => "DELIVERED",
        }
    }

    /// Check if the order is picked up by reconciliation cycles
    pub fn is_ongoing(&self) -> bool {
        Self::ONGOING.contains(self)
    }

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Position of this status in a provider feed; 0 means not positionable.
    pub fn position_code(&self) -> usize {
        match self {
            Self::PickedUp => 1,
            Self::InProgress => 2,
            Self::Delivered => 3,
            Self::Pending | Self::ProviderSeen => 0,
        }
    }

    /// Inverse of [`OrderStatus::position_code`] for the textual codes a feed carries
    pub fn from_feed_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(Self::PickedUp),
            "2" => Some(Self::InProgress),
            "3" => Some(Self::Delivered),
            _ => None,
        }
    }

    /// Ongoing statuses as stored strings, for `= ANY($1)` queries
    pub fn ongoing_strs() -> Vec<String> {
        Self::ONGOING.iter().map(|s| s.as_str().to_string()).collect()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "PROVIDER_SEEN" => Ok(Self::ProviderSeen),
            "PICKED_UP" => Ok(Self::PickedUp),
            "DELIVERED" => Ok(Self::Delivered),
            _ => Err(format!("Invalid order status: {s}")),
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::ProviderSeen
    }
}
