use serde::{Deserialize, Serialize};

/// One status descriptor from a provider feed.
///
/// The feed's list position carries meaning; see [`crate::state_machine::transitions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Feed status code (`"1"`, `"2"`, `"3"`)
    pub status: String,
    /// Human readable label
    #[serde(default)]
    pub fa_status: String,
    #[serde(default)]
    pub created_at: String,
}

impl FeedEntry {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            fa_status: String::new(),
            created_at: String::new(),
        }
    }
}

/// Body returned by a provider's status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFeedResponse {
    #[serde(default)]
    pub message: String,
    pub data: Vec<FeedEntry>,
}
