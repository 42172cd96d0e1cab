//! External service clients.

pub mod provider_feed;

pub use provider_feed::{HttpProviderFeed, ProviderFeed};
