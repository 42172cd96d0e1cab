pub mod order;
pub mod periodic_task;
pub mod provider;
pub mod provider_feed;

// Re-export models for easy access
pub use order::{Order, OrderRow};
pub use periodic_task::PeriodicTask;
pub use provider::Provider;
pub use provider_feed::{FeedEntry, ProviderFeedResponse};
