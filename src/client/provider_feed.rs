//! # Provider Feed Client
//!
//! Fetches the ordered status list a shipping provider publishes for its shipments.
//! Each call is one HTTP GET against the provider's configured URL, expecting:
//!
//! ```json
//! { "message": "...", "data": [ { "status": "2", "fa_status": "...", "created_at": "..." } ] }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::{ReconcilerError, ReconcilerResult};
use crate::models::{FeedEntry, Provider, ProviderFeedResponse};

/// Source of provider status feeds
#[async_trait]
pub trait ProviderFeed: Send + Sync {
    async fn fetch_statuses(&self, provider: &Provider) -> ReconcilerResult<Vec<FeedEntry>>;
}

/// HTTP implementation sharing one connection pool across all workers
#[derive(Debug, Clone)]
pub struct HttpProviderFeed {
    client: Client,
}

impl HttpProviderFeed {
    /// Build a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> ReconcilerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ReconcilerError::ConfigurationError(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderFeed for HttpProviderFeed {
    async fn fetch_statuses(&self, provider: &Provider) -> ReconcilerResult<Vec<FeedEntry>> {
        debug!(provider_id = provider.id, url = %provider.url, "Fetching provider feed");

        let response = self.client.get(&provider.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReconcilerError::FeedError(format!(
                "provider {} returned HTTP {status}",
                provider.id
            )));
        }

        let body = response.bytes().await?;
        let feed: ProviderFeedResponse = serde_json::from_slice(&body)?;

        debug!(
            provider_id = provider.id,
            entries = feed.data.len(),
            message = %feed.message,
            "Provider feed decoded"
        );
        Ok(feed.data)
    }
}
