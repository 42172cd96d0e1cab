//! Error types for the reconciliation engine.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcilerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Provider feed error: {0}")]
    FeedError(String),
    #[error("Feed decode error: {0}")]
    DecodeError(String),
    #[error("Feed position {index} out of range for feed of length {len}")]
    FeedPositionOutOfRange { index: usize, len: usize },
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
    #[error("Order {order_id} timed out after {timeout_secs}s")]
    Timeout { order_id: i64, timeout_secs: u64 },
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("Notification error: {0}")]
    NotificationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl ReconcilerError {
    /// Whether a later attempt of the same cycle may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ConfigurationError(_))
    }
}

impl From<sqlx::Error> for ReconcilerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ReconcilerError::NotFound("row not found".to_string()),
            other => ReconcilerError::DatabaseError(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for ReconcilerError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        ReconcilerError::DatabaseError(format!("migration failed: {err}"))
    }
}

impl From<reqwest::Error> for ReconcilerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ReconcilerError::DecodeError(err.to_string())
        } else {
            ReconcilerError::FeedError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ReconcilerError {
    fn from(err: serde_json::Error) -> Self {
        ReconcilerError::DecodeError(format!("JSON deserialization error: {err}"))
    }
}

impl From<config::ConfigError> for ReconcilerError {
    fn from(err: config::ConfigError) -> Self {
        ReconcilerError::ConfigurationError(err.to_string())
    }
}

pub type ReconcilerResult<T> = Result<T, ReconcilerError>;
