//! # Structured Logging
//!
//! Environment-aware console logging for the reconciler process. Logs go to stdout,
//! the level follows the deployment environment unless `RUST_LOG` overrides it.
//! Production writes one JSON object per line; `RECONCILER_LOG_FORMAT` (`json` or
//! `text`) overrides the choice.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Line format of console output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Initialize console logging once per process
pub fn init_console_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let format = log_format(
            &environment,
            std::env::var("RECONCILER_LOG_FORMAT").ok().as_deref(),
        );
        let use_ansi = format == LogFormat::Text && IsTerminal::is_terminal(&std::io::stdout());

        let (json_layer, text_layer) = match format {
            LogFormat::Json => (
                Some(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_current_span(true),
                ),
                None,
            ),
            LogFormat::Text => (
                None,
                Some(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(use_ansi),
                ),
            ),
        };

        if tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(text_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                format = ?format,
                ansi_colors = use_ansi,
                "Console logging initialized"
            );
        }
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("RECONCILER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Pick the line format: an explicit override wins, otherwise JSON in production
fn log_format(environment: &str, requested: Option<&str>) -> LogFormat {
    match requested.map(str::to_ascii_lowercase).as_deref() {
        Some("json") => LogFormat::Json,
        Some("text") => LogFormat::Text,
        _ if environment == "production" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

/// Log the outcome of one reconciliation cycle
pub fn log_cycle_outcome(
    cycle_id: &str,
    job_name: &str,
    attempts: u32,
    failed: bool,
    error_count: usize,
    duration_ms: u64,
) {
    if failed {
        tracing::warn!(
            cycle_id = %cycle_id,
            job_name = %job_name,
            attempts = attempts,
            failed = failed,
            error_count = error_count,
            duration_ms = duration_ms,
            "Reconciliation cycle finished with unrecovered failures"
        );
    } else {
        tracing::info!(
            cycle_id = %cycle_id,
            job_name = %job_name,
            attempts = attempts,
            failed = failed,
            error_count = error_count,
            duration_ms = duration_ms,
            "Reconciliation cycle finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_log_format_selection() {
        assert_eq!(log_format("production", None), LogFormat::Json);
        assert_eq!(log_format("development", None), LogFormat::Text);
        assert_eq!(log_format("development", Some("JSON")), LogFormat::Json);
        assert_eq!(log_format("production", Some("text")), LogFormat::Text);
        assert_eq!(log_format("production", Some("yaml")), LogFormat::Json);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_console_logging();
        init_console_logging();
    }
}
