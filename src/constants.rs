//! # System Constants
//!
//! Fixed operational boundaries of the reconciliation engine. Values that operators
//! may tune live in [`crate::config`]; everything here is part of the engine's contract.

use std::time::Duration;

/// Ledger key of the order-status reconciliation job
pub const ORDER_TASK_JOB_NAME: &str = "update_orders_status";

/// Maximum attempts per reconciliation cycle (first pass plus retries)
pub const ORDER_TASK_MAX_ATTEMPTS: u32 = 3;

/// Wall-clock budget for a single order update
pub const ORDER_UPDATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Separator used when joining accumulated order errors for the ledger
pub const LEDGER_ERROR_SEPARATOR: &str = ";";

/// Defaults applied when the environment does not override them
pub mod defaults {
    /// Reconciliation period in seconds (24h)
    pub const ORDER_UPDATE_PERIOD_SECONDS: u64 = 24 * 60 * 60;
    /// Concurrent order updates per attempt
    pub const PERIODIC_TASK_MAX_CONCURRENCY: usize = 10;
    pub const DB_ADDRESS: &str = "localhost";
    pub const DB_PORT: u16 = 5432;
    pub const DB_USER: &str = "user";
    pub const DB_PASSWORD: &str = "password";
    pub const DB_NAME: &str = "db";
    pub const DB_MAX_CONNECTIONS: u32 = 10;
    pub const ENVIRONMENT: &str = "development";
}
