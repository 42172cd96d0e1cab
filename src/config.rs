//! # Reconciler Configuration
//!
//! Environment-driven configuration loaded through the `config` crate. Variable names
//! match the deployment environment of the surrounding logistics application
//! (`ORDER_UPDATE_PERIOD`, `PERIODIC_TASK_MAX_CONCURRENCY`, `DB_*`).
//!
//! ```rust,no_run
//! use shipment_reconciler::config::ReconcilerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReconcilerConfig::load()?;
//! println!("reconciling every {:?}", config.order_update_period());
//! # Ok(())
//! # }
//! ```

use crate::constants::defaults;
use crate::error::{ReconcilerError, ReconcilerResult};
use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Flat view of the environment, one field per variable.
#[derive(Debug, Deserialize)]
struct EnvSettings {
    order_update_period: u64,
    periodic_task_max_concurrency: usize,
    #[serde(default)]
    database_url: Option<String>,
    db_address: String,
    db_port: u16,
    db_user: String,
    db_password: String,
    db_name: String,
    db_max_connections: u32,
    #[serde(default)]
    reconciler_env: Option<String>,
    #[serde(default)]
    app_env: Option<String>,
}

/// Database connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual parts
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Connection URL for sqlx
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: defaults::DB_ADDRESS.to_string(),
            port: defaults::DB_PORT,
            username: defaults::DB_USER.to_string(),
            password: defaults::DB_PASSWORD.to_string(),
            database: defaults::DB_NAME.to_string(),
            max_connections: defaults::DB_MAX_CONNECTIONS,
        }
    }
}

/// Root configuration of the reconciliation engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcilerConfig {
    /// Deployment environment name (development/test/production)
    pub environment: String,
    /// Seconds between reconciliation cycles
    pub order_update_period_seconds: u64,
    /// Maximum concurrent order updates per attempt
    pub max_concurrency: usize,
    pub database: DatabaseConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            environment: defaults::ENVIRONMENT.to_string(),
            order_update_period_seconds: defaults::ORDER_UPDATE_PERIOD_SECONDS,
            max_concurrency: defaults::PERIODIC_TASK_MAX_CONCURRENCY,
            database: DatabaseConfig::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from the process environment
    pub fn load() -> ReconcilerResult<Self> {
        Self::build(Environment::default().try_parsing(true))
    }

    /// Load configuration from an explicit variable map instead of the process environment
    pub fn from_source(vars: config::Map<String, String>) -> ReconcilerResult<Self> {
        Self::build(Environment::default().try_parsing(true).source(Some(vars)))
    }

    fn build(environment: Environment) -> ReconcilerResult<Self> {
        let settings: EnvSettings = Config::builder()
            .set_default(
                "order_update_period",
                defaults::ORDER_UPDATE_PERIOD_SECONDS as i64,
            )?
            .set_default(
                "periodic_task_max_concurrency",
                defaults::PERIODIC_TASK_MAX_CONCURRENCY as i64,
            )?
            .set_default("db_address", defaults::DB_ADDRESS)?
            .set_default("db_port", defaults::DB_PORT as i64)?
            .set_default("db_user", defaults::DB_USER)?
            .set_default("db_password", defaults::DB_PASSWORD)?
            .set_default("db_name", defaults::DB_NAME)?
            .set_default("db_max_connections", defaults::DB_MAX_CONNECTIONS as i64)?
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        let environment = settings
            .reconciler_env
            .or(settings.app_env)
            .unwrap_or_else(|| defaults::ENVIRONMENT.to_string());

        let config = Self {
            environment,
            order_update_period_seconds: settings.order_update_period,
            max_concurrency: settings.periodic_task_max_concurrency,
            database: DatabaseConfig {
                url: settings.database_url.filter(|url| !url.is_empty()),
                host: settings.db_address,
                port: settings.db_port,
                username: settings.db_user,
                password: settings.db_password,
                database: settings.db_name,
                max_connections: settings.db_max_connections,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> ReconcilerResult<()> {
        if self.order_update_period_seconds == 0 {
            return Err(ReconcilerError::ConfigurationError(
                "ORDER_UPDATE_PERIOD must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ReconcilerError::ConfigurationError(
                "PERIODIC_TASK_MAX_CONCURRENCY must be greater than zero".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ReconcilerError::ConfigurationError(
                "DB_MAX_CONNECTIONS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn order_update_period(&self) -> Duration {
        Duration::from_secs(self.order_update_period_seconds)
    }

    /// Period as whole minutes, the unit the ledger stores
    pub fn interval_minutes(&self) -> i32 {
        i32::try_from(self.order_update_period_seconds / 60).unwrap_or(i32::MAX)
    }
}
