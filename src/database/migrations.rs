//! # Database Migrations
//!
//! Embedded `sqlx` migrations from the crate's `migrations/` directory. They create the
//! `providers`, `orders` and `periodic_tasks` tables plus a partial index covering the
//! ongoing order statuses the reconciliation cycle scans for.

use sqlx::PgPool;
use tracing::info;

use crate::error::ReconcilerResult;

pub struct DatabaseMigrations;

impl DatabaseMigrations {
    /// Apply all outstanding migrations
    pub async fn run_all(pool: &PgPool) -> ReconcilerResult<()> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }
}
