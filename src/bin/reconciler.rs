//! Reconciler Binary
//!
//! Runs the order-status reconciliation scheduler against PostgreSQL until interrupted.

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use shipment_reconciler::client::HttpProviderFeed;
use shipment_reconciler::config::ReconcilerConfig;
use shipment_reconciler::constants::{ORDER_TASK_JOB_NAME, ORDER_UPDATE_TIMEOUT};
use shipment_reconciler::database::{DatabaseConnection, DatabaseMigrations, PgRepository, Repository};
use shipment_reconciler::logging;
use shipment_reconciler::orchestration::{
    BoundedWorkerPool, Ledger, LoggingMessenger, OrderUpdater, ReceiverNotifier,
    ReconciliationCycle, Scheduler,
};
use shipment_reconciler::state_machine::LatestEntryPolicy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_console_logging();

    let config = ReconcilerConfig::load().context("loading reconciler configuration")?;
    info!(
        environment = %config.environment,
        period_secs = config.order_update_period_seconds,
        max_concurrency = config.max_concurrency,
        "Starting order reconciler"
    );

    let connection = DatabaseConnection::connect(&config.database)
        .await
        .context("connecting to database")?;
    DatabaseMigrations::run_all(connection.pool())
        .await
        .context("running database migrations")?;

    let repository: Arc<dyn Repository> = Arc::new(PgRepository::new(connection.pool().clone()));
    if !repository.ping().await {
        anyhow::bail!("database did not answer after connecting");
    }

    let notifier = ReceiverNotifier::new(repository.clone(), Arc::new(LoggingMessenger));
    let updater = OrderUpdater::new(
        repository.clone(),
        Arc::new(HttpProviderFeed::new(ORDER_UPDATE_TIMEOUT)?),
        Arc::new(LatestEntryPolicy),
        notifier,
    );
    let cycle = ReconciliationCycle::new(
        Ledger::new(repository.clone(), ORDER_TASK_JOB_NAME, config.interval_minutes()),
        repository,
        BoundedWorkerPool::new(config.max_concurrency, ORDER_UPDATE_TIMEOUT),
        Arc::new(updater),
    );
    let scheduler = Scheduler::new(cycle, config.order_update_period());

    let exit_code = tokio::select! {
        result = scheduler.run() => match result {
            Ok(never) => match never {},
            Err(e) => {
                error!(error = %e, "Periodic task ledger unavailable, exiting");
                1
            }
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            0
        }
    };

    connection.close().await;
    info!("Order reconciler stopped");
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
