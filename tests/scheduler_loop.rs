//! Scheduler behaviour across start-up states, driven on tokio's paused clock.

mod common;

use chrono::TimeDelta;
use std::sync::Arc;
use std::time::Duration;

use common::{HarnessBuilder, TokioClock, JOB_NAME};
use shipment_reconciler::models::PeriodicTask;
use shipment_reconciler::orchestration::{Clock, Scheduler};
use shipment_reconciler::state_machine::OrderStatus;

const INTERVAL: Duration = Duration::from_secs(60);

fn seeded_task(clock: &TokioClock, last_run_ago: TimeDelta) -> PeriodicTask {
    let now = clock.now();
    PeriodicTask {
        id: 1,
        job_name: JOB_NAME.to_string(),
        interval_in_minutes: 1,
        last_run_time: Some(now - last_run_ago),
        failed: false,
        error: None,
        created_at: now - TimeDelta::days(30),
    }
}

#[tokio::test(start_paused = true)]
async fn first_start_runs_immediately_then_every_interval() {
    let h = HarnessBuilder::default().build();
    h.order(1, OrderStatus::InProgress, &["2", "3", "3"]);
    let scheduler =
        Scheduler::new(h.cycle.clone(), INTERVAL).with_clock(Arc::new(TokioClock::new()));

    let driver = tokio::spawn(async move { scheduler.run().await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.repo.ledger_writes().len(), 1);
    assert_eq!(h.status_of(1), OrderStatus::Delivered);

    tokio::time::sleep(Duration::from_secs(129)).await;
    assert_eq!(h.repo.ledger_writes().len(), 3);

    driver.abort();
}

#[tokio::test(start_paused = true)]
async fn recent_run_waits_for_remaining_interval() {
    let h = HarnessBuilder::default().build();
    let clock = TokioClock::new();
    h.repo.insert_periodic_task(seeded_task(&clock, TimeDelta::seconds(30)));
    let scheduler = Scheduler::new(h.cycle.clone(), INTERVAL).with_clock(Arc::new(clock));

    let driver = tokio::spawn(async move { scheduler.run().await });

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(h.repo.ledger_writes().is_empty());

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(h.repo.ledger_writes().len(), 1);

    driver.abort();
}

#[tokio::test(start_paused = true)]
async fn long_downtime_catches_up_with_a_single_run() {
    let h = HarnessBuilder::default().build();
    let clock = TokioClock::new();
    h.repo.insert_periodic_task(seeded_task(&clock, TimeDelta::days(10)));
    let scheduler = Scheduler::new(h.cycle.clone(), INTERVAL).with_clock(Arc::new(clock));

    let driver = tokio::spawn(async move { scheduler.run().await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.repo.ledger_writes().len(), 1);

    tokio::time::sleep(Duration::from_secs(55)).await;
    assert_eq!(h.repo.ledger_writes().len(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.repo.ledger_writes().len(), 2);

    driver.abort();
}

#[tokio::test(start_paused = true)]
async fn ledger_stamped_ahead_of_host_clock_waits_one_interval() {
    let h = HarnessBuilder::default().build();
    let clock = TokioClock::new();
    h.repo.insert_periodic_task(seeded_task(&clock, TimeDelta::seconds(-300)));
    let scheduler = Scheduler::new(h.cycle.clone(), INTERVAL).with_clock(Arc::new(clock));

    let driver = tokio::spawn(async move { scheduler.run().await });

    tokio::time::sleep(Duration::from_secs(50)).await;
    assert!(h.repo.ledger_writes().is_empty());

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(h.repo.ledger_writes().len(), 1);

    driver.abort();
}

#[tokio::test]
async fn unreadable_ledger_stops_the_scheduler() {
    let h = HarnessBuilder::default().build();
    h.repo.set_ledger_failure(true);
    let scheduler = Scheduler::new(h.cycle.clone(), INTERVAL);

    let err = scheduler.run().await.unwrap_err();
    assert!(err.to_string().contains("ledger store unavailable"));
}
