//! # Cycle Scheduler
//!
//! Long-lived driver that fires a [`ReconciliationCycle`] every `interval`, anchored to the
//! ledger's `last_run_time` at start-up. The in-memory anchor lives in an explicit
//! [`ScheduleState`] that is advanced from the nominal due time, never from cycle
//! completion, so the cadence stays regular. Overdue wakeups collapse to a single
//! immediate run.
//!
//! Cycles are launched as detached tasks: a slow cycle never delays the next tick. The
//! returned [`CycleHandle`] lets tests await a launched cycle when they need to.

use chrono::{DateTime, TimeDelta, Utc};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::reconciliation_cycle::{CycleOutcome, ReconciliationCycle};
use crate::error::{ReconcilerError, ReconcilerResult};

/// Source of wall-clock time for scheduling decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One planned wakeup of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wakeup {
    /// Nominal time the cycle fires; `now` when the wakeup was already overdue
    pub due: DateTime<Utc>,
    /// Never negative
    pub sleep: Duration,
}

/// Scheduling anchor carried from one loop iteration to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleState {
    anchor: DateTime<Utc>,
    interval: Duration,
}

impl ScheduleState {
    pub fn new(anchor: DateTime<Utc>, interval: Duration) -> Self {
        Self { anchor, interval }
    }

    /// Anchor to a persisted run time, never later than `now`.
    ///
    /// The ledger is stamped by the database clock; a run time ahead of the host clock
    /// would otherwise stretch the first sleep past one interval.
    pub fn resume(last_run: DateTime<Utc>, now: DateTime<Utc>, interval: Duration) -> Self {
        Self::new(last_run.min(now), interval)
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_due(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.interval)
            .ok()
            .and_then(|delta| self.anchor.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Plan the next wakeup as seen from `now`.
    pub fn plan(&self, now: DateTime<Utc>) -> Wakeup {
        let due = self.next_due();
        if due <= now {
            return Wakeup {
                due: now,
                sleep: Duration::ZERO,
            };
        }
        Wakeup {
            due,
            sleep: (due - now).to_std().unwrap_or(Duration::ZERO),
        }
    }

    /// Move the anchor to the wakeup's nominal due time.
    pub fn advance(&mut self, wakeup: &Wakeup) {
        self.anchor = wakeup.due;
    }
}

/// A cycle running on its own task
#[derive(Debug)]
pub struct CycleHandle {
    inner: JoinHandle<CycleOutcome>,
}

impl CycleHandle {
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the cycle to complete.
    pub async fn join(self) -> ReconcilerResult<CycleOutcome> {
        self.inner
            .await
            .map_err(|e| ReconcilerError::WorkerPanicked(format!("reconciliation cycle task: {e}")))
    }

    /// Let the cycle run to completion unobserved.
    pub fn detach(self) {
        drop(self.inner);
    }
}

/// Shortest period the scheduler will run at
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct Scheduler {
    cycle: ReconciliationCycle,
    interval: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("cycle", &self.cycle)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// A zero interval is raised to [`MIN_INTERVAL`] so the loop always sleeps between ticks.
    pub fn new(cycle: ReconciliationCycle, interval: Duration) -> Self {
        Self {
            cycle,
            interval: interval.max(MIN_INTERVAL),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn one cycle without waiting for it.
    pub fn launch_cycle(&self) -> CycleHandle {
        let cycle = self.cycle.clone();
        CycleHandle {
            inner: tokio::spawn(async move { cycle.run().await }),
        }
    }

    /// Read the ledger and derive the initial anchor.
    ///
    /// A job that has never run gets a cycle immediately and is anchored at `now`. A ledger
    /// read failure is returned to the caller; the process cannot schedule without it.
    pub async fn bootstrap(&self) -> ReconcilerResult<(ScheduleState, Option<CycleHandle>)> {
        let task = self.cycle.ledger().load().await?;

        match task.last_run_time {
            Some(last_run) => {
                info!(
                    job_name = %task.job_name,
                    last_run_time = %last_run,
                    interval_secs = self.interval.as_secs(),
                    "Resuming schedule from ledger"
                );
                Ok((
                    ScheduleState::resume(last_run, self.clock.now(), self.interval),
                    None,
                ))
            }
            None => {
                info!(job_name = %task.job_name, "No previous run recorded, starting cycle now");
                let handle = self.launch_cycle();
                Ok((ScheduleState::new(self.clock.now(), self.interval), Some(handle)))
            }
        }
    }

    /// Sleep until the next due time, launch a cycle and advance the anchor.
    pub async fn tick(&self, state: &mut ScheduleState) -> CycleHandle {
        let wakeup = state.plan(self.clock.now());
        if wakeup.sleep.is_zero() {
            warn!(anchor = %state.anchor(), "Scheduled run is overdue, running now");
        } else {
            debug!(due = %wakeup.due, sleep_secs = wakeup.sleep.as_secs(), "Sleeping until next cycle");
            tokio::time::sleep(wakeup.sleep).await;
        }

        let handle = self.launch_cycle();
        state.advance(&wakeup);
        handle
    }

    /// Drive cycles forever. Returns only when the ledger cannot be read at start-up.
    pub async fn run(&self) -> ReconcilerResult<Infallible> {
        let (mut state, initial) = self.bootstrap().await?;
        if let Some(handle) = initial {
            handle.detach();
        }

        loop {
            self.tick(&mut state).await.detach();
        }
    }
}
