//! # In-Memory Repository
//!
//! A [`Repository`] held entirely in process memory. It records every write and can be
//! told to fail specific operations, which makes it the backbone of the engine's tests
//! and of local dry runs without a database.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use super::repository::Repository;
use crate::error::{ReconcilerError, ReconcilerResult};
use crate::models::{Order, PeriodicTask, Provider};
use crate::state_machine::OrderStatus;

/// One recorded ledger upsert
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerWrite {
    pub job_name: String,
    pub interval_minutes: i32,
    pub failed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    orders: DashMap<i64, Order>,
    providers: DashMap<i64, Provider>,
    ledger: DashMap<String, PeriodicTask>,
    next_ledger_id: AtomicI64,
    fail_ledger: AtomicBool,
    fail_ongoing_fetch: AtomicBool,
    /// order id -> remaining status writes that should fail
    failing_status_writes: DashMap<i64, usize>,
    status_writes: Mutex<Vec<(i64, OrderStatus)>>,
    notification_writes: Mutex<Vec<i64>>,
    ledger_writes: Mutex<Vec<LedgerWrite>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_order(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn insert_provider(&self, provider: Provider) {
        self.providers.insert(provider.id, provider);
    }

    /// Seed the ledger, e.g. with a row that already has a `last_run_time`
    pub fn insert_periodic_task(&self, task: PeriodicTask) {
        self.next_ledger_id.fetch_max(task.id, Ordering::SeqCst);
        self.ledger.insert(task.job_name.clone(), task);
    }

    pub fn order(&self, order_id: i64) -> Option<Order> {
        self.orders.get(&order_id).map(|o| o.clone())
    }

    pub fn periodic_task(&self, name: &str) -> Option<PeriodicTask> {
        self.ledger.get(name).map(|t| t.clone())
    }

    /// Make every ledger read and write fail until reset
    pub fn set_ledger_failure(&self, fail: bool) {
        self.fail_ledger.store(fail, Ordering::SeqCst);
    }

    /// Make `get_ongoing_orders` fail until reset
    pub fn set_ongoing_fetch_failure(&self, fail: bool) {
        self.fail_ongoing_fetch.store(fail, Ordering::SeqCst);
    }

    /// Fail the next `times` status writes for `order_id`
    pub fn fail_status_writes(&self, order_id: i64, times: usize) {
        self.failing_status_writes.insert(order_id, times);
    }

    pub fn status_writes(&self) -> Vec<(i64, OrderStatus)> {
        self.status_writes.lock().clone()
    }

    pub fn notification_writes(&self) -> Vec<i64> {
        self.notification_writes.lock().clone()
    }

    pub fn ledger_writes(&self) -> Vec<LedgerWrite> {
        self.ledger_writes.lock().clone()
    }

    fn check_ledger(&self) -> ReconcilerResult<()> {
        if self.fail_ledger.load(Ordering::SeqCst) {
            return Err(ReconcilerError::DatabaseError(
                "ledger store unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn new_task(&self, name: &str, interval_minutes: i32) -> PeriodicTask {
        PeriodicTask {
            id: self.next_ledger_id.fetch_add(1, Ordering::SeqCst) + 1,
            job_name: name.to_string(),
            interval_in_minutes: interval_minutes,
            last_run_time: None,
            failed: false,
            error: None,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn ping(&self) -> bool {
        !self.fail_ledger.load(Ordering::SeqCst)
    }

    async fn get_or_create_periodic_task(
        &self,
        name: &str,
        interval_minutes: i32,
    ) -> ReconcilerResult<PeriodicTask> {
        self.check_ledger()?;
        let mut entry = self
            .ledger
            .entry(name.to_string())
            .or_insert_with(|| self.new_task(name, interval_minutes));
        entry.interval_in_minutes = interval_minutes;
        Ok(entry.clone())
    }

    async fn upsert_periodic_task(
        &self,
        name: &str,
        interval_minutes: i32,
        failed: bool,
        error: Option<&str>,
    ) -> ReconcilerResult<PeriodicTask> {
        self.check_ledger()?;
        self.ledger_writes.lock().push(LedgerWrite {
            job_name: name.to_string(),
            interval_minutes,
            failed,
            error: error.map(str::to_string),
        });

        let mut entry = self
            .ledger
            .entry(name.to_string())
            .or_insert_with(|| self.new_task(name, interval_minutes));
        entry.interval_in_minutes = interval_minutes;
        entry.last_run_time = Some(Utc::now());
        entry.failed = failed;
        entry.error = error.map(str::to_string);
        Ok(entry.clone())
    }

    async fn get_ongoing_orders(&self) -> ReconcilerResult<Vec<Order>> {
        if self.fail_ongoing_fetch.load(Ordering::SeqCst) {
            return Err(ReconcilerError::DatabaseError(
                "orders table unavailable".to_string(),
            ));
        }
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.status.is_ongoing())
            .map(|o| o.clone())
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn get_provider(&self, provider_id: i64) -> ReconcilerResult<Provider> {
        self.providers
            .get(&provider_id)
            .map(|p| p.clone())
            .ok_or_else(|| ReconcilerError::NotFound(format!("provider {provider_id}")))
    }

    async fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
    ) -> ReconcilerResult<Order> {
        if let Some(mut remaining) = self.failing_status_writes.get_mut(&order_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ReconcilerError::DatabaseError(format!(
                    "status write rejected for order {order_id}"
                )));
            }
        }

        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ReconcilerError::NotFound(format!("order {order_id}")))?;
        self.status_writes.lock().push((order_id, status));

        if order.status != status {
            let today = Utc::now().date_naive();
            match status {
                OrderStatus::PickedUp => order.picked_up_date = Some(today),
                OrderStatus::Delivered => order.delivery_date = Some(today),
                _ => {}
            }
            order.status = status;
        }
        Ok(order.clone())
    }

    async fn update_order_notification(&self, order_id: i64) -> ReconcilerResult<bool> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ReconcilerError::NotFound(format!("order {order_id}")))?;
        if order.notified_receiver {
            return Ok(false);
        }
        order.notified_receiver = true;
        self.notification_writes.lock().push(order_id);
        Ok(true)
    }
}
