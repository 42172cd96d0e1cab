//! PostgreSQL-backed [`Repository`] using runtime-checked `sqlx` queries.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::repository::Repository;
use crate::error::{ReconcilerError, ReconcilerResult};
use crate::models::{Order, OrderRow, PeriodicTask, Provider};
use crate::state_machine::OrderStatus;

const PERIODIC_TASK_COLUMNS: &str =
    "id, job_name, interval_in_minutes, last_run_time, failed, error, created_at";
const ORDER_COLUMNS: &str =
    "id, provider_id, status, notified_receiver, picked_up_date, delivery_date";

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

// Manual Debug implementation because PgPool carries connection state
impl std::fmt::Debug for PgRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgRepository").finish_non_exhaustive()
    }
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn get_or_create_periodic_task(
        &self,
        name: &str,
        interval_minutes: i32,
    ) -> ReconcilerResult<PeriodicTask> {
        let sql = format!(
            r#"
            INSERT INTO periodic_tasks (job_name, interval_in_minutes)
            VALUES ($1, $2)
            ON CONFLICT (job_name)
            DO UPDATE SET interval_in_minutes = EXCLUDED.interval_in_minutes
            RETURNING {PERIODIC_TASK_COLUMNS}
            "#
        );
        let task = sqlx::query_as::<_, PeriodicTask>(&sql)
            .bind(name)
            .bind(interval_minutes)
            .fetch_one(&self.pool)
            .await?;

        Ok(task)
    }

    async fn upsert_periodic_task(
        &self,
        name: &str,
        interval_minutes: i32,
        failed: bool,
        error: Option<&str>,
    ) -> ReconcilerResult<PeriodicTask> {
        let sql = format!(
            r#"
            INSERT INTO periodic_tasks (job_name, interval_in_minutes, last_run_time, failed, error)
            VALUES ($1, $2, NOW(), $3, $4)
            ON CONFLICT (job_name)
            DO UPDATE SET
                interval_in_minutes = EXCLUDED.interval_in_minutes,
                last_run_time = EXCLUDED.last_run_time,
                failed = EXCLUDED.failed,
                error = EXCLUDED.error
            RETURNING {PERIODIC_TASK_COLUMNS}
            "#
        );
        let task = sqlx::query_as::<_, PeriodicTask>(&sql)
            .bind(name)
            .bind(interval_minutes)
            .bind(failed)
            .bind(error)
            .fetch_one(&self.pool)
            .await?;

        Ok(task)
    }

    async fn get_ongoing_orders(&self) -> ReconcilerResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ANY($1) ORDER BY id"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(OrderStatus::ongoing_strs())
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Loaded ongoing orders");
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn get_provider(&self, provider_id: i64) -> ReconcilerResult<Provider> {
        sqlx::query_as::<_, Provider>(
            "SELECT id, name, url, created_at, updated_at FROM providers WHERE id = $1",
        )
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ReconcilerError::NotFound(format!("provider {provider_id}")))
    }

    async fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
    ) -> ReconcilerResult<Order> {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        let current: Order = sqlx::query_as::<_, OrderRow>(&select)
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ReconcilerError::NotFound(format!("order {order_id}")))?
            .try_into()?;

        if current.status == status {
            tx.commit().await?;
            return Ok(current);
        }

        // Pickup and delivery dates are stamped on the transition into those statuses
        let update = format!(
            r#"
            UPDATE orders
            SET status = $2,
                picked_up_date = CASE WHEN $2 = 'PICKED_UP' THEN CURRENT_DATE ELSE picked_up_date END,
                delivery_date = CASE WHEN $2 = 'DELIVERED' THEN CURRENT_DATE ELSE delivery_date END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let updated: Order = sqlx::query_as::<_, OrderRow>(&update)
            .bind(order_id)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn update_order_notification(&self, order_id: i64) -> ReconcilerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET notified_receiver = true, updated_at = NOW()
            WHERE id = $1 AND notified_receiver = false
            "#,
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
