//! # Order Model
//!
//! Shipment orders as consumed by the reconciliation engine. Orders are created and
//! read by the surrounding CRUD subsystem; this crate only advances their status and
//! the receiver-notification flag.
//!
//! Maps to the `orders` table; `status` is stored as text and parsed into
//! [`OrderStatus`] when rows are loaded.

use crate::error::ReconcilerError;
use crate::state_machine::OrderStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub provider_id: i64,
    pub status: OrderStatus,
    /// Flips false→true at most once per order
    pub notified_receiver: bool,
    pub picked_up_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
}

impl Order {
    pub fn new(id: i64, provider_id: i64, status: OrderStatus) -> Self {
        Self {
            id,
            provider_id,
            status,
            notified_receiver: false,
            picked_up_date: None,
            delivery_date: None,
        }
    }

    pub fn with_notified_receiver(mut self, notified: bool) -> Self {
        self.notified_receiver = notified;
        self
    }
}

/// Raw `orders` row before the status column is validated
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub provider_id: i64,
    pub status: String,
    pub notified_receiver: bool,
    pub picked_up_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
}

impl TryFrom<OrderRow> for Order {
    type Error = ReconcilerError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(ReconcilerError::UnknownStatus)?;
        Ok(Self {
            id: row.id,
            provider_id: row.provider_id,
            status,
            notified_receiver: row.notified_receiver,
            picked_up_date: row.picked_up_date,
            delivery_date: row.delivery_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> OrderRow {
        OrderRow {
            id: 42,
            provider_id: 7,
            status: status.to_string(),
            notified_receiver: true,
            picked_up_date: None,
            delivery_date: None,
        }
    }

    #[test]
    fn test_row_conversion_parses_status() {
        let order = Order::try_from(row("PICKED_UP")).unwrap();
        assert_eq!(order.id, 42);
        assert_eq!(order.provider_id, 7);
        assert_eq!(order.status, OrderStatus::PickedUp);
        assert!(order.notified_receiver);
    }

    #[test]
    fn test_row_conversion_rejects_unknown_status() {
        let err = Order::try_from(row("LOST")).unwrap_err();
        assert!(matches!(err, ReconcilerError::UnknownStatus(_)));
    }
}
