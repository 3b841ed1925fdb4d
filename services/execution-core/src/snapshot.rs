//! Snapshot records for state restore
//!
//! A persisted order is replayed into a market after a restart. Records
//! are validated before rehydration: the quantity invariant must hold and
//! the participation rate must be in range, so a corrupt snapshot is
//! rejected rather than loaded.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use types::errors::{CoreError, OrderError};
use types::ids::{ClientOrderId, InstrumentId, OrderId};
use types::numeric::{ParticipationRate, Price, Quantity};
use types::order::{Order, OrderStatus, Side};

/// One persisted order, as written by the external persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub cl_order_id: ClientOrderId,
    pub symbol: InstrumentId,
    pub side: Side,
    pub original_qty: Quantity,
    pub remaining_qty: Quantity,
    pub completed_qty: Quantity,
    pub currency: String,
    pub price: Option<Price>,
    pub order_type: String,
    pub participation_rate: Decimal,
    pub submit_timestamp: i64, // Unix nanos
    pub start_timestamp: i64,  // Unix nanos
    pub status: OrderStatus,
    pub cancel_requested_at: Option<i64>,
    pub cum_notional: Decimal,
    pub avg_fill_price: Option<Price>,
}

impl OrderSnapshot {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            cl_order_id: order.cl_order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            original_qty: order.original_qty,
            remaining_qty: order.remaining_qty,
            completed_qty: order.completed_qty,
            currency: order.currency.clone(),
            price: order.price,
            order_type: order.order_type.clone(),
            participation_rate: order.participation_rate.as_decimal(),
            submit_timestamp: order.submit_timestamp,
            start_timestamp: order.start_timestamp,
            status: order.status,
            cancel_requested_at: order.cancel_requested_at,
            cum_notional: order.cum_notional,
            avg_fill_price: order.avg_fill_price,
        }
    }

    /// Validate and rehydrate into an order aggregate.
    pub fn into_order(self) -> Result<Order, CoreError> {
        let rate = ParticipationRate::try_new(self.participation_rate)?;

        if self.remaining_qty + self.completed_qty != self.original_qty {
            warn!(
                order_id = %self.order_id,
                remaining = self.remaining_qty.as_u64(),
                completed = self.completed_qty.as_u64(),
                original = self.original_qty.as_u64(),
                "Snapshot violates quantity invariant, rejected"
            );
            return Err(OrderError::InvalidQuantity(format!(
                "snapshot quantities do not reconcile for order {}",
                self.order_id
            ))
            .into());
        }

        Ok(Order {
            order_id: self.order_id,
            cl_order_id: self.cl_order_id,
            symbol: self.symbol,
            side: self.side,
            original_qty: self.original_qty,
            remaining_qty: self.remaining_qty,
            completed_qty: self.completed_qty,
            currency: self.currency,
            price: self.price,
            order_type: self.order_type,
            participation_rate: rate,
            submit_timestamp: self.submit_timestamp,
            start_timestamp: self.start_timestamp,
            status: self.status,
            cancel_requested_at: self.cancel_requested_at,
            cum_notional: self.cum_notional,
            avg_fill_price: self.avg_fill_price,
            last_updated: self.submit_timestamp,
            version: 0,
        })
    }
}
