//! Order ledger boundary
//!
//! The core does not own the order ledger; it pushes a denormalized record
//! for every successful non-restore submission through the `OrderSink`
//! interface supplied at construction. The ledger's copy is for reporting
//! only and never mutates the authoritative order.

use std::sync::Mutex;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{ClientOrderId, InstrumentId, OrderId};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// Denormalized new-order record pushed to the external ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderRecord {
    pub order_id: OrderId,
    pub cl_order_id: ClientOrderId,
    pub symbol: InstrumentId,
    pub side: Side,
    pub original_qty: Quantity,
    pub remaining_qty: Quantity,
    pub completed_qty: Quantity,
    pub currency: String,
    pub price: Option<Price>,
    pub leaves_qty: Quantity,
    pub cum_qty: Quantity,
    pub status: String,
    pub order_type: String,
    pub participation_rate: Decimal,
    pub submit_timestamp: i64, // Unix nanos
    pub start_timestamp: i64,  // Unix nanos
}

impl NewOrderRecord {
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
            leaves_qty: order.leaves_qty(),
            cum_qty: order.cum_qty(),
            status: order.status.as_str().to_string(),
            order_type: order.order_type.clone(),
            participation_rate: order.participation_rate.as_decimal(),
            submit_timestamp: order.submit_timestamp,
            start_timestamp: order.start_timestamp,
        }
    }
}

/// External order-ledger sink, consumed (not owned) by the core.
pub trait OrderSink: Send + Sync {
    fn on_new_order(&self, record: NewOrderRecord);
}

/// Sink that drops every record; for markets without a ledger attached.
#[derive(Debug, Default)]
pub struct NullOrderSink;

impl OrderSink for NullOrderSink {
    fn on_new_order(&self, _record: NewOrderRecord) {}
}

/// In-memory sink retaining every record, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryOrderSink {
    records: Mutex<Vec<NewOrderRecord>>,
}

impl MemoryOrderSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out all records received so far.
    pub fn records(&self) -> Vec<NewOrderRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OrderSink for MemoryOrderSink {
    fn on_new_order(&self, record: NewOrderRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}
