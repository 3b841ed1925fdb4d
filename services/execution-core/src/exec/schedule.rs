//! Scheduled intent records
//!
//! Recording an intent never mutates the order; all mutation happens in
//! `ExecutionManager::process_executions`.

use serde::{Deserialize, Serialize};
use types::ids::OrderId;
use types::numeric::Quantity;

/// Intent to fill `qty` shares of an order at `exec_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledExecution {
    pub order_id: OrderId,
    pub qty: Quantity,
    pub exec_time: i64, // Unix nanos
}

/// Intent to finalize a requested cancellation at `cancel_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledCancellation {
    pub order_id: OrderId,
    pub cancel_time: i64, // Unix nanos
}
