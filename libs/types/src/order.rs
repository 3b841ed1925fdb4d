//! Participation order aggregate
//!
//! An order has immutable identity and mutable fill state. Quantities are
//! only mutated through `apply_fill`, and cancellation is two-phase:
//! `request_cancel` marks the order, the next bin's processing finalizes it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::OrderError;
use crate::ids::{ClientOrderId, InstrumentId, OrderId};
use crate::numeric::{ParticipationRate, Price, Quantity};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }

    /// Sign for exposure math: buys positive, sells negative.
    pub fn sign(&self) -> i64 {
        match self {
            Side::BUY => 1,
            Side::SELL => -1,
        }
    }
}

/// Lifecycle status of an order.
///
/// Fill progression runs NEW → PARTIALLY_FILLED → FILLED. The cancel path
/// (CANCEL_REQUESTED → CANCELED) can be entered from NEW or
/// PARTIALLY_FILLED, never reverses, and blocks all further fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    CancelRequested,
    Canceled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled)
    }

    /// String label for ledger records and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::CancelRequested => "CANCEL_REQUESTED",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

/// Execution status derived purely from quantities, independent of the
/// cancel path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    New,
    PartiallyFilled,
    Filled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::New => "NEW",
            ExecutionStatus::PartiallyFilled => "PARTIALLY_FILLED",
            ExecutionStatus::Filled => "FILLED",
        }
    }
}

/// A participation order and its fill state.
///
/// Exclusively owned by the `Market` that created it; downstream consumers
/// only ever see copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub cl_order_id: ClientOrderId,
    pub symbol: InstrumentId,
    pub side: Side,
    pub original_qty: Quantity,
    pub remaining_qty: Quantity,
    pub completed_qty: Quantity,
    pub currency: String,
    /// Optional limit price; absent means market/VWAP.
    pub price: Option<Price>,
    /// Free-form tag, e.g. "VWAP".
    pub order_type: String,
    pub participation_rate: ParticipationRate,
    pub submit_timestamp: i64, // Unix nanos
    /// Start of the earliest bin in which execution may begin.
    pub start_timestamp: i64, // Unix nanos
    pub status: OrderStatus,
    pub cancel_requested_at: Option<i64>,
    /// Cumulative fill notional (price × quantity), for average-price math.
    pub cum_notional: Decimal,
    pub avg_fill_price: Option<Price>,
    pub last_updated: i64, // Unix nanos
    pub version: u64,
}

impl Order {
    /// Create a new working order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: OrderId,
        cl_order_id: ClientOrderId,
        symbol: InstrumentId,
        side: Side,
        qty: Quantity,
        currency: impl Into<String>,
        price: Option<Price>,
        order_type: impl Into<String>,
        participation_rate: ParticipationRate,
        submit_timestamp: i64,
        start_timestamp: i64,
    ) -> Result<Self, OrderError> {
        if qty.is_zero() {
            return Err(OrderError::InvalidQuantity(
                "order quantity must be positive".to_string(),
            ));
        }

        Ok(Self {
            order_id,
            cl_order_id,
            symbol,
            side,
            original_qty: qty,
            remaining_qty: qty,
            completed_qty: Quantity::zero(),
            currency: currency.into(),
            price,
            order_type: order_type.into(),
            participation_rate,
            submit_timestamp,
            start_timestamp,
            status: OrderStatus::New,
            cancel_requested_at: None,
            cum_notional: Decimal::ZERO,
            avg_fill_price: None,
            last_updated: submit_timestamp,
            version: 0,
        })
    }

    pub fn remaining_qty(&self) -> Quantity {
        self.remaining_qty
    }

    pub fn completed_qty(&self) -> Quantity {
        self.completed_qty
    }

    pub fn original_qty(&self) -> Quantity {
        self.original_qty
    }

    /// Quantity still open, as reported to the ledger.
    pub fn leaves_qty(&self) -> Quantity {
        self.remaining_qty
    }

    /// Quantity filled so far, as reported to the ledger.
    pub fn cum_qty(&self) -> Quantity {
        self.completed_qty
    }

    /// Derive execution status from quantities alone.
    pub fn execution_status(&self) -> ExecutionStatus {
        if self.remaining_qty.is_zero() {
            ExecutionStatus::Filled
        } else if self.completed_qty.is_zero() {
            ExecutionStatus::New
        } else {
            ExecutionStatus::PartiallyFilled
        }
    }

    /// Eligible to participate: quantity open and not on the cancel path.
    pub fn is_active(&self) -> bool {
        !self.remaining_qty.is_zero()
            && matches!(self.status, OrderStatus::New | OrderStatus::PartiallyFilled)
    }

    /// Quantity invariant: remaining + completed = original
    pub fn check_invariant(&self) -> bool {
        self.remaining_qty + self.completed_qty == self.original_qty
    }

    /// Apply a fill, atomically decrementing remaining and incrementing
    /// completed quantity.
    ///
    /// Fails if the order is on the cancel path or the fill exceeds the
    /// remaining quantity; the caller decides whether that is a rejection
    /// or a clamp-and-log inconsistency.
    pub fn apply_fill(
        &mut self,
        qty: Quantity,
        price: Price,
        timestamp: i64,
    ) -> Result<(), OrderError> {
        if matches!(
            self.status,
            OrderStatus::CancelRequested | OrderStatus::Canceled
        ) {
            return Err(OrderError::FillAfterCancel {
                order_id: self.order_id.to_string(),
            });
        }
        if qty.is_zero() {
            return Err(OrderError::InvalidQuantity(
                "fill quantity must be positive".to_string(),
            ));
        }

        let remaining = self
            .remaining_qty
            .checked_sub(qty)
            .ok_or(OrderError::FillExceedsRemaining {
                order_id: self.order_id.to_string(),
                requested: qty.as_u64(),
                remaining: self.remaining_qty.as_u64(),
            })?;

        self.remaining_qty = remaining;
        self.completed_qty = self.completed_qty + qty;
        self.cum_notional += qty.as_decimal() * price.as_decimal();
        self.avg_fill_price = Price::try_new(
            self.cum_notional / self.completed_qty.as_decimal(),
        )
        .ok();

        self.status = if self.remaining_qty.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.last_updated = timestamp;
        self.version += 1;

        debug_assert!(self.check_invariant(), "invariant violated after fill");
        Ok(())
    }

    /// Mark the order for cancellation. Quantities are untouched; the order
    /// stops participating once the next bin's processing finalizes it.
    pub fn request_cancel(&mut self, timestamp: i64) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Canceled => Err(OrderError::AlreadyCanceled {
                order_id: self.order_id.to_string(),
            }),
            OrderStatus::CancelRequested => Err(OrderError::CancelAlreadyRequested {
                order_id: self.order_id.to_string(),
            }),
            OrderStatus::Filled => Err(OrderError::NothingToCancel {
                order_id: self.order_id.to_string(),
            }),
            OrderStatus::New | OrderStatus::PartiallyFilled => {
                self.status = OrderStatus::CancelRequested;
                self.cancel_requested_at = Some(timestamp);
                self.last_updated = timestamp;
                self.version += 1;
                Ok(())
            }
        }
    }

    /// Finalize a previously requested cancellation. The remaining quantity
    /// is frozen; no further fills can ever apply.
    pub fn finalize_cancel(&mut self, timestamp: i64) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::CancelRequested => {
                self.status = OrderStatus::Canceled;
                self.last_updated = timestamp;
                self.version += 1;
                Ok(())
            }
            OrderStatus::Canceled => Err(OrderError::AlreadyCanceled {
                order_id: self.order_id.to_string(),
            }),
            _ => Err(OrderError::NotFound {
                order_id: self.order_id.to_string(),
            }),
        }
    }
}
