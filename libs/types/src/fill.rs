//! Fill records
//!
//! One `Fill` is emitted for every execution the manager applies to an
//! order within a bin. Fills carry a per-instrument monotonic sequence so
//! downstream ledgers can order them deterministically.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{FillId, InstrumentId, OrderId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;

/// An applied execution against a working order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: FillId,
    /// Per-instrument monotonic sequence
    pub sequence: u64,
    pub order_id: OrderId,
    pub symbol: InstrumentId,
    /// Side of the filled order
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    pub currency: String,
    /// Scheduled execution time within the bin
    pub exec_time: i64, // Unix nanos
    /// Stop timestamp of the bin that settled this fill
    pub bin_stop: i64, // Unix nanos
}

impl Fill {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        order_id: OrderId,
        symbol: InstrumentId,
        side: Side,
        quantity: Quantity,
        price: Price,
        currency: impl Into<String>,
        exec_time: i64,
        bin_stop: i64,
    ) -> Self {
        Self {
            fill_id: FillId::new(),
            sequence,
            order_id,
            symbol,
            side,
            quantity,
            price,
            currency: currency.into(),
            exec_time,
            bin_stop,
        }
    }

    /// Fill value (price × quantity)
    pub fn notional(&self) -> Decimal {
        self.quantity.as_decimal() * self.price.as_decimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fill(sequence: u64, qty: u64, price: u64) -> Fill {
        Fill::new(
            sequence,
            OrderId::new(),
            InstrumentId::new("AAPL"),
            Side::BUY,
            Quantity::new(qty),
            Price::from_u64(price),
            "USD",
            1_708_123_440_000_000_000,
            1_708_123_500_000_000_000,
        )
    }

    #[test]
    fn test_fill_notional() {
        let fill = sample_fill(1, 400, 10);
        assert_eq!(fill.notional(), Decimal::from(4000));
    }

    #[test]
    fn test_fill_serialization() {
        let fill = sample_fill(7, 100, 25);
        let json = serde_json::to_string(&fill).unwrap();
        let deserialized: Fill = serde_json::from_str(&json).unwrap();
        assert_eq!(fill, deserialized);
    }
}
