//! Error taxonomy for the execution core
//!
//! Three families, matching how callers must react:
//! - `OrderError` / `TickError`: typed rejections the caller can correct.
//! - Inconsistencies (overfill clamps, stale volume keys) are logged at the
//!   site and never surface as errors, so one bad order cannot abort a bin.
//! - `CoreError::System` wraps anything unexpected during bin processing.

use thiserror::Error;

/// Top-level error for all execution-core operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Tick error: {0}")]
    Tick(#[from] TickError),

    #[error("Numeric error: {0}")]
    Numeric(#[from] NumericError),

    #[error("Unknown instrument: {symbol}")]
    UnknownInstrument { symbol: String },

    #[error("System error: {message}")]
    System { message: String },
}

/// Order submission and cancellation rejections
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("Active order {existing} already working for {symbol}")]
    ActiveOrderExists { symbol: String, existing: String },

    #[error("Order not found: {order_id}")]
    NotFound { order_id: String },

    #[error("Cancellation already requested for order {order_id}")]
    CancelAlreadyRequested { order_id: String },

    #[error("Order already canceled: {order_id}")]
    AlreadyCanceled { order_id: String },

    #[error("Order {order_id} has no remaining quantity to cancel")]
    NothingToCancel { order_id: String },

    #[error("Fill of {requested} exceeds remaining {remaining} on order {order_id}")]
    FillExceedsRemaining {
        order_id: String,
        requested: u64,
        remaining: u64,
    },

    #[error("Fill applied to canceled order {order_id}")]
    FillAfterCancel { order_id: String },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
}

/// Malformed or out-of-order market data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickError {
    #[error("Unparseable tick price: {value}")]
    MalformedPrice { value: String },

    #[error("Unparseable tick volume: {value}")]
    MalformedVolume { value: String },

    #[error("Tick currency is empty")]
    EmptyCurrency,

    #[error("Stale tick: bin stop {received_stop} precedes last processed {last_stop}")]
    StaleBin { last_stop: i64, received_stop: i64 },
}

/// Numeric construction failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    #[error("Price must be positive, got {0}")]
    NonPositivePrice(String),

    #[error("Unparseable price: {0}")]
    UnparseablePrice(String),

    #[error("Participation rate must be in (0, 1], got {0}")]
    RateOutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_error_display() {
        let err = OrderError::ActiveOrderExists {
            symbol: "AAPL".to_string(),
            existing: "abc".to_string(),
        };
        assert!(err.to_string().contains("AAPL"));
    }

    #[test]
    fn test_core_error_from_order_error() {
        let order_err = OrderError::NotFound {
            order_id: "x".to_string(),
        };
        let core_err: CoreError = order_err.into();
        assert!(matches!(core_err, CoreError::Order(_)));
    }

    #[test]
    fn test_tick_error_display() {
        let err = TickError::StaleBin {
            last_stop: 200,
            received_stop: 100,
        };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("200"));
    }
}
