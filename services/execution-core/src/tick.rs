//! Inbound market-data ticks
//!
//! The feed adapter delivers one raw tick per instrument per bin. Fields
//! arrive as strings and are validated into typed values before any market
//! state is touched, so a malformed tick leaves the bin unapplied.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::TickError;
use types::numeric::Price;

/// A tick as delivered by the external feed adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTick {
    pub currency: String,
    /// Decimal string, e.g. "10.05"
    pub price: String,
    /// Integer string, e.g. "5000"
    pub volume: String,
}

impl RawTick {
    pub fn new(
        currency: impl Into<String>,
        price: impl Into<String>,
        volume: impl Into<String>,
    ) -> Self {
        Self {
            currency: currency.into(),
            price: price.into(),
            volume: volume.into(),
        }
    }

    /// Validate into a typed tick.
    pub fn parse(&self) -> Result<MarketTick, TickError> {
        if self.currency.is_empty() {
            return Err(TickError::EmptyCurrency);
        }

        let price_dec =
            Decimal::from_str(self.price.trim()).map_err(|_| TickError::MalformedPrice {
                value: self.price.clone(),
            })?;
        let price = Price::try_new(price_dec).map_err(|_| TickError::MalformedPrice {
            value: self.price.clone(),
        })?;

        let volume =
            u64::from_str(self.volume.trim()).map_err(|_| TickError::MalformedVolume {
                value: self.volume.clone(),
            })?;

        Ok(MarketTick {
            currency: self.currency.clone(),
            price,
            volume,
        })
    }
}

/// A validated tick: reference price and traded volume for one bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTick {
    pub currency: String,
    pub price: Price,
    pub volume: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_tick() {
        let tick = RawTick::new("USD", "10.05", "5000").parse().unwrap();
        assert_eq!(tick.currency, "USD");
        assert_eq!(tick.price, Price::from_str("10.05").unwrap());
        assert_eq!(tick.volume, 5000);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let tick = RawTick::new("USD", " 10.05 ", " 5000 ").parse().unwrap();
        assert_eq!(tick.volume, 5000);
    }

    #[test]
    fn test_malformed_price() {
        let result = RawTick::new("USD", "ten", "5000").parse();
        assert!(matches!(result, Err(TickError::MalformedPrice { .. })));

        let result = RawTick::new("USD", "-1.0", "5000").parse();
        assert!(matches!(result, Err(TickError::MalformedPrice { .. })));
    }

    #[test]
    fn test_malformed_volume() {
        let result = RawTick::new("USD", "10.0", "lots").parse();
        assert!(matches!(result, Err(TickError::MalformedVolume { .. })));

        // Negative volume is not an integer share count
        let result = RawTick::new("USD", "10.0", "-5").parse();
        assert!(matches!(result, Err(TickError::MalformedVolume { .. })));
    }

    #[test]
    fn test_empty_currency() {
        let result = RawTick::new("", "10.0", "100").parse();
        assert!(matches!(result, Err(TickError::EmptyCurrency)));
    }

    #[test]
    fn test_raw_tick_deserializes_from_feed_json() {
        let json = r#"{"currency":"USD","price":"10.05","volume":"5000"}"#;
        let raw: RawTick = serde_json::from_str(json).unwrap();
        assert!(raw.parse().is_ok());
    }
}
