//! Numeric types for prices, share quantities, and participation rates
//!
//! Prices and rates use `rust_decimal` for deterministic arithmetic (no
//! floating-point errors). Quantities are integer share counts; all
//! participation math floors toward zero so fill quantities never exceed
//! what the observed volume supports.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::NumericError;

/// A strictly positive price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rejecting zero and negative values.
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        if value <= Decimal::ZERO {
            return Err(NumericError::NonPositivePrice(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Create a price from a whole number.
    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Parse a price from a decimal string.
    pub fn from_str(s: &str) -> Result<Self, NumericError> {
        let value = Decimal::from_str(s)
            .map_err(|_| NumericError::UnparseablePrice(s.to_string()))?;
        Self::try_new(value)
    }

    /// Get the inner decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An integer share quantity.
///
/// Quantities never go negative; subtraction is checked at the call site.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    pub fn new(shares: u64) -> Self {
        Self(shares)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Decimal view for notional math (quantity × price).
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Checked subtraction; None if `other` exceeds self.
    pub fn checked_sub(&self, other: Quantity) -> Option<Quantity> {
        self.0.checked_sub(other.0).map(Quantity)
    }

    /// The smaller of two quantities.
    pub fn min(self, other: Quantity) -> Quantity {
        Quantity(self.0.min(other.0))
    }
}

impl std::ops::Add for Quantity {
    type Output = Quantity;

    fn add(self, other: Quantity) -> Quantity {
        Quantity(self.0 + other.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fraction of a bin's traded volume an order may absorb, in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipationRate(Decimal);

impl ParticipationRate {
    /// Create a rate, rejecting values outside (0, 1].
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        if value <= Decimal::ZERO || value > Decimal::ONE {
            return Err(NumericError::RateOutOfRange(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Parse a rate from a decimal string.
    pub fn from_str(s: &str) -> Result<Self, NumericError> {
        let value = Decimal::from_str(s)
            .map_err(|_| NumericError::RateOutOfRange(s.to_string()))?;
        Self::try_new(value)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Shares this rate yields against a bin's traded volume.
    ///
    /// Floors toward zero: the result never exceeds `volume` because the
    /// rate is capped at 1.
    pub fn of_volume(&self, volume: u64) -> Quantity {
        let shares = (Decimal::from(volume) * self.0).floor();
        Quantity::new(shares.to_u64().unwrap_or(0))
    }
}

impl fmt::Display for ParticipationRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_price_rejects_non_positive() {
        assert!(Price::try_new(Decimal::ZERO).is_err());
        assert!(Price::try_new(Decimal::from(-5)).is_err());
        assert!(Price::try_new(Decimal::from(10)).is_ok());
    }

    #[test]
    fn test_price_from_str() {
        let price = Price::from_str("10.05").unwrap();
        assert_eq!(price.as_decimal(), Decimal::from_str_exact("10.05").unwrap());

        assert!(Price::from_str("not-a-price").is_err());
        assert!(Price::from_str("-1.0").is_err());
    }

    #[test]
    fn test_quantity_checked_sub() {
        let qty = Quantity::new(100);
        assert_eq!(qty.checked_sub(Quantity::new(40)), Some(Quantity::new(60)));
        assert_eq!(qty.checked_sub(Quantity::new(101)), None);
    }

    #[test]
    fn test_quantity_min() {
        assert_eq!(
            Quantity::new(600).min(Quantity::new(200)),
            Quantity::new(200)
        );
    }

    #[test]
    fn test_rate_bounds() {
        assert!(ParticipationRate::from_str("0").is_err());
        assert!(ParticipationRate::from_str("1.01").is_err());
        assert!(ParticipationRate::from_str("-0.1").is_err());
        assert!(ParticipationRate::from_str("0.2").is_ok());
        assert!(ParticipationRate::from_str("1").is_ok());
    }

    #[test]
    fn test_participation_floor() {
        // 5000 × 0.1 = 500 exactly
        let rate = ParticipationRate::from_str("0.1").unwrap();
        assert_eq!(rate.of_volume(5000), Quantity::new(500));

        // 999 × 0.1 = 99.9 → floors to 99
        assert_eq!(rate.of_volume(999), Quantity::new(99));

        // tiny volume floors to zero
        assert_eq!(rate.of_volume(9), Quantity::new(0));
    }

    #[test]
    fn test_price_serde_roundtrip() {
        let price = Price::from_str("123.456").unwrap();
        let json = serde_json::to_string(&price).unwrap();
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(price, back);
    }

    proptest! {
        #[test]
        fn prop_participation_never_exceeds_volume(
            volume in 0u64..10_000_000,
            rate_bps in 1u32..=10_000,
        ) {
            let rate = ParticipationRate::try_new(
                Decimal::new(rate_bps as i64, 4),
            ).unwrap();
            prop_assert!(rate.of_volume(volume).as_u64() <= volume);
        }
    }
}
