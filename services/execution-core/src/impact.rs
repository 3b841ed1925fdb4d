//! Market impact state
//!
//! Opaque per-instrument accumulator consumed by execution scheduling. The
//! model is linear temporary impact: the fill price is adjusted against the
//! order by `coefficient × realized participation ratio`. The default
//! coefficient is zero, making the hook a pure passthrough until a cost
//! model is configured.

use rust_decimal::Decimal;
use types::numeric::Price;
use types::order::Side;

#[derive(Debug, Clone)]
pub struct ImpactState {
    /// Shares this market has executed across the session.
    executed_qty: u64,
    /// Total market volume observed across the session.
    observed_volume: u64,
    /// Linear impact coefficient (fraction of price per unit participation).
    coefficient: Decimal,
}

impl Default for ImpactState {
    fn default() -> Self {
        Self::new()
    }
}

impl ImpactState {
    /// Passthrough state: zero coefficient, no price adjustment.
    pub fn new() -> Self {
        Self {
            executed_qty: 0,
            observed_volume: 0,
            coefficient: Decimal::ZERO,
        }
    }

    pub fn with_coefficient(coefficient: Decimal) -> Self {
        Self {
            executed_qty: 0,
            observed_volume: 0,
            coefficient,
        }
    }

    /// Record a bin's observed market volume.
    pub fn record_bin_volume(&mut self, volume: u64) {
        self.observed_volume += volume;
    }

    /// Record shares executed by this market.
    pub fn record_fill(&mut self, qty: u64) {
        self.executed_qty += qty;
    }

    /// Realized participation: executed shares over observed volume.
    pub fn participation_ratio(&self) -> Decimal {
        if self.observed_volume == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.executed_qty) / Decimal::from(self.observed_volume)
    }

    pub fn executed_qty(&self) -> u64 {
        self.executed_qty
    }

    pub fn observed_volume(&self) -> u64 {
        self.observed_volume
    }

    /// Adjust a reference price for impact, against the order's side:
    /// buys pay up, sells receive less. Falls back to the unadjusted price
    /// if the adjustment would drive it non-positive.
    pub fn price_adjustment(&self, side: Side, price: Price) -> Price {
        if self.coefficient.is_zero() {
            return price;
        }

        let shift = self.coefficient * self.participation_ratio();
        let factor = match side {
            Side::BUY => Decimal::ONE + shift,
            Side::SELL => Decimal::ONE - shift,
        };
        Price::try_new(price.as_decimal() * factor).unwrap_or(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_passthrough_by_default() {
        let mut impact = ImpactState::new();
        impact.record_bin_volume(10_000);
        impact.record_fill(1_000);

        let price = Price::from_u64(100);
        assert_eq!(impact.price_adjustment(Side::BUY, price), price);
        assert_eq!(impact.price_adjustment(Side::SELL, price), price);
    }

    #[test]
    fn test_participation_ratio() {
        let mut impact = ImpactState::new();
        assert_eq!(impact.participation_ratio(), Decimal::ZERO);

        impact.record_bin_volume(10_000);
        impact.record_fill(1_000);
        assert_eq!(
            impact.participation_ratio(),
            Decimal::from_str("0.1").unwrap()
        );
    }

    #[test]
    fn test_linear_adjustment_direction() {
        // coefficient 0.02, participation 0.5 → 1% shift
        let mut impact = ImpactState::with_coefficient(Decimal::from_str("0.02").unwrap());
        impact.record_bin_volume(2_000);
        impact.record_fill(1_000);

        let price = Price::from_u64(100);
        let buy = impact.price_adjustment(Side::BUY, price);
        let sell = impact.price_adjustment(Side::SELL, price);

        assert_eq!(buy.as_decimal(), Decimal::from_str("101").unwrap());
        assert_eq!(sell.as_decimal(), Decimal::from_str("99").unwrap());
    }
}
