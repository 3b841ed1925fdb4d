//! Multi-instrument market registry
//!
//! One `Market` per instrument, each guarded by its own mutex so
//! submission, cancellation, and bin processing for one instrument can
//! never interleave, while distinct instruments process ticks fully in
//! parallel. All read paths copy data out under the same lock.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::info;
use types::errors::CoreError;
use types::ids::{InstrumentId, OrderId};
use types::order::Order;

use crate::clock::BinClock;
use crate::ledger::OrderSink;
use crate::market::{BinReport, Market, MarketSummary, OrderRequest};
use crate::snapshot::OrderSnapshot;
use crate::tick::RawTick;

/// Registry of per-instrument markets sharing one clock and ledger sink.
pub struct MarketHub {
    markets: DashMap<InstrumentId, Arc<Mutex<Market>>>,
    clock: Arc<dyn BinClock>,
    sink: Arc<dyn OrderSink>,
}

impl MarketHub {
    pub fn new(clock: Arc<dyn BinClock>, sink: Arc<dyn OrderSink>) -> Self {
        Self {
            markets: DashMap::new(),
            clock,
            sink,
        }
    }

    /// Get or create the market for an instrument.
    pub fn market(&self, instrument: &InstrumentId) -> Arc<Mutex<Market>> {
        let entry = self.markets.entry(instrument.clone()).or_insert_with(|| {
            info!(%instrument, "Market created");
            Arc::new(Mutex::new(Market::new(
                instrument.clone(),
                self.clock.clone(),
                self.sink.clone(),
            )))
        });
        Arc::clone(entry.value())
    }

    fn existing(&self, instrument: &InstrumentId) -> Result<Arc<Mutex<Market>>, CoreError> {
        self.markets
            .get(instrument)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CoreError::UnknownInstrument {
                symbol: instrument.to_string(),
            })
    }

    fn locked<T>(
        market: &Arc<Mutex<Market>>,
        instrument: &InstrumentId,
        f: impl FnOnce(&mut Market) -> T,
    ) -> Result<T, CoreError> {
        let mut guard = market.lock().map_err(|_| CoreError::System {
            message: format!("market lock poisoned for {instrument}"),
        })?;
        Ok(f(&mut guard))
    }

    /// Submit an order, creating the instrument's market if needed.
    pub fn add_order(
        &self,
        instrument: &InstrumentId,
        req: OrderRequest,
    ) -> Result<OrderId, CoreError> {
        let market = self.market(instrument);
        Self::locked(&market, instrument, |m| m.add_order(req))?
    }

    /// Request cancellation of a working order.
    pub fn delete_order(
        &self,
        instrument: &InstrumentId,
        order_id: OrderId,
        timestamp: i64,
    ) -> Result<Order, CoreError> {
        let market = self.existing(instrument)?;
        Self::locked(&market, instrument, |m| m.delete_order(order_id, timestamp))?
    }

    /// Apply one bin's tick to an instrument's market.
    pub fn update_market_state(
        &self,
        instrument: &InstrumentId,
        raw: &RawTick,
    ) -> Result<BinReport, CoreError> {
        let market = self.market(instrument);
        Self::locked(&market, instrument, |m| m.update_market_state(raw))?
    }

    /// Copied state of one order.
    pub fn get_order(
        &self,
        instrument: &InstrumentId,
        order_id: OrderId,
    ) -> Result<Option<Order>, CoreError> {
        let market = self.existing(instrument)?;
        Self::locked(&market, instrument, |m| m.get_order(order_id))
    }

    /// Copied headline view of one market.
    pub fn market_summary(
        &self,
        instrument: &InstrumentId,
    ) -> Result<MarketSummary, CoreError> {
        let market = self.existing(instrument)?;
        Self::locked(&market, instrument, |m| m.summary())
    }

    /// Copied headline views across every market.
    pub fn summaries(&self) -> Vec<MarketSummary> {
        let mut summaries: Vec<MarketSummary> = self
            .markets
            .iter()
            .filter_map(|entry| entry.value().lock().ok().map(|m| m.summary()))
            .collect();
        summaries.sort_by(|a, b| a.instrument.as_str().cmp(b.instrument.as_str()));
        summaries
    }

    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut instruments: Vec<InstrumentId> =
            self.markets.iter().map(|entry| entry.key().clone()).collect();
        instruments.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        instruments
    }

    pub fn contains(&self, instrument: &InstrumentId) -> bool {
        self.markets.contains_key(instrument)
    }

    /// Rehydrate markets from persisted order snapshots.
    ///
    /// The only sanctioned way to rebuild state after a restart: each
    /// record is validated, routed to its symbol's market (created as
    /// needed), and loaded without ledger notification. Replaying the same
    /// snapshot set twice yields identical state. Returns the number of
    /// orders loaded.
    pub fn restore(&self, snapshots: &[OrderSnapshot]) -> Result<usize, CoreError> {
        let mut loaded = 0;
        for snapshot in snapshots {
            let instrument = snapshot.symbol.clone();
            let order = snapshot.clone().into_order()?;
            let market = self.market(&instrument);
            Self::locked(&market, &instrument, |m| m.load_order(order))??;
            loaded += 1;
        }
        info!(orders = loaded, "Snapshot restore complete");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{BinSpec, ManualClock};
    use crate::ledger::MemoryOrderSink;
    use std::thread;
    use types::numeric::{ParticipationRate, Quantity};
    use types::order::Side;

    const MINUTE: i64 = 60 * 1_000_000_000;

    fn hub() -> (MarketHub, Arc<ManualClock>, Arc<MemoryOrderSink>) {
        let clock = Arc::new(ManualClock::new(BinSpec::one_minute(), 10 * MINUTE));
        let sink = Arc::new(MemoryOrderSink::new());
        (
            MarketHub::new(clock.clone(), sink.clone()),
            clock,
            sink,
        )
    }

    fn request(qty: u64) -> OrderRequest {
        OrderRequest::new(
            10 * MINUTE,
            Side::BUY,
            qty,
            "USD",
            "C1",
            ParticipationRate::from_str("0.2").unwrap(),
        )
    }

    #[test]
    fn test_instruments_independent() {
        let (hub, _clock, _sink) = hub();
        let aapl = InstrumentId::new("AAPL");
        let msft = InstrumentId::new("MSFT");

        hub.add_order(&aapl, request(1000)).unwrap();
        hub.add_order(&msft, request(500)).unwrap();

        assert_eq!(hub.instruments(), vec![aapl.clone(), msft.clone()]);
        assert_eq!(hub.market_summary(&aapl).unwrap().active_orders, 1);
        assert_eq!(hub.market_summary(&msft).unwrap().active_orders, 1);
    }

    #[test]
    fn test_unknown_instrument_errors() {
        let (hub, _clock, _sink) = hub();
        let unknown = InstrumentId::new("NONE");

        assert!(matches!(
            hub.delete_order(&unknown, OrderId::new(), 0),
            Err(CoreError::UnknownInstrument { .. })
        ));
        assert!(matches!(
            hub.get_order(&unknown, OrderId::new()),
            Err(CoreError::UnknownInstrument { .. })
        ));
    }

    #[test]
    fn test_parallel_ticks_across_instruments() {
        let (hub, _clock, _sink) = hub();
        let hub = Arc::new(hub);

        let symbols: Vec<InstrumentId> = (0..4)
            .map(|i| InstrumentId::new(format!("SYM{i}")))
            .collect();
        for symbol in &symbols {
            hub.add_order(symbol, request(1000)).unwrap();
        }

        let handles: Vec<_> = symbols
            .iter()
            .map(|symbol| {
                let hub = hub.clone();
                let symbol = symbol.clone();
                thread::spawn(move || {
                    hub.update_market_state(&symbol, &RawTick::new("USD", "10.00", "2000"))
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            let report = handle.join().unwrap();
            assert_eq!(report.fills.len(), 1);
            assert_eq!(report.fills[0].quantity, Quantity::new(400));
        }
    }

    #[test]
    fn test_same_instrument_serialized() {
        let (hub, _clock, _sink) = hub();
        let hub = Arc::new(hub);
        let symbol = InstrumentId::new("AAPL");
        hub.add_order(&symbol, request(1000)).unwrap();

        // Many concurrent ticks for one instrument: every mutation runs
        // under the market's lock, so fill accounting must reconcile.
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let hub = hub.clone();
                let symbol = symbol.clone();
                thread::spawn(move || {
                    let _ = hub.update_market_state(
                        &symbol,
                        &RawTick::new("USD", "10.00", "500"),
                    );
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = hub.market_summary(&symbol).unwrap();
        assert_eq!(summary.session_volume, 8 * 500);

        let orders = hub.market(&symbol).lock().unwrap().orders_snapshot();
        assert_eq!(orders.len(), 1);
        assert!(orders[0].check_invariant());
        // 8 ticks × min(remaining, 100) participation = 800 filled
        assert_eq!(orders[0].completed_qty(), Quantity::new(800));
    }

    #[test]
    fn test_restore_idempotent() {
        let (hub, _clock, sink) = hub();
        let symbol = InstrumentId::new("AAPL");
        let order_id = hub.add_order(&symbol, request(1000)).unwrap();
        assert_eq!(sink.len(), 1);

        let snapshots: Vec<OrderSnapshot> = hub
            .market(&symbol)
            .lock()
            .unwrap()
            .orders_snapshot()
            .iter()
            .map(OrderSnapshot::from_order)
            .collect();

        // Fresh hub restored twice from the same snapshot set
        let (restored_hub, _clock2, restore_sink) = {
            let clock = Arc::new(ManualClock::new(BinSpec::one_minute(), 10 * MINUTE));
            let sink = Arc::new(MemoryOrderSink::new());
            (
                MarketHub::new(clock.clone(), sink.clone()),
                clock,
                sink,
            )
        };

        assert_eq!(restored_hub.restore(&snapshots).unwrap(), 1);
        let first_pass = restored_hub
            .market(&symbol)
            .lock()
            .unwrap()
            .orders_snapshot();

        assert_eq!(restored_hub.restore(&snapshots).unwrap(), 1);
        let second_pass = restored_hub
            .market(&symbol)
            .lock()
            .unwrap()
            .orders_snapshot();

        // No ledger notifications, identical state both times
        assert!(restore_sink.is_empty());
        assert_eq!(first_pass, second_pass);
        assert_eq!(first_pass.len(), 1);
        assert_eq!(first_pass[0].order_id, order_id);
    }
}
