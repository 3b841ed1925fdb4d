//! Per-instrument market
//!
//! The `Market` is the aggregate root for one instrument: it owns the
//! order map, the execution manager, the volume tracker, and the impact
//! state, and orchestrates the per-bin update cycle — ingest tick,
//! resolve active and cancel-pending orders, schedule, settle, clear.
//!
//! One working order per instrument is a deliberate risk control: a
//! second submission is rejected while an active order exists.
//!
//! The update cycle validates the tick and computes the full scheduling
//! plan before touching any state, so a failed tick leaves the market
//! exactly as it was.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use types::errors::{CoreError, OrderError, TickError};
use types::fill::Fill;
use types::ids::{ClientOrderId, InstrumentId, OrderId};
use types::numeric::{ParticipationRate, Price, Quantity};
use types::order::{Order, OrderStatus, Side};

use crate::clock::{BinClock, BinWindow};
use crate::exec::ExecutionManager;
use crate::impact::ImpactState;
use crate::ledger::{NewOrderRecord, OrderSink};
use crate::tick::RawTick;
use crate::volume::VolumeTracker;

/// Tick-over-tick price move treated as notable: 0.5%.
fn significant_move_threshold() -> Decimal {
    Decimal::new(5, 3)
}

/// Submission parameters for a new participation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub submit_timestamp: i64, // Unix nanos
    pub side: Side,
    pub qty: u64,
    pub currency: String,
    pub price: Option<Price>,
    pub cl_order_id: ClientOrderId,
    pub order_type: String,
    pub participation_rate: ParticipationRate,
    /// Supplied on snapshot restore; generated otherwise.
    pub order_id: Option<OrderId>,
    /// Supplied on snapshot restore; derived from the bin clock otherwise.
    pub start_timestamp: Option<i64>,
    /// Suppress the ledger-sink notification (snapshot restore only).
    pub skip_ledger: bool,
}

impl OrderRequest {
    pub fn new(
        submit_timestamp: i64,
        side: Side,
        qty: u64,
        currency: impl Into<String>,
        cl_order_id: impl Into<ClientOrderId>,
        participation_rate: ParticipationRate,
    ) -> Self {
        Self {
            submit_timestamp,
            side,
            qty,
            currency: currency.into(),
            price: None,
            cl_order_id: cl_order_id.into(),
            order_type: "VWAP".to_string(),
            participation_rate,
            order_id: None,
            start_timestamp: None,
            skip_ledger: false,
        }
    }

    pub fn with_price(mut self, price: Price) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the submission time from a timezone-aware wall-clock time,
    /// normalized to UTC nanoseconds.
    pub fn submitted_at<Tz: chrono::TimeZone>(mut self, dt: &chrono::DateTime<Tz>) -> Self {
        self.submit_timestamp = types::time::nanos_from_datetime(dt);
        self
    }

    pub fn with_order_type(mut self, order_type: impl Into<String>) -> Self {
        self.order_type = order_type.into();
        self
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_start_timestamp(mut self, start_timestamp: i64) -> Self {
        self.start_timestamp = Some(start_timestamp);
        self
    }

    pub fn skip_ledger(mut self) -> Self {
        self.skip_ledger = true;
        self
    }
}

/// Outcome of one per-bin update cycle.
#[derive(Debug, Clone)]
pub struct BinReport {
    pub window: BinWindow,
    pub fills: Vec<Fill>,
    pub canceled: Vec<OrderId>,
    /// Volume accumulated in the bin after this tick.
    pub bin_volume: u64,
    /// Tick-over-tick price move exceeded 0.5%.
    pub significant_move: bool,
}

/// Copied read-only view of a market's headline state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub instrument: InstrumentId,
    pub last_price: Option<Price>,
    pub last_bin_stop: Option<i64>,
    pub order_count: usize,
    pub active_orders: usize,
    pub pending_cancels: usize,
    pub session_volume: u64,
}

/// Per-instrument order book and bin-cycle orchestrator.
pub struct Market {
    instrument: InstrumentId,
    orders: HashMap<OrderId, Order>,
    exec: ExecutionManager,
    volume: VolumeTracker,
    impact: ImpactState,
    last_price: Option<Price>,
    last_bin_stop: Option<i64>,
    clock: Arc<dyn BinClock>,
    sink: Arc<dyn OrderSink>,
}

impl Market {
    pub fn new(
        instrument: InstrumentId,
        clock: Arc<dyn BinClock>,
        sink: Arc<dyn OrderSink>,
    ) -> Self {
        Self {
            exec: ExecutionManager::new(instrument.clone()),
            instrument,
            orders: HashMap::new(),
            volume: VolumeTracker::default(),
            impact: ImpactState::new(),
            last_price: None,
            last_bin_stop: None,
            clock,
            sink,
        }
    }

    /// Replace the impact state (e.g. to configure a cost model).
    pub fn with_impact(mut self, impact: ImpactState) -> Self {
        self.impact = impact;
        self
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    /// Submit a new participation order.
    ///
    /// Rejected while another active order is working this instrument.
    /// An order whose cancellation has been requested no longer occupies
    /// the slot: it can never fill again once the request is recorded.
    /// Re-submitting an existing `order_id` replaces that entry, which is
    /// what makes snapshot replay idempotent.
    pub fn add_order(&mut self, req: OrderRequest) -> Result<OrderId, CoreError> {
        let order_id = req.order_id.unwrap_or_default();

        if let Some(existing) = self
            .orders
            .values()
            .find(|o| o.is_active() && o.order_id != order_id)
        {
            warn!(
                instrument = %self.instrument,
                existing_order = %existing.order_id,
                cl_order_id = %req.cl_order_id,
                "Submission rejected: active order already working"
            );
            return Err(OrderError::ActiveOrderExists {
                symbol: self.instrument.to_string(),
                existing: existing.order_id.to_string(),
            }
            .into());
        }

        let start_timestamp = req
            .start_timestamp
            .unwrap_or_else(|| self.clock.current_window().start);

        let order = Order::new(
            order_id,
            req.cl_order_id,
            self.instrument.clone(),
            req.side,
            Quantity::new(req.qty),
            req.currency,
            req.price,
            req.order_type,
            req.participation_rate,
            req.submit_timestamp,
            start_timestamp,
        )?;

        if !req.skip_ledger {
            self.sink.on_new_order(NewOrderRecord::from_order(&order));
        }

        info!(
            instrument = %self.instrument,
            %order_id,
            side = ?order.side,
            qty = order.original_qty().as_u64(),
            rate = %order.participation_rate,
            start_timestamp,
            skip_ledger = req.skip_ledger,
            "Order accepted"
        );

        if self.orders.insert(order_id, order).is_some() {
            info!(instrument = %self.instrument, %order_id, "Existing order replaced on resubmission");
        }

        Ok(order_id)
    }

    /// Request cancellation of a working order.
    ///
    /// Deferred: the order is marked and stops being eligible, but removal
    /// from participation is settled during the next bin's processing.
    /// Returns the order state after the request.
    pub fn delete_order(
        &mut self,
        order_id: OrderId,
        timestamp: i64,
    ) -> Result<Order, CoreError> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| OrderError::NotFound {
                order_id: order_id.to_string(),
            })?;

        order.request_cancel(timestamp)?;
        info!(
            instrument = %self.instrument,
            %order_id,
            remaining = order.remaining_qty().as_u64(),
            "Cancellation requested, effective next bin"
        );
        Ok(order.clone())
    }

    /// The per-bin state machine transition, invoked once per tick.
    ///
    /// Validates the tick and computes the full scheduling plan before any
    /// state is mutated; the settlement pass then applies cancellations
    /// (first) and participation fills against the tick's price/volume.
    pub fn update_market_state(&mut self, raw: &RawTick) -> Result<BinReport, CoreError> {
        // Validation phase: nothing below may mutate until the tick and the
        // bin ordering have both been accepted.
        let tick = raw.parse().map_err(|err| {
            error!(instrument = %self.instrument, %err, "Tick rejected");
            CoreError::from(err)
        })?;

        let window = self.clock.current_window();
        if let Some(last_stop) = self.last_bin_stop {
            if window.stop < last_stop {
                let err = TickError::StaleBin {
                    last_stop,
                    received_stop: window.stop,
                };
                error!(instrument = %self.instrument, %err, "Tick rejected");
                return Err(err.into());
            }
        }

        // Planning phase over immutable reads.
        let cancel_ids: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::CancelRequested && !o.remaining_qty().is_zero())
            .map(|o| o.order_id)
            .collect();

        let mut planned: Vec<(OrderId, Quantity, i64)> = Vec::new();
        for order in self
            .orders
            .values()
            .filter(|o| o.is_active() && o.start_timestamp <= window.stop)
        {
            let participation = order
                .remaining_qty()
                .min(order.participation_rate.of_volume(tick.volume));
            if !participation.is_zero() {
                let exec_time = order.start_timestamp.max(window.start);
                planned.push((order.order_id, participation, exec_time));
            }
        }

        // Apply phase.
        self.volume.record(window.stop, tick.volume);
        self.impact.record_bin_volume(tick.volume);

        for order_id in &cancel_ids {
            self.exec.schedule_cancellation(*order_id, window.start);
        }
        for (order_id, qty, exec_time) in &planned {
            self.exec.schedule_execution(*order_id, *qty, *exec_time);
        }

        let outcome = self.exec.process_executions(
            &mut self.orders,
            window.start,
            window.stop,
            &tick.currency,
            tick.price,
            &mut self.impact,
        );
        self.exec.clear_pending();

        let significant_move = match self.last_price {
            Some(last) => {
                let change =
                    (tick.price.as_decimal() - last.as_decimal()).abs() / last.as_decimal();
                if change > significant_move_threshold() {
                    warn!(
                        instrument = %self.instrument,
                        last_price = %last,
                        price = %tick.price,
                        change = %change,
                        "Significant tick-over-tick price move"
                    );
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        self.last_price = Some(tick.price);
        self.last_bin_stop = Some(window.stop);

        Ok(BinReport {
            window,
            fills: outcome.fills,
            canceled: outcome.canceled,
            bin_volume: self.volume.bin_volume(),
            significant_move,
        })
    }

    /// Copy of one order's current state.
    pub fn get_order(&self, order_id: OrderId) -> Option<Order> {
        self.orders.get(&order_id).cloned()
    }

    /// Copies of all buy orders.
    pub fn buy_orders(&self) -> Vec<Order> {
        self.orders_with(|o| o.side == Side::BUY)
    }

    /// Copies of all sell orders.
    pub fn sell_orders(&self) -> Vec<Order> {
        self.orders_with(|o| o.side == Side::SELL)
    }

    /// Copies of all orders awaiting cancellation settlement.
    pub fn cancel_orders(&self) -> Vec<Order> {
        self.orders_with(|o| o.status == OrderStatus::CancelRequested)
    }

    fn orders_with(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        self.orders
            .values()
            .filter(|o| predicate(o))
            .cloned()
            .collect()
    }

    /// Signed remaining quantity across active orders: buys positive,
    /// sells negative. A coarse inventory/exposure signal.
    pub fn pending_quantity(&self) -> i64 {
        self.orders
            .values()
            .filter(|o| o.is_active())
            .map(|o| o.side.sign() * o.remaining_qty().as_u64() as i64)
            .sum()
    }

    pub fn last_price(&self) -> Option<Price> {
        self.last_price
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Copied headline view for external readers.
    pub fn summary(&self) -> MarketSummary {
        MarketSummary {
            instrument: self.instrument.clone(),
            last_price: self.last_price,
            last_bin_stop: self.last_bin_stop,
            order_count: self.orders.len(),
            active_orders: self.orders.values().filter(|o| o.is_active()).count(),
            pending_cancels: self
                .orders
                .values()
                .filter(|o| o.status == OrderStatus::CancelRequested)
                .count(),
            session_volume: self.volume.session_volume(),
        }
    }

    /// Copies of every order, for snapshotting.
    pub fn orders_snapshot(&self) -> Vec<Order> {
        self.orders.values().cloned().collect()
    }

    /// Load a rehydrated order during snapshot restore.
    ///
    /// Never notifies the ledger sink. Upserts by `order_id`, so replaying
    /// the same snapshot is idempotent; the single-active-order check still
    /// applies against other orders.
    pub fn load_order(&mut self, order: Order) -> Result<OrderId, CoreError> {
        let order_id = order.order_id;
        if let Some(existing) = self
            .orders
            .values()
            .find(|o| o.is_active() && o.order_id != order_id)
        {
            if order.is_active() {
                return Err(OrderError::ActiveOrderExists {
                    symbol: self.instrument.to_string(),
                    existing: existing.order_id.to_string(),
                }
                .into());
            }
        }

        info!(
            instrument = %self.instrument,
            %order_id,
            status = order.status.as_str(),
            remaining = order.remaining_qty().as_u64(),
            "Order restored from snapshot"
        );
        self.orders.insert(order_id, order);
        Ok(order_id)
    }
}
