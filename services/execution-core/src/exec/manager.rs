//! Execution manager
//!
//! Turns scheduled intents into applied fills for one instrument, given
//! the bin's reference price and currency. Within a settlement pass,
//! cancellations for an order are honored before any execution of the
//! same order, so a same-bin cancel-and-fill race always favors the
//! cancel. Bookkeeping violations (a fill exceeding remaining quantity)
//! are clamped and logged rather than raised, so one bad order cannot
//! abort the bin for the rest of the book.

use std::collections::{HashMap, HashSet};

use tracing::{debug, error, info, warn};
use types::fill::Fill;
use types::ids::{InstrumentId, OrderId};
use types::numeric::{Price, Quantity};
use types::order::Order;

use crate::exec::schedule::{ScheduledCancellation, ScheduledExecution};
use crate::impact::ImpactState;

/// Result of one settlement pass.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    pub fills: Vec<Fill>,
    pub canceled: Vec<OrderId>,
}

/// Schedules and settles participation fills and cancellations.
pub struct ExecutionManager {
    symbol: InstrumentId,
    executions: Vec<ScheduledExecution>,
    cancellations: Vec<ScheduledCancellation>,
    /// Monotonic per-instrument fill sequence.
    fill_sequence: u64,
}

impl ExecutionManager {
    pub fn new(symbol: InstrumentId) -> Self {
        Self::with_starting_sequence(symbol, 0)
    }

    /// Create with a starting fill sequence (used on snapshot restore).
    pub fn with_starting_sequence(symbol: InstrumentId, starting_sequence: u64) -> Self {
        Self {
            symbol,
            executions: Vec::new(),
            cancellations: Vec::new(),
            fill_sequence: starting_sequence,
        }
    }

    /// Record an execution intent; the order is not touched yet.
    pub fn schedule_execution(&mut self, order_id: OrderId, qty: Quantity, exec_time: i64) {
        debug!(
            symbol = %self.symbol,
            %order_id,
            qty = qty.as_u64(),
            exec_time,
            "Execution scheduled"
        );
        self.executions.push(ScheduledExecution {
            order_id,
            qty,
            exec_time,
        });
    }

    /// Record a cancellation intent; the order is not touched yet.
    pub fn schedule_cancellation(&mut self, order_id: OrderId, cancel_time: i64) {
        debug!(symbol = %self.symbol, %order_id, cancel_time, "Cancellation scheduled");
        self.cancellations.push(ScheduledCancellation {
            order_id,
            cancel_time,
        });
    }

    /// Settle all intents against the bin `[prv_time, current_time)`.
    ///
    /// Cancellations are finalized first; executions whose `exec_time`
    /// falls inside the window are then applied at the (impact-adjusted)
    /// reference price. Executions for orders canceled in this same pass
    /// are dropped.
    pub fn process_executions(
        &mut self,
        orders: &mut HashMap<OrderId, Order>,
        prv_time: i64,
        current_time: i64,
        currency: &str,
        price: Price,
        impact: &mut ImpactState,
    ) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();
        let mut canceled_now: HashSet<OrderId> = HashSet::new();

        for intent in &self.cancellations {
            match orders.get_mut(&intent.order_id) {
                Some(order) => match order.finalize_cancel(intent.cancel_time) {
                    Ok(()) => {
                        info!(
                            symbol = %self.symbol,
                            order_id = %intent.order_id,
                            frozen_qty = order.remaining_qty().as_u64(),
                            "Order cancellation finalized"
                        );
                        canceled_now.insert(intent.order_id);
                        outcome.canceled.push(intent.order_id);
                    }
                    Err(err) => {
                        warn!(
                            symbol = %self.symbol,
                            order_id = %intent.order_id,
                            %err,
                            "Cancellation could not be finalized"
                        );
                    }
                },
                None => {
                    warn!(
                        symbol = %self.symbol,
                        order_id = %intent.order_id,
                        "Scheduled cancellation references unknown order"
                    );
                }
            }
        }

        let mut sequence = self.fill_sequence;
        for intent in &self.executions {
            if intent.exec_time < prv_time || intent.exec_time >= current_time {
                debug!(
                    symbol = %self.symbol,
                    order_id = %intent.order_id,
                    exec_time = intent.exec_time,
                    window_start = prv_time,
                    window_stop = current_time,
                    "Execution outside settlement window, skipped"
                );
                continue;
            }
            if canceled_now.contains(&intent.order_id) {
                debug!(
                    symbol = %self.symbol,
                    order_id = %intent.order_id,
                    "Same-bin cancellation precedes execution, fill dropped"
                );
                continue;
            }

            let order = match orders.get_mut(&intent.order_id) {
                Some(order) => order,
                None => {
                    warn!(
                        symbol = %self.symbol,
                        order_id = %intent.order_id,
                        "Scheduled execution references unknown order"
                    );
                    continue;
                }
            };
            if !order.is_active() {
                debug!(
                    symbol = %self.symbol,
                    order_id = %intent.order_id,
                    status = order.status.as_str(),
                    "Order no longer active, fill dropped"
                );
                continue;
            }

            // Clamp rather than abort: quantity bookkeeping errors must not
            // block the rest of the bin.
            let mut qty = intent.qty;
            if qty > order.remaining_qty() {
                warn!(
                    symbol = %self.symbol,
                    order_id = %intent.order_id,
                    scheduled = qty.as_u64(),
                    remaining = order.remaining_qty().as_u64(),
                    "Scheduled fill exceeds remaining quantity, clamped"
                );
                qty = order.remaining_qty();
            }
            if qty.is_zero() {
                continue;
            }

            let fill_price = impact.price_adjustment(order.side, price);
            match order.apply_fill(qty, fill_price, intent.exec_time) {
                Ok(()) => {
                    sequence += 1;
                    impact.record_fill(qty.as_u64());
                    let fill = Fill::new(
                        sequence,
                        intent.order_id,
                        self.symbol.clone(),
                        order.side,
                        qty,
                        fill_price,
                        currency,
                        intent.exec_time,
                        current_time,
                    );
                    info!(
                        symbol = %self.symbol,
                        order_id = %intent.order_id,
                        sequence,
                        qty = qty.as_u64(),
                        price = %fill_price,
                        remaining = order.remaining_qty().as_u64(),
                        "Fill applied"
                    );
                    outcome.fills.push(fill);
                }
                Err(err) => {
                    error!(
                        symbol = %self.symbol,
                        order_id = %intent.order_id,
                        %err,
                        "Fill application failed, order skipped this bin"
                    );
                }
            }
        }
        self.fill_sequence = sequence;

        outcome
    }

    /// Discard resolved scheduling state so the next bin starts clean.
    pub fn clear_pending(&mut self) {
        self.executions.clear();
        self.cancellations.clear();
    }

    pub fn pending_executions(&self) -> usize {
        self.executions.len()
    }

    pub fn pending_cancellations(&self) -> usize {
        self.cancellations.len()
    }

    /// Last assigned fill sequence.
    pub fn fill_sequence(&self) -> u64 {
        self.fill_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::ClientOrderId;
    use types::numeric::ParticipationRate;
    use types::order::{OrderStatus, Side};

    const MINUTE: i64 = 60 * 1_000_000_000;

    fn make_order(qty: u64) -> Order {
        Order::new(
            OrderId::new(),
            ClientOrderId::new("C1"),
            InstrumentId::new("AAPL"),
            Side::BUY,
            Quantity::new(qty),
            "USD",
            None,
            "VWAP",
            ParticipationRate::from_str("0.1").unwrap(),
            MINUTE,
            MINUTE,
        )
        .unwrap()
    }

    fn book_with(order: Order) -> HashMap<OrderId, Order> {
        let mut orders = HashMap::new();
        orders.insert(order.order_id, order);
        orders
    }

    #[test]
    fn test_execution_applies_fill() {
        let order = make_order(1000);
        let id = order.order_id;
        let mut orders = book_with(order);
        let mut manager = ExecutionManager::new(InstrumentId::new("AAPL"));
        let mut impact = ImpactState::new();

        manager.schedule_execution(id, Quantity::new(500), MINUTE);
        let outcome = manager.process_executions(
            &mut orders,
            MINUTE,
            2 * MINUTE,
            "USD",
            Price::from_u64(10),
            &mut impact,
        );

        assert_eq!(outcome.fills.len(), 1);
        assert_eq!(outcome.fills[0].sequence, 1);
        assert_eq!(outcome.fills[0].quantity, Quantity::new(500));
        assert_eq!(orders[&id].remaining_qty(), Quantity::new(500));
        assert_eq!(impact.executed_qty(), 500);
    }

    #[test]
    fn test_execution_outside_window_skipped() {
        let order = make_order(1000);
        let id = order.order_id;
        let mut orders = book_with(order);
        let mut manager = ExecutionManager::new(InstrumentId::new("AAPL"));
        let mut impact = ImpactState::new();

        // Scheduled for a future bin
        manager.schedule_execution(id, Quantity::new(500), 2 * MINUTE);
        let outcome = manager.process_executions(
            &mut orders,
            MINUTE,
            2 * MINUTE,
            "USD",
            Price::from_u64(10),
            &mut impact,
        );

        assert!(outcome.fills.is_empty());
        assert_eq!(orders[&id].remaining_qty(), Quantity::new(1000));
        // Intent remains until cleared
        assert_eq!(manager.pending_executions(), 1);
        manager.clear_pending();
        assert_eq!(manager.pending_executions(), 0);
    }

    #[test]
    fn test_cancel_precedes_same_bin_execution() {
        let mut order = make_order(1000);
        order.request_cancel(MINUTE).unwrap();
        let id = order.order_id;
        let mut orders = book_with(order);
        let mut manager = ExecutionManager::new(InstrumentId::new("AAPL"));
        let mut impact = ImpactState::new();

        manager.schedule_cancellation(id, MINUTE);
        manager.schedule_execution(id, Quantity::new(500), MINUTE);
        let outcome = manager.process_executions(
            &mut orders,
            MINUTE,
            2 * MINUTE,
            "USD",
            Price::from_u64(10),
            &mut impact,
        );

        assert!(outcome.fills.is_empty());
        assert_eq!(outcome.canceled, vec![id]);
        assert_eq!(orders[&id].status, OrderStatus::Canceled);
        assert_eq!(orders[&id].remaining_qty(), Quantity::new(1000));
    }

    #[test]
    fn test_overfill_clamped_not_raised() {
        let order = make_order(300);
        let id = order.order_id;
        let mut orders = book_with(order);
        let mut manager = ExecutionManager::new(InstrumentId::new("AAPL"));
        let mut impact = ImpactState::new();

        manager.schedule_execution(id, Quantity::new(500), MINUTE);
        let outcome = manager.process_executions(
            &mut orders,
            MINUTE,
            2 * MINUTE,
            "USD",
            Price::from_u64(10),
            &mut impact,
        );

        assert_eq!(outcome.fills.len(), 1);
        assert_eq!(outcome.fills[0].quantity, Quantity::new(300));
        assert!(orders[&id].remaining_qty().is_zero());
        assert_eq!(orders[&id].status, OrderStatus::Filled);
    }

    #[test]
    fn test_fill_sequence_monotonic_across_bins() {
        let order = make_order(1000);
        let id = order.order_id;
        let mut orders = book_with(order);
        let mut manager = ExecutionManager::new(InstrumentId::new("AAPL"));
        let mut impact = ImpactState::new();

        manager.schedule_execution(id, Quantity::new(100), MINUTE);
        let first = manager.process_executions(
            &mut orders,
            MINUTE,
            2 * MINUTE,
            "USD",
            Price::from_u64(10),
            &mut impact,
        );
        manager.clear_pending();

        manager.schedule_execution(id, Quantity::new(100), 2 * MINUTE);
        let second = manager.process_executions(
            &mut orders,
            2 * MINUTE,
            3 * MINUTE,
            "USD",
            Price::from_u64(11),
            &mut impact,
        );

        assert_eq!(first.fills[0].sequence, 1);
        assert_eq!(second.fills[0].sequence, 2);
        assert_eq!(manager.fill_sequence(), 2);
    }

    #[test]
    fn test_unknown_order_ignored() {
        let mut orders = HashMap::new();
        let mut manager = ExecutionManager::new(InstrumentId::new("AAPL"));
        let mut impact = ImpactState::new();

        manager.schedule_execution(OrderId::new(), Quantity::new(100), MINUTE);
        manager.schedule_cancellation(OrderId::new(), MINUTE);
        let outcome = manager.process_executions(
            &mut orders,
            MINUTE,
            2 * MINUTE,
            "USD",
            Price::from_u64(10),
            &mut impact,
        );

        assert!(outcome.fills.is_empty());
        assert!(outcome.canceled.is_empty());
    }
}
