//! Participation Execution Core
//!
//! Per-instrument markets that turn one market-data tick per time bin into
//! participation-based fills and deferred cancellations:
//! - One working order per instrument, filled at a fraction of observed
//!   bin volume (VWAP-style participation)
//! - Two-phase cancellation resolved at the next bin boundary
//! - Per-bin volume tracking and an impact-state cost hook
//! - Snapshot restore for rehydrating markets after a restart
//!
//! # Architecture
//!
//! ```text
//! Feed adapter (one tick per instrument per bin)
//!        │
//!   ┌────▼─────┐
//!   │MarketHub │  ← per-instrument lock, parallel across instruments
//!   └────┬─────┘
//!        │
//!   ┌────▼─────┐   ┌──────────────┐
//!   │ Market   │──▶│VolumeTracker │
//!   │          │   ├──────────────┤
//!   │          │──▶│ ImpactState  │
//!   └────┬─────┘   └──────────────┘
//!        │ schedule / process
//!   ┌────▼────────────┐
//!   │ExecutionManager │──▶ Fills → external order/position ledger
//!   └─────────────────┘
//! ```

pub mod clock;
pub mod exec;
pub mod hub;
pub mod impact;
pub mod ledger;
pub mod market;
pub mod snapshot;
pub mod tick;
pub mod volume;

pub use clock::{BinClock, BinSpec, BinWindow, FixedIntervalClock, ManualClock};
pub use exec::{ExecutionManager, ProcessOutcome};
pub use hub::MarketHub;
pub use impact::ImpactState;
pub use ledger::{MemoryOrderSink, NewOrderRecord, NullOrderSink, OrderSink};
pub use market::{BinReport, Market, MarketSummary, OrderRequest};
pub use snapshot::OrderSnapshot;
pub use tick::{MarketTick, RawTick};
pub use volume::VolumeTracker;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
