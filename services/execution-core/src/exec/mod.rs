//! Execution scheduling and settlement
//!
//! Intents (execute N shares of order O at time T; cancel order O at time
//! T) are recorded during bin evaluation and resolved in one settlement
//! pass, cancellations first.

pub mod manager;
pub mod schedule;

pub use manager::{ExecutionManager, ProcessOutcome};
pub use schedule::{ScheduledCancellation, ScheduledExecution};
