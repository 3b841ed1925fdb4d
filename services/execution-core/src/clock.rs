//! Time-bin authority
//!
//! Bins are fixed windows aligned to epoch (e.g. one minute); the core
//! settles scheduled executions once per bin. Markets receive the bin
//! authority by injection so tests and replay drive time explicitly.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Half-open bin window `[start, stop)` in Unix nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinWindow {
    pub start: i64,
    pub stop: i64,
}

impl BinWindow {
    /// Whether a timestamp falls inside this window.
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts < self.stop
    }
}

/// Fixed bin duration with epoch-aligned boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinSpec {
    duration_nanos: i64,
}

impl BinSpec {
    /// Create a spec from a duration in nanoseconds.
    ///
    /// # Panics
    /// Panics if the duration is not positive.
    pub fn new(duration_nanos: i64) -> Self {
        assert!(duration_nanos > 0, "bin duration must be positive");
        Self { duration_nanos }
    }

    /// One-minute bins, the conventional participation window.
    pub fn one_minute() -> Self {
        Self::new(60 * 1_000_000_000)
    }

    pub fn duration_nanos(&self) -> i64 {
        self.duration_nanos
    }

    /// Align a timestamp to this spec's boundary (floor).
    pub fn align_to_boundary(&self, timestamp_nanos: i64) -> i64 {
        (timestamp_nanos / self.duration_nanos) * self.duration_nanos
    }

    /// The window containing a timestamp.
    pub fn window_containing(&self, timestamp_nanos: i64) -> BinWindow {
        let start = self.align_to_boundary(timestamp_nanos);
        BinWindow {
            start,
            stop: start + self.duration_nanos,
        }
    }
}

/// Source of the current bin window.
///
/// Injected into every `Market` in place of any process-global clock
/// lookup; implementations must be cheap and thread-safe.
pub trait BinClock: Send + Sync {
    /// The bin window currently being accumulated.
    fn current_window(&self) -> BinWindow;
}

/// Wall-clock bins aligned to epoch.
#[derive(Debug)]
pub struct FixedIntervalClock {
    spec: BinSpec,
}

impl FixedIntervalClock {
    pub fn new(spec: BinSpec) -> Self {
        Self { spec }
    }
}

impl BinClock for FixedIntervalClock {
    fn current_window(&self) -> BinWindow {
        // timestamp_nanos_opt saturates past year 2262
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        self.spec.window_containing(now)
    }
}

/// Manually stepped clock for tests, simulation, and replay.
///
/// Starts at the window containing `start_nanos`; `advance()` moves one
/// bin forward.
#[derive(Debug)]
pub struct ManualClock {
    spec: BinSpec,
    start: AtomicI64,
}

impl ManualClock {
    pub fn new(spec: BinSpec, start_nanos: i64) -> Self {
        Self {
            spec,
            start: AtomicI64::new(spec.align_to_boundary(start_nanos)),
        }
    }

    /// Move to the next bin and return its window.
    pub fn advance(&self) -> BinWindow {
        let duration = self.spec.duration_nanos();
        let start = self.start.fetch_add(duration, Ordering::SeqCst) + duration;
        BinWindow {
            start,
            stop: start + duration,
        }
    }

    /// Jump to the window containing a timestamp.
    pub fn set(&self, timestamp_nanos: i64) {
        self.start.store(
            self.spec.align_to_boundary(timestamp_nanos),
            Ordering::SeqCst,
        );
    }
}

impl BinClock for ManualClock {
    fn current_window(&self) -> BinWindow {
        let start = self.start.load(Ordering::SeqCst);
        BinWindow {
            start,
            stop: start + self.spec.duration_nanos(),
        }
    }
}
