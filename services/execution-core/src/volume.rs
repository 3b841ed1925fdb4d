//! Per-bin traded volume accounting
//!
//! Accumulates the volume observed in the current bin (keyed by the bin's
//! stop timestamp) plus a running session total. Closed bins are retained
//! in a bounded history for participation analysis. Volume keys must be
//! non-decreasing; older keys are logged and ignored so the per-bin
//! accounting never moves backwards.

use std::collections::BTreeMap;

use tracing::{debug, warn};

/// Default number of closed bins retained.
const DEFAULT_MAX_HISTORY: usize = 1_440; // one trading day of minute bins

/// Tracks traded volume per bin and across the session.
#[derive(Debug, Clone)]
pub struct VolumeTracker {
    /// Currently accumulating bin: (bin stop timestamp, volume).
    current: Option<(i64, u64)>,
    /// Closed bins by stop timestamp (BTreeMap for deterministic order).
    closed: BTreeMap<i64, u64>,
    /// Running total across all applied updates.
    session_total: u64,
    /// Max closed bins to retain.
    max_history: usize,
}

impl Default for VolumeTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl VolumeTracker {
    pub fn new(max_history: usize) -> Self {
        Self {
            current: None,
            closed: BTreeMap::new(),
            session_total: 0,
            max_history,
        }
    }

    /// Record a bin's traded volume, keyed by the bin's stop timestamp.
    ///
    /// Same-key updates accumulate into the current bin; a newer key rolls
    /// the current bin into history; an older key is ignored with a warning.
    /// Returns whether the update was applied.
    pub fn record(&mut self, bin_stop: i64, volume: u64) -> bool {
        match self.current {
            Some((stop, ref mut acc)) if bin_stop == stop => {
                *acc += volume;
                self.session_total += volume;
                true
            }
            Some((stop, _)) if bin_stop < stop => {
                warn!(
                    last_bin_stop = stop,
                    received_bin_stop = bin_stop,
                    volume,
                    "Out-of-order volume update ignored"
                );
                false
            }
            Some((stop, acc)) => {
                // Newer bin: close the current one and start fresh
                self.closed.insert(stop, acc);
                self.trim_history();
                debug!(closed_bin_stop = stop, bin_volume = acc, "Volume bin rolled");
                self.current = Some((bin_stop, volume));
                self.session_total += volume;
                true
            }
            None => {
                self.current = Some((bin_stop, volume));
                self.session_total += volume;
                true
            }
        }
    }

    /// Volume accumulated in the currently open bin.
    pub fn bin_volume(&self) -> u64 {
        self.current.map(|(_, v)| v).unwrap_or(0)
    }

    /// Stop timestamp of the currently open bin, if any.
    pub fn current_bin_stop(&self) -> Option<i64> {
        self.current.map(|(stop, _)| stop)
    }

    /// Total volume applied this session.
    pub fn session_volume(&self) -> u64 {
        self.session_total
    }

    /// Closed bins in chronological order, newest last.
    pub fn closed_bins(&self, limit: usize) -> Vec<(i64, u64)> {
        let skip = self.closed.len().saturating_sub(limit);
        self.closed.iter().skip(skip).map(|(k, v)| (*k, *v)).collect()
    }

    fn trim_history(&mut self) {
        while self.closed.len() > self.max_history {
            self.closed.pop_first();
        }
    }
}
