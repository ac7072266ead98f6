//! Memory consumption tracking
//!
//! Lock-free accounting of bytes charged against a named consumer. The
//! block cache consumes per-entry charge when an entry is published and
//! releases it when the entry is finally freed, so consumption reflects
//! live cache memory at all times.

use std::sync::atomic::{AtomicI64, Ordering};

/// Tracks current and peak memory consumption for one consumer.
pub struct MemTracker {
    id: String,
    consumption: AtomicI64,
    peak: AtomicI64,
}

impl MemTracker {
    /// Create a tracker with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            consumption: AtomicI64::new(0),
            peak: AtomicI64::new(0),
        }
    }

    /// Tracker id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record `bytes` of new consumption.
    pub fn consume(&self, bytes: i64) {
        let new = self.consumption.fetch_add(bytes, Ordering::Relaxed) + bytes;
        // CAS loop for peak update (no atomic fetch_max ordering guarantees needed
        // beyond monotonicity).
        let mut current = self.peak.load(Ordering::Relaxed);
        while current < new {
            match self.peak.compare_exchange_weak(
                current,
                new,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(v) => current = v,
            }
        }
    }

    /// Record `bytes` of released consumption.
    pub fn release(&self, bytes: i64) {
        let prev = self.consumption.fetch_sub(bytes, Ordering::Relaxed);
        debug_assert!(prev >= bytes, "released more than was consumed");
    }

    /// Current consumption in bytes
    pub fn consumption(&self) -> i64 {
        self.consumption.load(Ordering::Relaxed)
    }

    /// Highest consumption observed
    pub fn peak_consumption(&self) -> i64 {
        self.peak.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for MemTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTracker")
            .field("id", &self.id)
            .field("consumption", &self.consumption())
            .field("peak", &self.peak_consumption())
            .finish()
    }
}
