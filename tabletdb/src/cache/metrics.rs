//! Cache counters
//!
//! Lock-free metrics in the same relaxed-atomic style as the storage
//! statistics: counters are bumped outside the shard lock wherever the
//! call site allows it, so the hot path pays one atomic increment.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Counters published by a block cache.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    inserts: AtomicU64,
    lookups: AtomicU64,
    hits: AtomicU64,
    hits_expected: AtomicU64,
    misses: AtomicU64,
    misses_expected: AtomicU64,
    evictions: AtomicU64,
    evictions_skipped_pinned: AtomicU64,
    /// Total charge of entries currently in the cache
    usage: AtomicI64,
}

impl CacheMetrics {
    #[inline]
    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_lookup(&self, hit: bool, expected_in_cache: bool) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            if expected_in_cache {
                self.hits_expected.fetch_add(1, Ordering::Relaxed);
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            if expected_in_cache {
                self.misses_expected.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_eviction_skipped_pinned(&self) {
        self.evictions_skipped_pinned.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_usage(&self, delta: i64) {
        self.usage.fetch_add(delta, Ordering::Relaxed);
    }

    /// Number of published entries
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Number of lookups
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Lookups that found an entry
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Hits for lookups that expected the entry to be present
    pub fn hits_expected(&self) -> u64 {
        self.hits_expected.load(Ordering::Relaxed)
    }

    /// Lookups that found nothing
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Misses for lookups that expected the entry to be present
    pub fn misses_expected(&self) -> u64 {
        self.misses_expected.load(Ordering::Relaxed)
    }

    /// Entries pushed out by capacity pressure
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Pinned entries passed over during eviction
    pub fn evictions_skipped_pinned(&self) -> u64 {
        self.evictions_skipped_pinned.load(Ordering::Relaxed)
    }

    /// Total charge currently held
    pub fn usage(&self) -> i64 {
        self.usage.load(Ordering::Relaxed)
    }
}
