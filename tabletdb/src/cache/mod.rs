//! Sharded block cache
//!
//! A thread-safe key/value cache fronting block reads. Entries are
//! allocated, filled by the caller, then published; lookups pin entries
//! through RAII handles so eviction can never free memory that is still
//! being read. The cache stripes its keyspace over independent shards to
//! cut mutex contention, evicts by LRU or FIFO, and can keep entry
//! buffers in a persistent-memory file instead of the heap.

mod metrics;
mod nvm;
mod shard;

pub use metrics::CacheMetrics;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use crate::util::MemTracker;
use crate::{Error, Result};

use nvm::{NvmRegion, NvmSegment};
use shard::CacheShard;

/// Default shard count for multi-shard caches
pub const DEFAULT_NUM_SHARDS: usize = 16;

/// How a shard chooses eviction victims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// Evict the least recently used entry; lookups refresh recency.
    #[default]
    Lru,
    /// Evict in insertion order; lookups do not reorder.
    Fifo,
}

/// Where entry buffers live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemoryType {
    #[default]
    Dram,
    Nvm,
}

/// Caller's expectation for a lookup; drives metrics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupExpectation {
    ExpectInCache,
    NoExpectation,
}

/// Block cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockCacheConfig {
    /// Upper bound on total charge (soft under pin pressure)
    pub capacity_bytes: usize,
    /// Number of independent shards (>= 1)
    pub num_shards: usize,
    pub policy: EvictionPolicy,
    pub memory_type: MemoryType,
    /// Directory for the NVM region (required for `MemoryType::Nvm`)
    pub nvm_path: Option<PathBuf>,
}

impl BlockCacheConfig {
    /// Create a config with the given capacity and default settings.
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            num_shards: DEFAULT_NUM_SHARDS,
            policy: EvictionPolicy::default(),
            memory_type: MemoryType::default(),
            nvm_path: None,
        }
    }

    /// Set the shard count
    pub fn shards(mut self, num_shards: usize) -> Self {
        self.num_shards = num_shards;
        self
    }

    /// Collapse to one shard (used by tests for deterministic eviction)
    pub fn single_shard(self) -> Self {
        self.shards(1)
    }

    /// Set the eviction policy
    pub fn policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Keep entry buffers in a persistent-memory file under `path`
    pub fn nvm(mut self, path: impl Into<PathBuf>) -> Self {
        self.memory_type = MemoryType::Nvm;
        self.nvm_path = Some(path.into());
        self
    }
}

/// Invoked with the original key and value bytes when an entry leaves
/// the cache for good: after eviction or erase, once the last handle has
/// dropped. No shard lock is held during the call; the callback must not
/// re-enter the cache for the same key.
pub trait EvictionCallback: Send + Sync {
    fn evicted(&self, key: &[u8], value: &[u8]);
}

/// Entry value storage
pub(crate) enum ValueBuf {
    Dram(Box<[u8]>),
    Nvm(NvmSegment),
}

impl ValueBuf {
    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            ValueBuf::Dram(b) => b,
            ValueBuf::Nvm(s) => s.as_slice(),
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            ValueBuf::Dram(b) => b,
            ValueBuf::Nvm(s) => s.as_mut_slice(),
        }
    }
}

/// Key, value and charge of one entry. Immutable once published.
pub(crate) struct EntryData {
    pub(crate) key: Box<[u8]>,
    pub(crate) value: ValueBuf,
    pub(crate) charge: usize,
}

/// A reserved, writable entry that is not yet visible to lookups.
///
/// Fill the value buffer, then pass it to [`BlockCache::insert`].
pub struct PendingEntry {
    data: EntryData,
    hash: u64,
    shard_idx: usize,
}

impl PendingEntry {
    /// Entry key
    pub fn key(&self) -> &[u8] {
        &self.data.key
    }

    /// Writable value buffer
    pub fn value_mut(&mut self) -> &mut [u8] {
        self.data.value.as_mut_slice()
    }
}

impl fmt::Debug for PendingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingEntry")
            .field("key_len", &self.data.key.len())
            .field("charge", &self.data.charge)
            .finish()
    }
}

/// A pinned reference to a cache entry.
///
/// The entry cannot be freed while the handle lives; dropping the last
/// handle of an erased or evicted entry runs its eviction callback and
/// releases the memory.
pub struct CacheHandle {
    shard: Arc<CacheShard>,
    slot: u32,
    data: Arc<EntryData>,
}

impl CacheHandle {
    /// Entry key
    pub fn key(&self) -> &[u8] {
        &self.data.key
    }

    /// Entry value
    pub fn value(&self) -> &[u8] {
        self.data.value.as_slice()
    }
}

impl Drop for CacheHandle {
    fn drop(&mut self) {
        self.shard.release(self.slot);
    }
}

impl fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHandle")
            .field("key_len", &self.data.key.len())
            .field("charge", &self.data.charge)
            .finish()
    }
}

/// Controls bulk invalidation.
///
/// `validity` decides per entry (given key and value bytes) whether it
/// stays; `iteration` is consulted with the running valid/invalid counts
/// before each entry is examined and stops the sweep when it returns
/// `false`. Defaults: every entry is invalid, never stop early.
pub struct InvalidationControl {
    pub(crate) validity: Box<dyn Fn(&[u8], &[u8]) -> bool + Send + Sync>,
    pub(crate) iteration: Box<dyn Fn(usize, usize) -> bool + Send + Sync>,
}

impl InvalidationControl {
    pub fn new(
        validity: impl Fn(&[u8], &[u8]) -> bool + Send + Sync + 'static,
        iteration: impl Fn(usize, usize) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            validity: Box::new(validity),
            iteration: Box::new(iteration),
        }
    }

    /// Invalidate entries failing `validity`, visiting all of them.
    pub fn with_validity(
        validity: impl Fn(&[u8], &[u8]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(validity, |_, _| true)
    }
}

impl Default for InvalidationControl {
    fn default() -> Self {
        Self::new(|_, _| false, |_, _| true)
    }
}

/// Thread-safe sharded key/value cache with pinned handles.
pub struct BlockCache {
    shards: Vec<Arc<CacheShard>>,
    hasher: RandomState,
    metrics: Arc<CacheMetrics>,
    mem_tracker: Option<Arc<MemTracker>>,
    nvm: Option<Arc<NvmRegion>>,
    per_shard_capacity: usize,
}

impl BlockCache {
    /// Build a cache from its configuration.
    pub fn new(config: BlockCacheConfig) -> Result<Self> {
        if config.num_shards == 0 {
            return Err(Error::InvalidArgument(
                "cache must have at least one shard".to_string(),
            ));
        }
        let (mem_tracker, nvm) = match config.memory_type {
            MemoryType::Dram => (Some(Arc::new(MemTracker::new("block_cache"))), None),
            MemoryType::Nvm => {
                if config.policy == EvictionPolicy::Fifo {
                    return Err(Error::InvalidArgument(
                        "FIFO eviction requires a DRAM cache".to_string(),
                    ));
                }
                let path = config.nvm_path.as_ref().ok_or_else(|| {
                    Error::InvalidArgument("NVM cache requires nvm_path".to_string())
                })?;
                // The NVM variant tracks no memory: its buffers live in
                // the mapped file, not on the heap.
                (None, Some(NvmRegion::create(path, config.capacity_bytes)?))
            }
        };
        let per_shard_capacity = (config.capacity_bytes / config.num_shards).max(1);
        let metrics = Arc::new(CacheMetrics::default());
        let shards = (0..config.num_shards)
            .map(|_| {
                Arc::new(CacheShard::new(
                    config.policy,
                    per_shard_capacity,
                    Arc::clone(&metrics),
                    mem_tracker.clone(),
                ))
            })
            .collect();
        log::info!(
            "block cache: policy={:?} memory={:?} shards={} capacity={} bytes",
            config.policy,
            config.memory_type,
            config.num_shards,
            config.capacity_bytes
        );
        Ok(Self {
            shards,
            hasher: RandomState::new(),
            metrics,
            mem_tracker,
            nvm,
            per_shard_capacity,
        })
    }

    /// Reserve capacity for an entry and hand back its writable buffer.
    ///
    /// Returns `None` when the value size or charge exceeds what a single
    /// shard can hold, or when the NVM region cannot serve the
    /// allocation. The entry is not visible until [`insert`].
    ///
    /// [`insert`]: BlockCache::insert
    pub fn allocate(&self, key: &[u8], value_len: usize, charge: usize) -> Option<PendingEntry> {
        if charge.max(value_len) > self.per_shard_capacity {
            return None;
        }
        let hash = self.hash_key(key);
        let shard_idx = (hash % self.shards.len() as u64) as usize;
        let value = match &self.nvm {
            Some(region) => ValueBuf::Nvm(NvmRegion::allocate(region, value_len)?),
            None => ValueBuf::Dram(vec![0u8; value_len].into_boxed_slice()),
        };
        Some(PendingEntry {
            data: EntryData {
                key: key.into(),
                value,
                charge,
            },
            hash,
            shard_idx,
        })
    }

    /// Publish an allocated entry, superseding any previous entry with
    /// the same key, and return a pinned handle to it. May evict unpinned
    /// entries to stay within capacity.
    pub fn insert(
        &self,
        pending: PendingEntry,
        callback: Option<Arc<dyn EvictionCallback>>,
    ) -> CacheHandle {
        let PendingEntry {
            data,
            hash,
            shard_idx,
        } = pending;
        let data = Arc::new(data);
        if let Some(tracker) = &self.mem_tracker {
            tracker.consume(data.charge as i64);
        }
        let shard = &self.shards[shard_idx];
        let slot = shard.insert(Arc::clone(&data), hash, callback);
        CacheHandle {
            shard: Arc::clone(shard),
            slot,
            data,
        }
    }

    /// Find and pin an entry.
    pub fn lookup(&self, key: &[u8], expectation: LookupExpectation) -> Option<CacheHandle> {
        let hash = self.hash_key(key);
        let shard = &self.shards[(hash % self.shards.len() as u64) as usize];
        let found = shard.lookup(key, hash);
        self.metrics
            .record_lookup(found.is_some(), expectation == LookupExpectation::ExpectInCache);
        found.map(|(slot, data)| CacheHandle {
            shard: Arc::clone(shard),
            slot,
            data,
        })
    }

    /// Hide an entry from future lookups. Its callback fires and its
    /// memory is released once the last outstanding handle drops.
    pub fn erase(&self, key: &[u8]) {
        let hash = self.hash_key(key);
        self.shards[(hash % self.shards.len() as u64) as usize].erase(key, hash);
    }

    /// Bulk-remove entries under caller control; see
    /// [`InvalidationControl`]. Returns the number of invalidated
    /// entries across all shards.
    pub fn invalidate(&self, ctl: InvalidationControl) -> usize {
        let mut count = 0;
        for shard in &self.shards {
            count += shard.invalidate(&ctl);
        }
        log::debug!("invalidated {count} block cache entries");
        count
    }

    /// Total charge of in-cache entries
    pub fn usage(&self) -> usize {
        self.shards.iter().map(|s| s.usage()).sum()
    }

    /// Cache counters
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Memory tracker (DRAM caches only)
    pub fn mem_tracker(&self) -> Option<&Arc<MemTracker>> {
        self.mem_tracker.as_ref()
    }

    fn hash_key(&self, key: &[u8]) -> u64 {
        self.hasher.hash_one(key)
    }
}
