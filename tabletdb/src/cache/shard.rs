//! One cache shard
//!
//! A shard owns a chained hash table (digest to slot chain with full-key
//! comparison), a slab of entries whose recency list is index-linked
//! through the slab, and a usage counter, all behind one mutex. Eviction
//! callbacks, entry frees and memory-tracker releases run after the lock
//! is dropped.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::util::MemTracker;

use super::metrics::CacheMetrics;
use super::{EntryData, EvictionCallback, EvictionPolicy, InvalidationControl};

struct Entry {
    data: Arc<EntryData>,
    hash: u64,
    /// Outstanding handles pinning this entry
    refs: u32,
    /// Whether the entry is still visible to lookups
    in_cache: bool,
    callback: Option<Arc<dyn EvictionCallback>>,
    prev: Option<u32>,
    next: Option<u32>,
}

/// An entry detached from the cache whose teardown runs after unlock.
struct Freed {
    data: Arc<EntryData>,
    callback: Option<Arc<dyn EvictionCallback>>,
}

struct ShardState {
    slab: Vec<Option<Entry>>,
    free_slots: Vec<u32>,
    /// digest -> chain of occupied slots
    table: AHashMap<u64, Vec<u32>>,
    /// Most recently used (or inserted) end
    head: Option<u32>,
    /// Cold end: eviction candidates come from here
    tail: Option<u32>,
    /// Total charge of in-cache entries
    usage: usize,
}

impl ShardState {
    fn find(&self, hash: u64, key: &[u8]) -> Option<u32> {
        let chain = self.table.get(&hash)?;
        chain.iter().copied().find(|&slot| {
            self.slab[slot as usize]
                .as_ref()
                .map_or(false, |e| e.data.key.as_ref() == key)
        })
    }

    fn add_entry(&mut self, entry: Entry) -> u32 {
        if let Some(slot) = self.free_slots.pop() {
            self.slab[slot as usize] = Some(entry);
            slot
        } else {
            let slot = self.slab.len() as u32;
            self.slab.push(Some(entry));
            slot
        }
    }

    /// Release an entry's slot; the entry must already be detached and
    /// unpinned.
    fn take_entry(&mut self, slot: u32) -> Option<Freed> {
        let entry = self.slab[slot as usize].take()?;
        debug_assert_eq!(entry.refs, 0);
        debug_assert!(!entry.in_cache);
        self.free_slots.push(slot);
        Some(Freed {
            data: entry.data,
            callback: entry.callback,
        })
    }

    /// Remove an entry from the table and recency list. Pinned entries
    /// stay in their slot until the last handle drops.
    fn detach(&mut self, slot: u32) {
        let (hash, charge) = match &self.slab[slot as usize] {
            Some(e) => (e.hash, e.data.charge),
            None => return,
        };
        if let Some(chain) = self.table.get_mut(&hash) {
            chain.retain(|&s| s != slot);
            if chain.is_empty() {
                self.table.remove(&hash);
            }
        }
        self.unlink(slot);
        self.usage = self.usage.saturating_sub(charge);
        if let Some(e) = &mut self.slab[slot as usize] {
            e.in_cache = false;
        }
    }

    fn push_head(&mut self, slot: u32) {
        if let Some(e) = &mut self.slab[slot as usize] {
            e.prev = None;
            e.next = self.head;
        }
        if let Some(old_head) = self.head {
            if let Some(e) = &mut self.slab[old_head as usize] {
                e.prev = Some(slot);
            }
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn unlink(&mut self, slot: u32) {
        let (prev, next) = match &self.slab[slot as usize] {
            Some(e) => (e.prev, e.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(e) = &mut self.slab[p as usize] {
                    e.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(e) = &mut self.slab[n as usize] {
                    e.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(e) = &mut self.slab[slot as usize] {
            e.prev = None;
            e.next = None;
        }
    }

    fn move_to_head(&mut self, slot: u32) {
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.push_head(slot);
    }

    fn refs_of(&self, slot: u32) -> u32 {
        self.slab[slot as usize].as_ref().map_or(0, |e| e.refs)
    }

    fn prev_of(&self, slot: u32) -> Option<u32> {
        self.slab[slot as usize].as_ref().and_then(|e| e.prev)
    }
}

pub(crate) struct CacheShard {
    state: Mutex<ShardState>,
    policy: EvictionPolicy,
    capacity: usize,
    metrics: Arc<CacheMetrics>,
    mem_tracker: Option<Arc<MemTracker>>,
}

impl CacheShard {
    pub(crate) fn new(
        policy: EvictionPolicy,
        capacity: usize,
        metrics: Arc<CacheMetrics>,
        mem_tracker: Option<Arc<MemTracker>>,
    ) -> Self {
        Self {
            state: Mutex::new(ShardState {
                slab: Vec::new(),
                free_slots: Vec::new(),
                table: AHashMap::new(),
                head: None,
                tail: None,
                usage: 0,
            }),
            policy,
            capacity,
            metrics,
            mem_tracker,
        }
    }

    /// Publish an entry, superseding any previous entry with the same key
    /// and evicting unpinned cold entries while over capacity. Returns
    /// the slot of the new entry, already pinned once for the caller's
    /// handle.
    pub(crate) fn insert(
        &self,
        data: Arc<EntryData>,
        hash: u64,
        callback: Option<Arc<dyn EvictionCallback>>,
    ) -> u32 {
        let mut freed = Vec::new();
        let mut usage_delta = data.charge as i64;
        let mut evictions = 0u64;
        let mut pinned_skipped = 0u64;
        let slot;
        {
            let mut state = self.state.lock();
            if let Some(old_slot) = state.find(hash, &data.key) {
                let old_charge = self.charge_of(&state, old_slot);
                state.detach(old_slot);
                usage_delta -= old_charge as i64;
                if state.refs_of(old_slot) == 0 {
                    if let Some(f) = state.take_entry(old_slot) {
                        freed.push(f);
                    }
                }
            }

            slot = state.add_entry(Entry {
                data: Arc::clone(&data),
                hash,
                refs: 1,
                in_cache: true,
                callback,
                prev: None,
                next: None,
            });
            state.table.entry(hash).or_default().push(slot);
            state.push_head(slot);
            state.usage += data.charge;

            // Walk from the cold end; pinned entries are skipped, so the
            // capacity bound is soft under pin pressure.
            let mut cursor = state.tail;
            while state.usage > self.capacity {
                let Some(victim) = cursor else { break };
                cursor = state.prev_of(victim);
                if victim == slot {
                    continue;
                }
                if state.refs_of(victim) > 0 {
                    pinned_skipped += 1;
                    continue;
                }
                let victim_charge = self.charge_of(&state, victim);
                state.detach(victim);
                usage_delta -= victim_charge as i64;
                evictions += 1;
                if let Some(f) = state.take_entry(victim) {
                    freed.push(f);
                }
            }
        }
        self.metrics.record_insert();
        self.metrics.add_usage(usage_delta);
        for _ in 0..evictions {
            self.metrics.record_eviction();
        }
        for _ in 0..pinned_skipped {
            self.metrics.record_eviction_skipped_pinned();
        }
        self.finish_freed(freed);
        slot
    }

    /// Find and pin an entry. LRU promotes the entry to the recent end;
    /// FIFO leaves the order untouched.
    pub(crate) fn lookup(&self, key: &[u8], hash: u64) -> Option<(u32, Arc<EntryData>)> {
        let mut state = self.state.lock();
        let slot = state.find(hash, key)?;
        if self.policy == EvictionPolicy::Lru {
            state.move_to_head(slot);
        }
        let data = match &mut state.slab[slot as usize] {
            Some(e) => {
                e.refs += 1;
                Arc::clone(&e.data)
            }
            None => return None,
        };
        Some((slot, data))
    }

    /// Hide an entry from future lookups; it is freed when the last
    /// handle drops.
    pub(crate) fn erase(&self, key: &[u8], hash: u64) {
        let mut freed = None;
        let mut usage_delta = 0i64;
        {
            let mut state = self.state.lock();
            if let Some(slot) = state.find(hash, key) {
                usage_delta = -(self.charge_of(&state, slot) as i64);
                state.detach(slot);
                if state.refs_of(slot) == 0 {
                    freed = state.take_entry(slot);
                }
            }
        }
        self.metrics.add_usage(usage_delta);
        if let Some(f) = freed {
            self.finish_one(f);
        }
    }

    /// Unpin an entry; frees it if it was erased or evicted and this was
    /// the last handle.
    pub(crate) fn release(&self, slot: u32) {
        let mut freed = None;
        {
            let mut state = self.state.lock();
            let done = match &mut state.slab[slot as usize] {
                Some(e) => {
                    debug_assert!(e.refs > 0);
                    e.refs -= 1;
                    e.refs == 0 && !e.in_cache
                }
                None => false,
            };
            if done {
                freed = state.take_entry(slot);
            }
        }
        if let Some(f) = freed {
            self.finish_one(f);
        }
    }

    /// Walk entries from the cold end, erasing the ones the control's
    /// validity function rejects. The iteration function gates every step
    /// including the first, so a control that never advances invalidates
    /// nothing. Returns the number of invalidated entries.
    pub(crate) fn invalidate(&self, ctl: &InvalidationControl) -> usize {
        let mut freed = Vec::new();
        let mut usage_delta = 0i64;
        let mut valid = 0usize;
        let mut invalid = 0usize;
        {
            let mut state = self.state.lock();
            let mut cursor = state.tail;
            while let Some(slot) = cursor {
                if !(ctl.iteration)(valid, invalid) {
                    break;
                }
                cursor = state.prev_of(slot);
                let is_valid = match &state.slab[slot as usize] {
                    Some(e) => (ctl.validity)(&e.data.key, e.data.value.as_slice()),
                    None => continue,
                };
                if is_valid {
                    valid += 1;
                    continue;
                }
                invalid += 1;
                usage_delta -= self.charge_of(&state, slot) as i64;
                state.detach(slot);
                if state.refs_of(slot) == 0 {
                    if let Some(f) = state.take_entry(slot) {
                        freed.push(f);
                    }
                }
            }
        }
        self.metrics.add_usage(usage_delta);
        self.finish_freed(freed);
        invalid
    }

    /// Total charge of in-cache entries
    pub(crate) fn usage(&self) -> usize {
        self.state.lock().usage
    }

    fn charge_of(&self, state: &ShardState, slot: u32) -> usize {
        state.slab[slot as usize]
            .as_ref()
            .map_or(0, |e| e.data.charge)
    }

    fn finish_freed(&self, freed: Vec<Freed>) {
        for f in freed {
            self.finish_one(f);
        }
    }

    fn finish_one(&self, freed: Freed) {
        if let Some(tracker) = &self.mem_tracker {
            tracker.release(freed.data.charge as i64);
        }
        if let Some(callback) = &freed.callback {
            callback.evicted(&freed.data.key, freed.data.value.as_slice());
        }
    }
}

impl Drop for CacheShard {
    fn drop(&mut self) {
        // No handles can be alive here (each one holds an Arc to this
        // shard), so every remaining entry gets its callback now.
        let state = self.state.get_mut();
        let slots: Vec<u32> = (0..state.slab.len() as u32)
            .filter(|&s| state.slab[s as usize].is_some())
            .collect();
        for slot in slots {
            state.detach(slot);
            if let Some(entry) = state.slab[slot as usize].take() {
                if let Some(tracker) = &self.mem_tracker {
                    tracker.release(entry.data.charge as i64);
                }
                if let Some(callback) = &entry.callback {
                    callback.evicted(&entry.data.key, entry.data.value.as_slice());
                }
            }
        }
    }
}
