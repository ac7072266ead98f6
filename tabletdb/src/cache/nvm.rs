//! Persistent-memory entry storage
//!
//! The NVM cache variant keeps entry buffers in one file-backed mapping
//! instead of the process heap. A first-fit free-list allocator carves
//! the region into segments; each live segment is exclusively owned by
//! one cache entry.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use memmap2::MmapMut;
use parking_lot::Mutex;

use crate::{Error, Result};

/// Segment offsets are rounded up to this granularity.
const ALLOC_ALIGN: usize = 8;

/// A file-backed memory region serving entry buffers.
pub(crate) struct NvmRegion {
    base: *mut u8,
    /// Free extents as `(offset, len)`, sorted by offset, coalesced.
    free: Mutex<Vec<(usize, usize)>>,
    _map: MmapMut,
}

// SAFETY: `base` points into the mapping owned by `_map`, which lives as
// long as the region. Allocation metadata is guarded by the mutex, and
// the allocator hands out disjoint extents, so data races on segment
// bytes are impossible as long as each segment has one owner.
unsafe impl Send for NvmRegion {}
unsafe impl Sync for NvmRegion {}

impl NvmRegion {
    /// Create (or overwrite) the backing file inside `dir` and map it.
    pub(crate) fn create(dir: &Path, capacity: usize) -> Result<Arc<Self>> {
        let file_path = dir.join("block_cache.nvm");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)?;
        file.set_len(capacity as u64)?;
        // SAFETY: the file was just created and is not shared with any
        // other mapping in this process.
        let mut map = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| Error::RuntimeError(format!("failed to map NVM cache region: {e}")))?;
        let base = map.as_mut_ptr();
        log::info!(
            "mapped NVM cache region {} ({capacity} bytes)",
            file_path.display()
        );
        Ok(Arc::new(Self {
            base,
            free: Mutex::new(vec![(0, capacity)]),
            _map: map,
        }))
    }

    /// Allocate a segment of `len` bytes, or `None` when the region is
    /// too fragmented or full.
    pub(crate) fn allocate(region: &Arc<Self>, len: usize) -> Option<NvmSegment> {
        let size = len.max(1).next_multiple_of(ALLOC_ALIGN);
        let mut free = region.free.lock();
        let pos = free.iter().position(|&(_, extent_len)| extent_len >= size)?;
        let (offset, extent_len) = free[pos];
        if extent_len == size {
            free.remove(pos);
        } else {
            free[pos] = (offset + size, extent_len - size);
        }
        Some(NvmSegment {
            region: Arc::clone(region),
            offset,
            len,
            size,
        })
    }

    fn free_segment(&self, offset: usize, size: usize) {
        let mut free = self.free.lock();
        let pos = free.partition_point(|&(extent_offset, _)| extent_offset < offset);
        free.insert(pos, (offset, size));
        if pos + 1 < free.len() && free[pos].0 + free[pos].1 == free[pos + 1].0 {
            free[pos].1 += free[pos + 1].1;
            free.remove(pos + 1);
        }
        if pos > 0 && free[pos - 1].0 + free[pos - 1].1 == free[pos].0 {
            free[pos - 1].1 += free[pos].1;
            free.remove(pos);
        }
    }

    #[cfg(test)]
    fn free_extent_count(&self) -> usize {
        self.free.lock().len()
    }
}

/// An exclusively-owned byte range of an [`NvmRegion`].
///
/// Freed back to the region's free list on drop.
pub(crate) struct NvmSegment {
    region: Arc<NvmRegion>,
    offset: usize,
    len: usize,
    size: usize,
}

impl NvmSegment {
    pub(crate) fn as_slice(&self) -> &[u8] {
        // SAFETY: `[offset, offset + len)` lies inside the mapping and is
        // owned by this segment alone until drop returns it to the free
        // list.
        unsafe { std::slice::from_raw_parts(self.region.base.add(self.offset), self.len) }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees the only access.
        unsafe { std::slice::from_raw_parts_mut(self.region.base.add(self.offset), self.len) }
    }
}

impl Drop for NvmSegment {
    fn drop(&mut self) {
        self.region.free_segment(self.offset, self.size);
    }
}

impl std::fmt::Debug for NvmSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvmSegment")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}
