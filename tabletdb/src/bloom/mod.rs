//! Split block Bloom filter
//!
//! A space-efficient probabilistic set over 32-bit hashes. The filter is
//! split into 32-byte buckets of eight 32-bit words; an element sets one
//! bit in each word of a single bucket, so an insert or query touches one
//! cache line. Compared with a standard Bloom filter of the same size the
//! false positive probability is approximately equal while requiring
//! 5 * 8 = 40 random bits per key instead of 64.

mod probe;

pub use probe::{BloomFilterSpec, BloomKeyProbe, HashAlgorithm};

use once_cell::sync::Lazy;

use crate::util::hash::rehash32;
use crate::{Error, Result};

/// Number of 32-bit words per bucket
pub(crate) const BUCKET_WORDS: usize = 8;

/// log2 of the bucket byte size (32 bytes)
pub(crate) const LOG_BUCKET_BYTE_SIZE: u32 = 5;

/// log2 of the number of bits in a bucket word (32 bits)
const LOG_BUCKET_WORD_BITS: u32 = 5;

/// Per-lane odd multipliers. Each lane rehashes the inserted hash with its
/// own multiplier and keeps the top five bits to pick one of the 32 bit
/// positions in that lane's word. Insert and query must use the same table.
pub(crate) const REHASH: [u32; BUCKET_WORDS] = [
    0x47b6137b, 0x44974d91, 0x8824ad5b, 0xa2b7289d, 0x705495c7, 0x2df1424b, 0x9efc4947,
    0x5c6bfb31,
];

/// One 32-byte bucket: eight 32-bit words, cache-line friendly.
#[repr(C, align(32))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bucket(pub(crate) [u32; BUCKET_WORDS]);

/// Directory memory provider for [`BlockBloomFilter`].
///
/// The directory must come back zeroed. Dropping the filter releases the
/// directory exactly once through normal ownership.
pub trait BufferAllocator: Send + Sync {
    /// Allocate a zeroed directory of `num_buckets` buckets.
    fn allocate(&self, num_buckets: usize) -> Result<Box<[Bucket]>>;
}

/// Heap-backed directory allocator
#[derive(Debug, Default)]
pub struct DefaultBufferAllocator;

impl BufferAllocator for DefaultBufferAllocator {
    fn allocate(&self, num_buckets: usize) -> Result<Box<[Bucket]>> {
        let mut directory: Vec<Bucket> = Vec::new();
        directory
            .try_reserve_exact(num_buckets)
            .map_err(|e| Error::RuntimeError(format!("bloom directory allocation failed: {e}")))?;
        directory.resize(num_buckets, Bucket::default());
        Ok(directory.into_boxed_slice())
    }
}

static DEFAULT_ALLOCATOR: Lazy<DefaultBufferAllocator> = Lazy::new(DefaultBufferAllocator::default);

/// Split block Bloom filter over 32-bit hashes.
///
/// `log_space_bytes` fixes the directory at `2^log_space_bytes` bytes,
/// i.e. `2^(log_space_bytes - 5)` buckets (at least one).
pub struct BlockBloomFilter {
    directory: Box<[Bucket]>,
    log_num_buckets: u32,
    directory_mask: u32,
    always_false: bool,
}

impl BlockBloomFilter {
    /// Create a filter of `2^log_space_bytes` bytes using the default
    /// heap allocator.
    pub fn new(log_space_bytes: u32) -> Result<Self> {
        Self::with_allocator(log_space_bytes, &*DEFAULT_ALLOCATOR)
    }

    /// Create a filter with a caller-provided directory allocator.
    pub fn with_allocator(log_space_bytes: u32, allocator: &dyn BufferAllocator) -> Result<Self> {
        let log_num_buckets = log_space_bytes.saturating_sub(LOG_BUCKET_BYTE_SIZE).max(1);
        // Insert() and Find() take 32-bit hashes, so the bucket index must
        // fit in 32 bits.
        if log_num_buckets > 32 {
            return Err(Error::InvalidArgument(format!(
                "Bloom filter too large. log_space_bytes: {log_space_bytes}"
            )));
        }
        let directory_mask = ((1u64 << log_num_buckets) - 1) as u32;
        let directory = allocator.allocate(1usize << log_num_buckets)?;
        Ok(Self {
            directory,
            log_num_buckets,
            directory_mask,
            always_false: true,
        })
    }

    /// Insert a 32-bit hash.
    pub fn insert(&mut self, hash: u32) {
        self.always_false = false;
        let bucket_idx = rehash32(hash) & self.directory_mask;
        self.bucket_insert(bucket_idx, hash);
    }

    /// Query a 32-bit hash. Never returns a false negative.
    pub fn find(&self, hash: u32) -> bool {
        if self.always_false {
            return false;
        }
        let bucket_idx = rehash32(hash) & self.directory_mask;
        self.bucket_find(bucket_idx, hash)
    }

    /// Whether no element has been inserted yet
    #[inline]
    pub fn always_false(&self) -> bool {
        self.always_false
    }

    /// Number of buckets in the directory
    #[inline]
    pub fn num_buckets(&self) -> usize {
        self.directory.len()
    }

    /// Directory size in bytes
    #[inline]
    pub fn space_bytes(&self) -> usize {
        self.directory.len() << LOG_BUCKET_BYTE_SIZE
    }

    /// Raw directory bytes, suitable for shipping the filter or backing a
    /// [`BloomFilterSpec`] view over it.
    pub fn directory_bytes(&self) -> &[u8] {
        // SAFETY: Bucket is a repr(C) array of u32 with no padding; the
        // directory is a single contiguous allocation of
        // `len * size_of::<Bucket>()` bytes.
        unsafe {
            std::slice::from_raw_parts(
                self.directory.as_ptr() as *const u8,
                self.directory.len() * std::mem::size_of::<Bucket>(),
            )
        }
    }

    /// A borrowed predicate-side view of this filter.
    pub fn as_spec(&self, algorithm: HashAlgorithm) -> BloomFilterSpec<'_> {
        BloomFilterSpec::new(self.directory_bytes(), BUCKET_WORDS as u32, algorithm)
            .expect("directory is a valid spec by construction")
    }

    fn bucket_insert(&mut self, bucket_idx: u32, hash: u32) {
        let bucket = &mut self.directory[bucket_idx as usize].0;
        for (i, word) in bucket.iter_mut().enumerate() {
            let bit = REHASH[i].wrapping_mul(hash) >> (32 - LOG_BUCKET_WORD_BITS);
            *word |= 1u32 << bit;
        }
    }

    fn bucket_find(&self, bucket_idx: u32, hash: u32) -> bool {
        let bucket = &self.directory[bucket_idx as usize].0;
        for (i, word) in bucket.iter().enumerate() {
            let bit = REHASH[i].wrapping_mul(hash) >> (32 - LOG_BUCKET_WORD_BITS);
            if word & (1u32 << bit) == 0 {
                return false;
            }
        }
        true
    }

    // The sizing formulas below derive from
    //
    //   fpp = (1 - e^(-BUCKET_WORDS * ndv / m))^BUCKET_WORDS
    //
    // where m is the directory size in bits.

    /// Largest number of distinct values a `2^log_space_bytes`-byte filter
    /// can hold while keeping the expected false positive probability
    /// below `fpp`.
    pub fn max_ndv(log_space_bytes: u32, fpp: f64) -> usize {
        debug_assert!(log_space_bytes < 61);
        debug_assert!(fpp > 0.0 && fpp < 1.0);
        let ik = 1.0 / BUCKET_WORDS as f64;
        let bits = (1u64 << (log_space_bytes + 3)) as f64;
        (-ik * bits * (1.0 - fpp.powf(ik)).ln()) as usize
    }

    /// Smallest `log_space_bytes` that keeps the expected false positive
    /// probability below `fpp` for `ndv` distinct values.
    pub fn min_log_space(ndv: usize, fpp: f64) -> u32 {
        if ndv == 0 {
            return 0;
        }
        let k = BUCKET_WORDS as f64;
        // Number of bits needed to reach the requested fpp.
        let m = -k * ndv as f64 / (1.0 - fpp.powf(1.0 / k)).ln();
        let log_space = (m / 8.0).log2().ceil();
        if log_space < 0.0 {
            0
        } else {
            log_space as u32
        }
    }

    /// Expected false positive probability for `ndv` distinct values in a
    /// `2^log_space_bytes`-byte filter.
    pub fn false_positive_prob(ndv: usize, log_space_bytes: u32) -> f64 {
        let k = BUCKET_WORDS as f64;
        let bits = (1u64 << (log_space_bytes + 3)) as f64;
        (1.0 - (-k * ndv as f64 / bits).exp()).powf(k)
    }
}

impl std::fmt::Debug for BlockBloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockBloomFilter")
            .field("log_num_buckets", &self.log_num_buckets)
            .field("always_false", &self.always_false)
            .finish()
    }
}
