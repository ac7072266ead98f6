//! Bloom key probes and borrowed filter views

use serde::{Deserialize, Serialize};

use crate::util::hash::{city_hash64, fast_hash64, murmur_hash2_64a, rehash32};
use crate::{Error, Result};

use super::{BUCKET_WORDS, LOG_BUCKET_BYTE_SIZE, REHASH};

/// Digest algorithm used to turn key bytes into a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    City,
    Fast,
    Murmur2,
}

/// A hashed key, ready to probe a Bloom filter.
///
/// The key bytes are hashed once with the chosen algorithm and the 64-bit
/// digest split into two 32-bit halves. `h1` (the low half) drives the
/// split-block insert and query paths; `h2` is the secondary half reserved
/// for double-hashing consumers of the same probe format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomKeyProbe {
    h1: u32,
    h2: u32,
}

impl BloomKeyProbe {
    /// Hash `key` with `algorithm` and split the digest.
    pub fn new(key: &[u8], algorithm: HashAlgorithm) -> Self {
        let h = match algorithm {
            HashAlgorithm::City => city_hash64(key),
            HashAlgorithm::Fast => fast_hash64(key, 0),
            HashAlgorithm::Murmur2 => murmur_hash2_64a(key, 0),
        };
        Self {
            h1: h as u32,
            h2: (h >> 32) as u32,
        }
    }

    /// Low half of the digest; feeds insert and query.
    #[inline]
    pub fn h1(&self) -> u32 {
        self.h1
    }

    /// High half of the digest.
    #[inline]
    pub fn h2(&self) -> u32 {
        self.h2
    }
}

/// A borrowed Bloom filter shipped with a scan.
///
/// The directory bytes are a split-block filter directory: a power-of-two
/// number of 32-byte buckets. `nhash` records the hash-round count the
/// producer declared for the filter; it participates in equality so two
/// specs differing only in rounds do not compare equal, but membership is
/// answered by the split-block probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomFilterSpec<'a> {
    data: &'a [u8],
    nhash: u32,
    algorithm: HashAlgorithm,
}

impl<'a> BloomFilterSpec<'a> {
    /// Create a view over `data`.
    ///
    /// `data` must be a power of two of at least 32 bytes;
    /// `nhash` must be in `1..=8`.
    pub fn new(data: &'a [u8], nhash: u32, algorithm: HashAlgorithm) -> Result<Self> {
        let min_len = 1usize << LOG_BUCKET_BYTE_SIZE;
        if data.len() < min_len || !data.len().is_power_of_two() {
            return Err(Error::InvalidArgument(format!(
                "bloom filter data must be a power of two of at least {min_len} bytes, got {}",
                data.len()
            )));
        }
        if nhash == 0 || nhash > BUCKET_WORDS as u32 {
            return Err(Error::InvalidArgument(format!(
                "bloom filter hash count must be in 1..={BUCKET_WORDS}, got {nhash}"
            )));
        }
        Ok(Self {
            data,
            nhash,
            algorithm,
        })
    }

    /// Directory bytes
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Declared hash-round count
    #[inline]
    pub fn nhash(&self) -> u32 {
        self.nhash
    }

    /// Digest algorithm a probe for this filter must use
    #[inline]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Whether the filter may contain the probed key.
    ///
    /// `false` means the key is definitely absent; `true` means it may be
    /// present (subject to the filter's false positive rate).
    pub fn may_contain(&self, probe: &BloomKeyProbe) -> bool {
        let num_buckets = (self.data.len() >> LOG_BUCKET_BYTE_SIZE) as u32;
        let mask = num_buckets - 1;
        let hash = probe.h1();
        let base = ((rehash32(hash) & mask) as usize) << LOG_BUCKET_BYTE_SIZE;
        for (i, rehash) in REHASH.iter().enumerate() {
            let off = base + i * 4;
            let word = u32::from_le_bytes(self.data[off..off + 4].try_into().unwrap());
            let bit = rehash.wrapping_mul(hash) >> 27;
            if word & (1u32 << bit) == 0 {
                return false;
            }
        }
        true
    }
}
