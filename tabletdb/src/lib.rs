//! TabletDB Row-Scan Filter Core
//!
//! The scan-side machinery of a columnar tablet storage engine:
//! typed column predicates with merge/simplify semantics, split block
//! Bloom filters, and the sharded block cache that fronts block reads.

pub mod bloom;
pub mod cache;
pub mod data;
pub mod scan;
pub mod util;

// Re-export main types
pub use bloom::{BlockBloomFilter, BloomFilterSpec, BloomKeyProbe, HashAlgorithm};
pub use cache::{
    BlockCache, BlockCacheConfig, CacheHandle, EvictionCallback, EvictionPolicy,
    InvalidationControl, LookupExpectation, MemoryType, PendingEntry,
};
pub use data::{ColumnBlock, ColumnSchema, Datum, PhysicalType, SelectionVector};
pub use scan::{selectivity_comparator, ColumnPredicate, PredicateKind};

/// Scan core error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("runtime error: {0}")]
    RuntimeError(String),

    #[error("corruption: {0}")]
    Corruption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
