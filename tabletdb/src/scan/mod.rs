//! Scan-side filtering: column predicates and their ordering.

pub mod predicate;

pub use predicate::{selectivity_comparator, ColumnPredicate, PredicateKind};
