//! Column predicates
//!
//! A predicate filters one column of a scan. Predicates over the same
//! column merge into their conjunction, simplifying to a canonical form
//! along the way, and evaluate against a column block by clearing bits in
//! its selection vector.
//!
//! A predicate does not own the values it points at; the scan that built
//! it does, and must outlive every use.

use std::cmp::Ordering;
use std::fmt;

use bumpalo::Bump;

use crate::bloom::{BloomFilterSpec, BloomKeyProbe};
use crate::data::{BlockValues, ColumnBlock, ColumnSchema, Datum, SelectionVector};

/// The shape of a column predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    /// Matches no rows
    None,
    /// Matches rows equal to a known value
    Equality,
    /// Matches rows in `[lower, upper)`
    Range,
    /// Matches rows holding a value
    IsNotNull,
    /// Matches rows holding no value
    IsNull,
    /// Matches rows whose value appears in a sorted list
    InList,
    /// Matches rows whose value may appear in every attached Bloom filter
    InBloomFilter,
}

/// An immutable predicate over a single column.
///
/// Canonical form is maintained by every constructor and by [`merge`]:
/// an empty range is `None`, a one-value range or list is `Equality`, a
/// list is strictly increasing with no duplicates, and a Bloom predicate
/// carries at least one filter.
///
/// [`merge`]: ColumnPredicate::merge
#[derive(Debug, Clone)]
pub struct ColumnPredicate<'a> {
    kind: PredicateKind,
    column: ColumnSchema,
    /// Inclusive lower bound for `Range`/`InBloomFilter`, or the value for
    /// `Equality`.
    lower: Option<Datum<'a>>,
    /// Exclusive upper bound for `Range`/`InBloomFilter`.
    upper: Option<Datum<'a>>,
    /// Sorted distinct values for `InList`.
    values: Vec<Datum<'a>>,
    /// Filters for `InBloomFilter`.
    filters: Vec<BloomFilterSpec<'a>>,
}

impl<'a> ColumnPredicate<'a> {
    fn with_bounds(
        kind: PredicateKind,
        column: ColumnSchema,
        lower: Option<Datum<'a>>,
        upper: Option<Datum<'a>>,
    ) -> Self {
        Self {
            kind,
            column,
            lower,
            upper,
            values: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// The vacuous predicate: matches no rows.
    pub fn none(column: ColumnSchema) -> Self {
        Self::with_bounds(PredicateKind::None, column, None, None)
    }

    /// Equality to a known value.
    pub fn equality(column: ColumnSchema, value: Datum<'a>) -> Self {
        debug_assert!(value.matches_type(column.physical_type()));
        Self::with_bounds(PredicateKind::Equality, column, Some(value), None)
    }

    /// Range with inclusive lower and exclusive upper bound.
    ///
    /// At least one bound must be present. Simplifies to `Equality` when
    /// the range covers exactly one value and to `None` when it is empty.
    pub fn range(
        column: ColumnSchema,
        lower: Option<Datum<'a>>,
        upper: Option<Datum<'a>>,
    ) -> Self {
        debug_assert!(lower.is_some() || upper.is_some());
        debug_assert!(lower.map_or(true, |v| v.matches_type(column.physical_type())));
        debug_assert!(upper.map_or(true, |v| v.matches_type(column.physical_type())));
        let mut pred = Self::with_bounds(PredicateKind::Range, column, lower, upper);
        pred.simplify();
        pred
    }

    /// Range with inclusive lower and inclusive upper bound.
    ///
    /// The upper bound is normalized to exclusive by incrementing it in
    /// the column's type, with the arena holding any bytes the increment
    /// allocates. An upper bound at the type's maximum is dropped.
    /// Returns `None` when the normalized range covers the whole domain.
    pub fn inclusive_range(
        column: ColumnSchema,
        lower: Option<Datum<'a>>,
        upper: Option<Datum<'a>>,
        arena: &'a Bump,
    ) -> Option<Self> {
        let upper = upper.and_then(|u| u.successor(arena));
        if lower.is_none() && upper.is_none() {
            return None;
        }
        Some(Self::range(column, lower, upper))
    }

    /// Range with exclusive lower and exclusive upper bound.
    ///
    /// The lower bound is normalized to inclusive by incrementing it; a
    /// lower bound at the type's maximum leaves nothing to match.
    pub fn exclusive_range(
        column: ColumnSchema,
        lower: Option<Datum<'a>>,
        upper: Option<Datum<'a>>,
        arena: &'a Bump,
    ) -> Self {
        let lower = match lower {
            Some(lo) => match lo.successor(arena) {
                Some(s) => Some(s),
                None => return Self::none(column),
            },
            None => None,
        };
        Self::range(column, lower, upper)
    }

    /// IS NOT NULL.
    pub fn is_not_null(column: ColumnSchema) -> Self {
        Self::with_bounds(PredicateKind::IsNotNull, column, None, None)
    }

    /// IS NULL. On a non-nullable column no row can match, so this
    /// simplifies to `None`.
    pub fn is_null(column: ColumnSchema) -> Self {
        if column.is_nullable() {
            Self::with_bounds(PredicateKind::IsNull, column, None, None)
        } else {
            Self::none(column)
        }
    }

    /// Membership in a value list.
    ///
    /// The values are sorted and deduplicated; zero values simplify to
    /// `None` and one value to `Equality`.
    pub fn in_list(column: ColumnSchema, mut values: Vec<Datum<'a>>) -> Self {
        debug_assert!(values
            .iter()
            .all(|v| v.matches_type(column.physical_type())));
        values.sort_unstable_by(|a, b| a.compare(b));
        values.dedup_by(|a, b| a.compare(b) == Ordering::Equal);
        let mut pred = Self {
            kind: PredicateKind::InList,
            column,
            lower: None,
            upper: None,
            values,
            filters: Vec::new(),
        };
        pred.simplify();
        pred
    }

    /// Membership in every one of a set of Bloom filters, optionally
    /// narrowed by exclusive-upper range bounds.
    pub fn in_bloom_filter(
        column: ColumnSchema,
        filters: Vec<BloomFilterSpec<'a>>,
        lower: Option<Datum<'a>>,
        upper: Option<Datum<'a>>,
    ) -> Self {
        if filters.is_empty() {
            // Nothing to consult: degrade to the bounds, or to the
            // tautology when there are none.
            return if lower.is_some() || upper.is_some() {
                Self::range(column, lower, upper)
            } else {
                Self::is_not_null(column)
            };
        }
        let mut pred = Self {
            kind: PredicateKind::InBloomFilter,
            column,
            lower,
            upper,
            values: Vec::new(),
            filters,
        };
        pred.simplify();
        pred
    }

    /// Predicate kind
    #[inline]
    pub fn kind(&self) -> PredicateKind {
        self.kind
    }

    /// Column this predicate applies to
    #[inline]
    pub fn column(&self) -> &ColumnSchema {
        &self.column
    }

    /// Equality value or inclusive lower bound
    #[inline]
    pub fn raw_lower(&self) -> Option<&Datum<'a>> {
        self.lower.as_ref()
    }

    /// Exclusive upper bound
    #[inline]
    pub fn raw_upper(&self) -> Option<&Datum<'a>> {
        self.upper.as_ref()
    }

    /// Sorted distinct list values (`InList` only)
    #[inline]
    pub fn raw_values(&self) -> &[Datum<'a>] {
        &self.values
    }

    /// Attached Bloom filters (`InBloomFilter` only)
    #[inline]
    pub fn bloom_filters(&self) -> &[BloomFilterSpec<'a>] {
        &self.filters
    }

    // ---- Merge ----

    /// Merge another predicate over the same column into this one.
    ///
    /// Afterwards this predicate is the logical AND of the two original
    /// predicates, in canonical form. No value bytes are copied; the
    /// merged predicate borrows from both sources.
    pub fn merge(&mut self, other: &ColumnPredicate<'a>) {
        debug_assert_eq!(
            self.column, other.column,
            "merging predicates over different columns"
        );
        match self.kind {
            PredicateKind::None => {}
            PredicateKind::Equality => self.merge_into_equality(other),
            PredicateKind::Range => self.merge_into_range(other),
            PredicateKind::IsNotNull => self.merge_into_is_not_null(other),
            PredicateKind::IsNull => self.merge_into_is_null(other),
            PredicateKind::InList => self.merge_into_in_list(other),
            PredicateKind::InBloomFilter => self.merge_into_bloom(other),
        }
    }

    fn merge_into_equality(&mut self, other: &ColumnPredicate<'a>) {
        let Some(value) = self.lower else {
            debug_assert!(false, "equality predicate without a value");
            return self.set_to_none();
        };
        match other.kind {
            PredicateKind::None | PredicateKind::IsNull => self.set_to_none(),
            PredicateKind::IsNotNull => {}
            PredicateKind::Equality => {
                if let Some(other_value) = other.lower {
                    if value.compare(&other_value) != Ordering::Equal {
                        self.set_to_none();
                    }
                }
            }
            PredicateKind::Range => {
                if !other.value_in_range(&value) {
                    self.set_to_none();
                }
            }
            PredicateKind::InList => {
                if !other.value_in_list(&value) {
                    self.set_to_none();
                }
            }
            PredicateKind::InBloomFilter => {
                // A value rejected by any filter cannot match. A value
                // that passes stays an equality; the filters add nothing
                // on top of an exact value.
                if !other.value_passes_filters(&value) {
                    self.set_to_none();
                }
            }
        }
    }

    fn merge_into_range(&mut self, other: &ColumnPredicate<'a>) {
        match other.kind {
            PredicateKind::None | PredicateKind::IsNull => self.set_to_none(),
            PredicateKind::IsNotNull => {}
            PredicateKind::Equality => {
                if let Some(value) = other.lower {
                    if self.value_in_range(&value) {
                        self.kind = PredicateKind::Equality;
                        self.lower = Some(value);
                        self.upper = None;
                    } else {
                        self.set_to_none();
                    }
                }
            }
            PredicateKind::Range => {
                self.intersect_bounds(other.lower, other.upper);
                self.simplify();
            }
            PredicateKind::InList => {
                let values: Vec<Datum<'a>> = other
                    .values
                    .iter()
                    .copied()
                    .filter(|v| self.value_in_range(v))
                    .collect();
                self.kind = PredicateKind::InList;
                self.lower = None;
                self.upper = None;
                self.values = values;
                self.simplify();
            }
            PredicateKind::InBloomFilter => {
                self.kind = PredicateKind::InBloomFilter;
                self.filters = other.filters.clone();
                self.intersect_bounds(other.lower, other.upper);
                self.simplify();
            }
        }
    }

    fn merge_into_is_not_null(&mut self, other: &ColumnPredicate<'a>) {
        match other.kind {
            PredicateKind::None | PredicateKind::IsNull => self.set_to_none(),
            // IS NOT NULL is implied by any value-matching predicate.
            _ => *self = other.clone(),
        }
    }

    fn merge_into_is_null(&mut self, other: &ColumnPredicate<'a>) {
        match other.kind {
            PredicateKind::IsNull => {}
            _ => self.set_to_none(),
        }
    }

    fn merge_into_in_list(&mut self, other: &ColumnPredicate<'a>) {
        match other.kind {
            PredicateKind::None | PredicateKind::IsNull => self.set_to_none(),
            PredicateKind::IsNotNull => {}
            PredicateKind::Equality => {
                if let Some(value) = other.lower {
                    if self.value_in_list(&value) {
                        self.kind = PredicateKind::Equality;
                        self.lower = Some(value);
                        self.values.clear();
                    } else {
                        self.set_to_none();
                    }
                }
            }
            PredicateKind::Range => {
                self.values.retain(|v| other.value_in_range(v));
                self.simplify();
            }
            PredicateKind::InList => {
                self.values.retain(|v| other.value_in_list(v));
                self.simplify();
            }
            PredicateKind::InBloomFilter => {
                // A list value the filters reject cannot match, so the
                // filters shrink the list instead of piling on top of it.
                self.values.retain(|v| other.value_passes_filters(v));
                self.simplify();
            }
        }
    }

    fn merge_into_bloom(&mut self, other: &ColumnPredicate<'a>) {
        match other.kind {
            PredicateKind::None | PredicateKind::IsNull => self.set_to_none(),
            PredicateKind::IsNotNull => {}
            PredicateKind::Equality => {
                if let Some(value) = other.lower {
                    if self.value_passes_filters(&value) {
                        self.kind = PredicateKind::Equality;
                        self.lower = Some(value);
                        self.upper = None;
                        self.filters.clear();
                    } else {
                        self.set_to_none();
                    }
                }
            }
            PredicateKind::Range => {
                self.intersect_bounds(other.lower, other.upper);
                self.simplify();
            }
            PredicateKind::InList => {
                let values: Vec<Datum<'a>> = other
                    .values
                    .iter()
                    .copied()
                    .filter(|v| self.value_passes_filters(v))
                    .collect();
                self.kind = PredicateKind::InList;
                self.lower = None;
                self.upper = None;
                self.values = values;
                self.filters.clear();
                self.simplify();
            }
            PredicateKind::InBloomFilter => {
                self.filters.extend(other.filters.iter().copied());
                self.intersect_bounds(other.lower, other.upper);
                self.simplify();
            }
        }
    }

    /// Tighten bounds to the intersection with `[lower, upper)`.
    fn intersect_bounds(&mut self, lower: Option<Datum<'a>>, upper: Option<Datum<'a>>) {
        if let Some(lo) = lower {
            if self
                .lower
                .map_or(true, |cur| lo.compare(&cur) == Ordering::Greater)
            {
                self.lower = Some(lo);
            }
        }
        if let Some(up) = upper {
            if self
                .upper
                .map_or(true, |cur| up.compare(&cur) == Ordering::Less)
            {
                self.upper = Some(up);
            }
        }
    }

    fn set_to_none(&mut self) {
        self.kind = PredicateKind::None;
        self.lower = None;
        self.upper = None;
        self.values.clear();
        self.filters.clear();
    }

    /// Restore canonical form after construction or merge.
    fn simplify(&mut self) {
        match self.kind {
            PredicateKind::Range => {
                if let (Some(lower), Some(upper)) = (self.lower, self.upper) {
                    match lower.compare(&upper) {
                        Ordering::Less => {
                            if lower.is_consecutive(&upper) {
                                self.kind = PredicateKind::Equality;
                                self.upper = None;
                            }
                        }
                        _ => self.set_to_none(),
                    }
                }
            }
            PredicateKind::InList => match self.values.len() {
                0 => self.set_to_none(),
                1 => {
                    self.kind = PredicateKind::Equality;
                    self.lower = Some(self.values[0]);
                    self.values.clear();
                }
                _ => {}
            },
            PredicateKind::InBloomFilter => {
                if let (Some(lower), Some(upper)) = (self.lower, self.upper) {
                    match lower.compare(&upper) {
                        Ordering::Less => {
                            if lower.is_consecutive(&upper) {
                                if self.value_passes_filters(&lower) {
                                    self.kind = PredicateKind::Equality;
                                    self.upper = None;
                                    self.filters.clear();
                                } else {
                                    self.set_to_none();
                                }
                            }
                        }
                        _ => self.set_to_none(),
                    }
                }
            }
            _ => {}
        }
    }

    // ---- Membership helpers ----

    fn value_in_range<'c>(&self, value: &Datum<'c>) -> bool
    where
        'a: 'c,
    {
        if let Some(lower) = self.lower {
            if value.compare(&lower) == Ordering::Less {
                return false;
            }
        }
        if let Some(upper) = self.upper {
            if value.compare(&upper) != Ordering::Less {
                return false;
            }
        }
        true
    }

    fn value_in_list<'c>(&self, value: &Datum<'c>) -> bool
    where
        'a: 'c,
    {
        self.values
            .binary_search_by(|probe| value.compare(probe).reverse())
            .is_ok()
    }

    /// Whether a value's probe encoding passes every attached filter.
    fn passes_filter_probes<'c>(&self, value: &Datum<'c>) -> bool
    where
        'a: 'c,
    {
        let mut buf = [0u8; 16];
        let key = value.probe_bytes(&mut buf);
        for filter in &self.filters {
            let probe = BloomKeyProbe::new(key, filter.algorithm());
            if !filter.may_contain(&probe) {
                return false;
            }
        }
        true
    }

    /// Whether a value passes every attached filter and the optional
    /// range bounds.
    fn value_passes_filters<'c>(&self, value: &Datum<'c>) -> bool
    where
        'a: 'c,
    {
        self.passes_filter_probes(value) && self.value_in_range(value)
    }

    // ---- Evaluation ----

    /// Evaluate against a block, clearing selection bits for rows that
    /// fail.
    ///
    /// Null handling: `IsNull` keeps only null rows, `IsNotNull` keeps
    /// only non-null rows, and every other kind rejects null rows before
    /// testing the cell.
    pub fn evaluate<'b>(&self, block: &ColumnBlock<'b>, sel: &mut SelectionVector)
    where
        'a: 'b,
    {
        debug_assert_eq!(block.nrows(), sel.nrows());
        let non_null = block.non_null_bitmap();
        match block.values() {
            BlockValues::Bool(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Int8(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Int16(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Int32(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Int64(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::UInt8(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::UInt16(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::UInt32(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::UInt64(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Float(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Double(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Binary(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Decimal32(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Decimal64(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Decimal128(cells) => self.evaluate_typed(cells, non_null, sel),
            BlockValues::Timestamp(cells) => self.evaluate_typed(cells, non_null, sel),
        }
    }

    /// Evaluate against a single cell with runtime type dispatch.
    ///
    /// Null handling is the block evaluator's job; `IsNull` is `false`
    /// and `IsNotNull` is `true` for any cell that holds a value.
    pub fn evaluate_cell<'c>(&self, cell: Datum<'c>) -> bool
    where
        'a: 'c,
    {
        debug_assert!(cell.matches_type(self.column.physical_type()));
        match self.kind {
            PredicateKind::None => false,
            PredicateKind::Equality => self
                .lower
                .map_or(false, |value| cell.compare(&value) == Ordering::Equal),
            PredicateKind::Range => self.value_in_range(&cell),
            PredicateKind::IsNotNull => true,
            PredicateKind::IsNull => false,
            PredicateKind::InList => self.value_in_list(&cell),
            PredicateKind::InBloomFilter => self.value_passes_filters(&cell),
        }
    }

    /// Typed inner loop: dispatch happens once per block, the comparator
    /// inlines into the per-row loop.
    fn evaluate_typed<'b, T: CellOps<'b>>(
        &self,
        cells: &[T],
        non_null: Option<&SelectionVector>,
        sel: &mut SelectionVector,
    ) where
        'a: 'b,
    {
        match self.kind {
            PredicateKind::None => sel.clear_all(),
            PredicateKind::IsNotNull => {
                if let Some(nn) = non_null {
                    sel.and_with(nn);
                }
            }
            PredicateKind::IsNull => match non_null {
                Some(nn) => sel.and_not_with(nn),
                None => sel.clear_all(),
            },
            PredicateKind::Equality => {
                let Some(value) = self.lower else {
                    debug_assert!(false, "equality predicate without a value");
                    sel.clear_all();
                    return;
                };
                let value = T::from_datum(value);
                filter_block(cells, non_null, sel, |cell| {
                    T::compare(cell, value) == Ordering::Equal
                });
            }
            PredicateKind::Range => {
                let lower = self.lower.map(T::from_datum);
                let upper = self.upper.map(T::from_datum);
                filter_block(cells, non_null, sel, |cell| {
                    lower.map_or(true, |l| T::compare(cell, l) != Ordering::Less)
                        && upper.map_or(true, |u| T::compare(cell, u) == Ordering::Less)
                });
            }
            PredicateKind::InList => {
                filter_block(cells, non_null, sel, |cell| {
                    self.values
                        .binary_search_by(|probe| T::compare(T::from_datum(*probe), cell))
                        .is_ok()
                });
            }
            PredicateKind::InBloomFilter => {
                // Bounds compare in the cell's native type; only the probe
                // encoding goes through a datum (identical bytes for the
                // integer-backed decimal and timestamp representations).
                let lower = self.lower.map(T::from_datum);
                let upper = self.upper.map(T::from_datum);
                filter_block(cells, non_null, sel, |cell| {
                    lower.map_or(true, |l| T::compare(cell, l) != Ordering::Less)
                        && upper.map_or(true, |u| T::compare(cell, u) == Ordering::Less)
                        && self.passes_filter_probes(&cell.to_datum())
                });
            }
        }
    }
}

/// Clear selection bits for rows that are null or fail `keep`.
#[inline]
fn filter_block<T: Copy>(
    cells: &[T],
    non_null: Option<&SelectionVector>,
    sel: &mut SelectionVector,
    keep: impl Fn(T) -> bool,
) {
    match non_null {
        Some(nn) => {
            for (i, &cell) in cells.iter().enumerate() {
                if sel.get(i) && (!nn.get(i) || !keep(cell)) {
                    sel.clear(i);
                }
            }
        }
        None => {
            for (i, &cell) in cells.iter().enumerate() {
                if sel.get(i) && !keep(cell) {
                    sel.clear(i);
                }
            }
        }
    }
}

/// Typed cell access for the per-block evaluation loops.
trait CellOps<'b>: Copy {
    fn from_datum(d: Datum<'b>) -> Self;
    fn to_datum(self) -> Datum<'b>;
    fn compare(a: Self, b: Self) -> Ordering;
}

macro_rules! ord_cell_ops {
    ($ty:ty, $out:ident, [$($variant:ident),+]) => {
        impl<'b> CellOps<'b> for $ty {
            #[inline]
            fn from_datum(d: Datum<'b>) -> Self {
                match d {
                    $(Datum::$variant(v) => v,)+
                    _ => {
                        debug_assert!(false, "datum does not fit cell type");
                        Default::default()
                    }
                }
            }

            #[inline]
            fn to_datum(self) -> Datum<'b> {
                Datum::$out(self)
            }

            #[inline]
            fn compare(a: Self, b: Self) -> Ordering {
                a.cmp(&b)
            }
        }
    };
}

ord_cell_ops!(bool, Bool, [Bool]);
ord_cell_ops!(i8, Int8, [Int8]);
ord_cell_ops!(i16, Int16, [Int16]);
ord_cell_ops!(i32, Int32, [Int32, Decimal32]);
ord_cell_ops!(i64, Int64, [Int64, Decimal64, Timestamp]);
ord_cell_ops!(u8, UInt8, [UInt8]);
ord_cell_ops!(u16, UInt16, [UInt16]);
ord_cell_ops!(u32, UInt32, [UInt32]);
ord_cell_ops!(u64, UInt64, [UInt64]);
ord_cell_ops!(i128, Decimal128, [Decimal128]);

impl<'b> CellOps<'b> for f32 {
    #[inline]
    fn from_datum(d: Datum<'b>) -> Self {
        match d {
            Datum::Float(v) => v,
            _ => {
                debug_assert!(false, "datum does not fit cell type");
                0.0
            }
        }
    }

    #[inline]
    fn to_datum(self) -> Datum<'b> {
        Datum::Float(self)
    }

    #[inline]
    fn compare(a: Self, b: Self) -> Ordering {
        a.total_cmp(&b)
    }
}

impl<'b> CellOps<'b> for f64 {
    #[inline]
    fn from_datum(d: Datum<'b>) -> Self {
        match d {
            Datum::Double(v) => v,
            _ => {
                debug_assert!(false, "datum does not fit cell type");
                0.0
            }
        }
    }

    #[inline]
    fn to_datum(self) -> Datum<'b> {
        Datum::Double(self)
    }

    #[inline]
    fn compare(a: Self, b: Self) -> Ordering {
        a.total_cmp(&b)
    }
}

impl<'b> CellOps<'b> for &'b [u8] {
    #[inline]
    fn from_datum(d: Datum<'b>) -> Self {
        match d {
            Datum::Binary(v) => v,
            _ => {
                debug_assert!(false, "datum does not fit cell type");
                &[]
            }
        }
    }

    #[inline]
    fn to_datum(self) -> Datum<'b> {
        Datum::Binary(self)
    }

    #[inline]
    fn compare(a: Self, b: Self) -> Ordering {
        a.cmp(b)
    }
}

impl<'a> PartialEq for ColumnPredicate<'a> {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind || self.column != other.column {
            return false;
        }
        match self.kind {
            PredicateKind::None | PredicateKind::IsNull | PredicateKind::IsNotNull => true,
            PredicateKind::Equality => self.lower == other.lower,
            PredicateKind::Range => self.lower == other.lower && self.upper == other.upper,
            PredicateKind::InList => self.values == other.values,
            PredicateKind::InBloomFilter => {
                self.filters == other.filters
                    && self.lower == other.lower
                    && self.upper == other.upper
            }
        }
    }
}

impl fmt::Display for ColumnPredicate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.column.name();
        match self.kind {
            PredicateKind::None => write!(f, "`{name}` NONE"),
            PredicateKind::Equality => match &self.lower {
                Some(value) => write!(f, "`{name}` = {value}"),
                None => write!(f, "`{name}` = ?"),
            },
            PredicateKind::Range => match (&self.lower, &self.upper) {
                (Some(lo), Some(up)) => {
                    write!(f, "`{name}` >= {lo} AND `{name}` < {up}")
                }
                (Some(lo), None) => write!(f, "`{name}` >= {lo}"),
                (None, Some(up)) => write!(f, "`{name}` < {up}"),
                (None, None) => write!(f, "`{name}` RANGE"),
            },
            PredicateKind::IsNotNull => write!(f, "`{name}` IS NOT NULL"),
            PredicateKind::IsNull => write!(f, "`{name}` IS NULL"),
            PredicateKind::InList => {
                write!(f, "`{name}` IN (")?;
                for (i, v) in self.values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ")")
            }
            PredicateKind::InBloomFilter => {
                write!(f, "`{name}` IN {} BLOOM FILTERS", self.filters.len())?;
                if let Some(lo) = &self.lower {
                    write!(f, " AND `{name}` >= {lo}")?;
                }
                if let Some(up) = &self.upper {
                    write!(f, " AND `{name}` < {up}")?;
                }
                Ok(())
            }
        }
    }
}

/// Order predicates so that cheaper, more selective ones run first.
///
/// Kind ranks ascending: `None`, `IsNull`, `Equality`, `InList`, `Range`,
/// `InBloomFilter`, `IsNotNull`. Within `InList`, smaller lists first;
/// within `Range`, narrower intervals first where both widths are
/// computable. Remaining ties break on the column name.
pub fn selectivity_comparator(a: &ColumnPredicate<'_>, b: &ColumnPredicate<'_>) -> Ordering {
    fn rank(kind: PredicateKind) -> u8 {
        match kind {
            PredicateKind::None => 0,
            PredicateKind::IsNull => 1,
            PredicateKind::Equality => 2,
            PredicateKind::InList => 3,
            PredicateKind::Range => 4,
            PredicateKind::InBloomFilter => 5,
            PredicateKind::IsNotNull => 6,
        }
    }

    rank(a.kind)
        .cmp(&rank(b.kind))
        .then_with(|| match (a.kind, b.kind) {
            (PredicateKind::InList, PredicateKind::InList) => {
                a.values.len().cmp(&b.values.len())
            }
            (PredicateKind::Range, PredicateKind::Range) => {
                match (range_width(a), range_width(b)) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    _ => Ordering::Equal,
                }
            }
            _ => Ordering::Equal,
        })
        .then_with(|| a.column.name().cmp(b.column.name()))
}

/// Interval width for both-bounded integer-family ranges.
fn range_width(p: &ColumnPredicate<'_>) -> Option<u128> {
    let (Some(lo), Some(up)) = (p.lower, p.upper) else {
        return None;
    };
    match (lo, up) {
        (Datum::Int8(l), Datum::Int8(u)) => Some((u as i128 - l as i128) as u128),
        (Datum::Int16(l), Datum::Int16(u)) => Some((u as i128 - l as i128) as u128),
        (Datum::Int32(l), Datum::Int32(u)) => Some((u as i128 - l as i128) as u128),
        (Datum::Int64(l), Datum::Int64(u)) => Some((u as i128 - l as i128) as u128),
        (Datum::UInt8(l), Datum::UInt8(u)) => Some((u - l) as u128),
        (Datum::UInt16(l), Datum::UInt16(u)) => Some((u - l) as u128),
        (Datum::UInt32(l), Datum::UInt32(u)) => Some((u - l) as u128),
        (Datum::UInt64(l), Datum::UInt64(u)) => Some((u - l) as u128),
        (Datum::Decimal32(l), Datum::Decimal32(u)) => Some((u as i128 - l as i128) as u128),
        (Datum::Decimal64(l), Datum::Decimal64(u)) => Some((u as i128 - l as i128) as u128),
        (Datum::Decimal128(l), Datum::Decimal128(u)) => Some(u.wrapping_sub(l) as u128),
        (Datum::Timestamp(l), Datum::Timestamp(u)) => Some((u as i128 - l as i128) as u128),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bloom::{BlockBloomFilter, HashAlgorithm};
    use crate::data::PhysicalType;

    fn int_col(name: &str) -> ColumnSchema {
        ColumnSchema::new(name, PhysicalType::Int32)
    }

    fn nullable_int_col(name: &str) -> ColumnSchema {
        ColumnSchema::new(name, PhysicalType::Int32).nullable(true)
    }

    fn string_col(name: &str) -> ColumnSchema {
        ColumnSchema::new(name, PhysicalType::String)
    }

    fn int_range(lower: Option<i32>, upper: Option<i32>) -> ColumnPredicate<'static> {
        ColumnPredicate::range(
            int_col("c"),
            lower.map(Datum::Int32),
            upper.map(Datum::Int32),
        )
    }

    fn int_equality(value: i32) -> ColumnPredicate<'static> {
        ColumnPredicate::equality(int_col("c"), Datum::Int32(value))
    }

    fn int_list(values: &[i32]) -> ColumnPredicate<'static> {
        ColumnPredicate::in_list(int_col("c"), values.iter().copied().map(Datum::Int32).collect())
    }

    fn bloom_with_ints(values: &[i32]) -> BlockBloomFilter {
        let mut filter = BlockBloomFilter::new(10).unwrap();
        for v in values {
            let mut buf = [0u8; 16];
            let key = Datum::Int32(*v).probe_bytes(&mut buf).to_vec();
            filter.insert(BloomKeyProbe::new(&key, HashAlgorithm::City).h1());
        }
        filter
    }

    // ---- Constructors ----

    #[test]
    fn test_range_simplification() {
        // Empty and inverted ranges match nothing.
        assert_eq!(int_range(Some(5), Some(5)).kind(), PredicateKind::None);
        assert_eq!(int_range(Some(7), Some(5)).kind(), PredicateKind::None);
        // A range covering exactly one value is an equality.
        let one = int_range(Some(5), Some(6));
        assert_eq!(one.kind(), PredicateKind::Equality);
        assert_eq!(one.raw_lower(), Some(&Datum::Int32(5)));
        // Unbounded ends stay ranges.
        assert_eq!(int_range(Some(5), None).kind(), PredicateKind::Range);
        assert_eq!(int_range(None, Some(5)).kind(), PredicateKind::Range);
    }

    #[test]
    fn test_inclusive_range_normalization() {
        let arena = Bump::new();
        let pred = ColumnPredicate::inclusive_range(
            int_col("c"),
            Some(Datum::Int32(3)),
            Some(Datum::Int32(7)),
            &arena,
        )
        .unwrap();
        assert_eq!(pred.kind(), PredicateKind::Range);
        assert_eq!(pred.raw_lower(), Some(&Datum::Int32(3)));
        assert_eq!(pred.raw_upper(), Some(&Datum::Int32(8)));

        // An inclusive upper bound at the type maximum is dropped.
        let pred = ColumnPredicate::inclusive_range(
            int_col("c"),
            Some(Datum::Int32(3)),
            Some(Datum::Int32(i32::MAX)),
            &arena,
        )
        .unwrap();
        assert_eq!(pred.kind(), PredicateKind::Range);
        assert_eq!(pred.raw_upper(), None);

        // No lower bound and a dropped upper bound covers the whole domain.
        assert!(ColumnPredicate::inclusive_range(
            int_col("c"),
            None,
            Some(Datum::Int32(i32::MAX)),
            &arena,
        )
        .is_none());
    }

    #[test]
    fn test_inclusive_range_binary_upper() {
        let arena = Bump::new();
        let pred = ColumnPredicate::inclusive_range(
            string_col("s"),
            Some(Datum::Binary(b"a")),
            Some(Datum::Binary(b"b")),
            &arena,
        )
        .unwrap();
        assert_eq!(pred.kind(), PredicateKind::Range);
        assert_eq!(pred.raw_upper(), Some(&Datum::Binary(b"b\0")));
        assert!(pred.evaluate_cell(Datum::Binary(b"b")));
        assert!(!pred.evaluate_cell(Datum::Binary(b"b\0")));
    }

    #[test]
    fn test_exclusive_range_normalization() {
        let arena = Bump::new();
        let pred = ColumnPredicate::exclusive_range(
            int_col("c"),
            Some(Datum::Int32(3)),
            Some(Datum::Int32(10)),
            &arena,
        );
        assert_eq!(pred.kind(), PredicateKind::Range);
        assert_eq!(pred.raw_lower(), Some(&Datum::Int32(4)));
        assert_eq!(pred.raw_upper(), Some(&Datum::Int32(10)));

        // An exclusive lower bound at the type maximum leaves nothing.
        let pred = ColumnPredicate::exclusive_range(
            int_col("c"),
            Some(Datum::Int32(i32::MAX)),
            None,
            &arena,
        );
        assert_eq!(pred.kind(), PredicateKind::None);
    }

    #[test]
    fn test_in_list_constructor() {
        let pred = int_list(&[5, 1, 3, 3, 1]);
        assert_eq!(pred.kind(), PredicateKind::InList);
        assert_eq!(
            pred.raw_values(),
            &[Datum::Int32(1), Datum::Int32(3), Datum::Int32(5)]
        );
        assert_eq!(int_list(&[7]).kind(), PredicateKind::Equality);
        assert_eq!(int_list(&[]).kind(), PredicateKind::None);
    }

    #[test]
    fn test_is_null_on_non_nullable_column() {
        assert_eq!(
            ColumnPredicate::is_null(int_col("c")).kind(),
            PredicateKind::None
        );
        assert_eq!(
            ColumnPredicate::is_null(nullable_int_col("c")).kind(),
            PredicateKind::IsNull
        );
    }

    #[test]
    fn test_in_bloom_filter_without_filters_degrades() {
        let pred = ColumnPredicate::in_bloom_filter(
            int_col("c"),
            Vec::new(),
            Some(Datum::Int32(1)),
            Some(Datum::Int32(9)),
        );
        assert_eq!(pred.kind(), PredicateKind::Range);
        let pred = ColumnPredicate::in_bloom_filter(int_col("c"), Vec::new(), None, None);
        assert_eq!(pred.kind(), PredicateKind::IsNotNull);
    }

    // ---- Merge scenarios ----

    #[test]
    fn test_merge_range_range() {
        let mut pred = int_range(Some(10), Some(20));
        pred.merge(&int_range(Some(15), Some(25)));
        assert_eq!(pred, int_range(Some(15), Some(20)));

        let mut pred = int_range(Some(10), Some(20));
        pred.merge(&int_range(Some(30), Some(40)));
        assert_eq!(pred.kind(), PredicateKind::None);

        // Intersection covering a single value collapses to equality.
        let mut pred = int_range(Some(10), Some(20));
        pred.merge(&int_range(Some(19), Some(25)));
        assert_eq!(pred, int_equality(19));
    }

    #[test]
    fn test_merge_equality_range() {
        let mut pred = int_equality(7);
        pred.merge(&int_range(Some(0), Some(10)));
        assert_eq!(pred, int_equality(7));

        let mut pred = int_equality(7);
        pred.merge(&int_range(Some(8), Some(10)));
        assert_eq!(pred.kind(), PredicateKind::None);
    }

    #[test]
    fn test_merge_in_list_range() {
        let mut pred = int_list(&[1, 3, 5, 7, 9]);
        pred.merge(&int_range(Some(3), Some(8)));
        assert_eq!(pred, int_list(&[3, 5, 7]));

        let mut pred = int_list(&[1, 3, 5, 7, 9]);
        pred.merge(&int_range(Some(5), Some(6)));
        assert_eq!(pred, int_equality(5));

        let mut pred = int_list(&[1, 3, 5, 7, 9]);
        pred.merge(&int_range(Some(10), Some(20)));
        assert_eq!(pred.kind(), PredicateKind::None);
    }

    #[test]
    fn test_merge_with_none_is_none() {
        let none = ColumnPredicate::none(int_col("c"));
        for pred in [
            int_equality(1),
            int_range(Some(0), Some(9)),
            int_list(&[1, 2, 3]),
            ColumnPredicate::is_not_null(int_col("c")),
            ColumnPredicate::none(int_col("c")),
        ] {
            let mut merged = pred.clone();
            merged.merge(&none);
            assert_eq!(merged.kind(), PredicateKind::None);

            let mut merged = none.clone();
            merged.merge(&pred);
            assert_eq!(merged.kind(), PredicateKind::None);
        }
    }

    #[test]
    fn test_merge_is_not_null_identity() {
        let is_not_null = ColumnPredicate::is_not_null(int_col("c"));
        for pred in [
            int_equality(1),
            int_range(Some(0), Some(9)),
            int_list(&[1, 2, 3]),
            ColumnPredicate::is_not_null(int_col("c")),
        ] {
            let mut merged = is_not_null.clone();
            merged.merge(&pred);
            assert_eq!(merged, pred);

            let mut merged = pred.clone();
            merged.merge(&is_not_null);
            assert_eq!(merged, pred);
        }
    }

    #[test]
    fn test_merge_is_null() {
        let col = nullable_int_col("c");
        let is_null = ColumnPredicate::is_null(col.clone());

        let mut merged = is_null.clone();
        merged.merge(&is_null);
        assert_eq!(merged.kind(), PredicateKind::IsNull);

        let mut merged = is_null.clone();
        merged.merge(&ColumnPredicate::is_not_null(col.clone()));
        assert_eq!(merged.kind(), PredicateKind::None);

        let mut merged = is_null.clone();
        merged.merge(&ColumnPredicate::equality(col.clone(), Datum::Int32(3)));
        assert_eq!(merged.kind(), PredicateKind::None);

        let mut merged = ColumnPredicate::equality(col.clone(), Datum::Int32(3));
        merged.merge(&is_null);
        assert_eq!(merged.kind(), PredicateKind::None);
    }

    #[test]
    fn test_merge_in_list_in_list() {
        let mut pred = int_list(&[1, 3, 5, 7]);
        pred.merge(&int_list(&[3, 4, 7, 9]));
        assert_eq!(pred, int_list(&[3, 7]));

        let mut pred = int_list(&[1, 3]);
        pred.merge(&int_list(&[5, 7]));
        assert_eq!(pred.kind(), PredicateKind::None);
    }

    #[test]
    fn test_merge_matches_conjunction() {
        // merge(p, q) must match exactly the rows both p and q match.
        let preds = [
            int_equality(5),
            int_range(Some(2), Some(12)),
            int_range(Some(5), None),
            int_range(None, Some(9)),
            int_list(&[1, 5, 9, 13]),
            ColumnPredicate::is_not_null(int_col("c")),
            ColumnPredicate::none(int_col("c")),
        ];
        for p in &preds {
            for q in &preds {
                let mut merged = p.clone();
                merged.merge(q);
                for v in -2..20 {
                    let cell = Datum::Int32(v);
                    assert_eq!(
                        merged.evaluate_cell(cell),
                        p.evaluate_cell(cell) && q.evaluate_cell(cell),
                        "conjunction mismatch at {v} for {p} AND {q} -> {merged}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_merge_is_commutative() {
        let preds = [
            int_equality(5),
            int_range(Some(2), Some(12)),
            int_list(&[1, 5, 9]),
            ColumnPredicate::is_not_null(int_col("c")),
            ColumnPredicate::none(int_col("c")),
        ];
        for p in &preds {
            for q in &preds {
                let mut pq = p.clone();
                pq.merge(q);
                let mut qp = q.clone();
                qp.merge(p);
                assert_eq!(pq, qp, "{p} vs {q}");
            }
        }
    }

    #[test]
    fn test_merge_is_associative() {
        let preds = [
            int_equality(5),
            int_range(Some(2), Some(12)),
            int_list(&[1, 5, 9]),
            ColumnPredicate::is_not_null(int_col("c")),
        ];
        for p in &preds {
            for q in &preds {
                for r in &preds {
                    // (p AND q) AND r
                    let mut left = p.clone();
                    left.merge(q);
                    left.merge(r);
                    // p AND (q AND r)
                    let mut qr = q.clone();
                    qr.merge(r);
                    let mut right = p.clone();
                    right.merge(&qr);
                    assert_eq!(left, right, "({p} AND {q}) AND {r}");
                }
            }
        }
    }

    // ---- Bloom merges ----

    #[test]
    fn test_merge_equality_with_bloom() {
        let filter = bloom_with_ints(&[3, 7, 11]);
        let spec = filter.as_spec(HashAlgorithm::City);

        // A contained equality survives and sheds the filters.
        let mut pred = int_equality(7);
        pred.merge(&ColumnPredicate::in_bloom_filter(
            int_col("c"),
            vec![spec],
            None,
            None,
        ));
        assert_eq!(pred, int_equality(7));

        // An absent equality cannot match.
        let mut pred = int_equality(8);
        pred.merge(&ColumnPredicate::in_bloom_filter(
            int_col("c"),
            vec![spec],
            None,
            None,
        ));
        assert_eq!(pred.kind(), PredicateKind::None);
    }

    #[test]
    fn test_merge_bloom_with_equality_drops_filters() {
        let filter = bloom_with_ints(&[3, 7, 11]);
        let spec = filter.as_spec(HashAlgorithm::City);

        let mut pred = ColumnPredicate::in_bloom_filter(int_col("c"), vec![spec], None, None);
        pred.merge(&int_equality(7));
        assert_eq!(pred, int_equality(7));
        assert!(pred.bloom_filters().is_empty());

        let mut pred = ColumnPredicate::in_bloom_filter(int_col("c"), vec![spec], None, None);
        pred.merge(&int_equality(1000));
        assert_eq!(pred.kind(), PredicateKind::None);
    }

    #[test]
    fn test_merge_range_with_bloom() {
        let filter = bloom_with_ints(&[3, 7, 11]);
        let spec = filter.as_spec(HashAlgorithm::City);

        let mut pred = int_range(Some(0), Some(10));
        pred.merge(&ColumnPredicate::in_bloom_filter(
            int_col("c"),
            vec![spec],
            Some(Datum::Int32(5)),
            None,
        ));
        assert_eq!(pred.kind(), PredicateKind::InBloomFilter);
        assert_eq!(pred.raw_lower(), Some(&Datum::Int32(5)));
        assert_eq!(pred.raw_upper(), Some(&Datum::Int32(10)));
        assert_eq!(pred.bloom_filters().len(), 1);

        // Bounds collapsing to one contained value give an equality.
        let mut pred = int_range(Some(7), Some(20));
        pred.merge(&ColumnPredicate::in_bloom_filter(
            int_col("c"),
            vec![spec],
            None,
            Some(Datum::Int32(8)),
        ));
        assert_eq!(pred, int_equality(7));

        // Bounds collapsing to one absent value give none.
        let mut pred = int_range(Some(8), Some(20));
        pred.merge(&ColumnPredicate::in_bloom_filter(
            int_col("c"),
            vec![spec],
            None,
            Some(Datum::Int32(9)),
        ));
        assert_eq!(pred.kind(), PredicateKind::None);
    }

    #[test]
    fn test_merge_in_list_with_bloom_shrinks_list() {
        let filter = bloom_with_ints(&[3, 7, 11]);
        let spec = filter.as_spec(HashAlgorithm::City);

        let mut pred = int_list(&[1, 3, 7, 9]);
        pred.merge(&ColumnPredicate::in_bloom_filter(
            int_col("c"),
            vec![spec],
            None,
            None,
        ));
        assert_eq!(pred, int_list(&[3, 7]));

        let mut pred = ColumnPredicate::in_bloom_filter(int_col("c"), vec![spec], None, None);
        pred.merge(&int_list(&[1, 3, 7, 9]));
        assert_eq!(pred, int_list(&[3, 7]));
        assert!(pred.bloom_filters().is_empty());
    }

    #[test]
    fn test_merge_bloom_with_bloom_concatenates() {
        let filter_a = bloom_with_ints(&[3, 7]);
        let filter_b = bloom_with_ints(&[7, 11]);
        let spec_a = filter_a.as_spec(HashAlgorithm::City);
        let spec_b = filter_b.as_spec(HashAlgorithm::City);

        let mut pred =
            ColumnPredicate::in_bloom_filter(int_col("c"), vec![spec_a], Some(Datum::Int32(0)), None);
        pred.merge(&ColumnPredicate::in_bloom_filter(
            int_col("c"),
            vec![spec_b],
            None,
            Some(Datum::Int32(100)),
        ));
        assert_eq!(pred.kind(), PredicateKind::InBloomFilter);
        assert_eq!(pred.bloom_filters().len(), 2);
        assert_eq!(pred.raw_lower(), Some(&Datum::Int32(0)));
        assert_eq!(pred.raw_upper(), Some(&Datum::Int32(100)));

        // Only the value both filters contain passes.
        assert!(pred.evaluate_cell(Datum::Int32(7)));
        assert!(!pred.evaluate_cell(Datum::Int32(3)));
        assert!(!pred.evaluate_cell(Datum::Int32(11)));
    }

    // ---- Block evaluation ----

    #[test]
    fn test_evaluate_equality_block() {
        let cells = [1i32, 7, 7, 3, 9];
        let mut non_null = SelectionVector::new(5);
        non_null.clear(2);
        let block = ColumnBlock::new(BlockValues::Int32(&cells), Some(&non_null));
        let mut sel = SelectionVector::new(5);
        ColumnPredicate::equality(nullable_int_col("c"), Datum::Int32(7))
            .evaluate(&block, &mut sel);
        // Row 2 holds 7 but is null, so only row 1 survives.
        assert!(sel.get(1));
        assert_eq!(sel.count_selected(), 1);
    }

    #[test]
    fn test_evaluate_range_block() {
        let cells = [1i32, 5, 10, 15, 20];
        let block = ColumnBlock::new(BlockValues::Int32(&cells), None);
        let mut sel = SelectionVector::new(5);
        int_range(Some(5), Some(20)).evaluate(&block, &mut sel);
        assert!(!sel.get(0));
        assert!(sel.get(1));
        assert!(sel.get(2));
        assert!(sel.get(3));
        assert!(!sel.get(4));
    }

    #[test]
    fn test_evaluate_ands_into_selection() {
        let cells = [1i32, 5, 10, 15, 20];
        let block = ColumnBlock::new(BlockValues::Int32(&cells), None);
        let mut sel = SelectionVector::new(5);
        sel.clear(1);
        int_range(Some(5), None).evaluate(&block, &mut sel);
        // Row 1 was already filtered out and must stay out.
        assert!(!sel.get(1));
        assert_eq!(sel.count_selected(), 3);
    }

    #[test]
    fn test_evaluate_null_predicates() {
        let cells = [1i32, 2, 3];
        let mut non_null = SelectionVector::new(3);
        non_null.clear(1);
        let col = nullable_int_col("c");
        let block = ColumnBlock::new(BlockValues::Int32(&cells), Some(&non_null));

        let mut sel = SelectionVector::new(3);
        ColumnPredicate::is_null(col.clone()).evaluate(&block, &mut sel);
        assert!(sel.get(1));
        assert_eq!(sel.count_selected(), 1);

        let mut sel = SelectionVector::new(3);
        ColumnPredicate::is_not_null(col.clone()).evaluate(&block, &mut sel);
        assert!(!sel.get(1));
        assert_eq!(sel.count_selected(), 2);

        // On a block without nulls IS NULL matches nothing.
        let block = ColumnBlock::new(BlockValues::Int32(&cells), None);
        let mut sel = SelectionVector::new(3);
        ColumnPredicate::is_null(col).evaluate(&block, &mut sel);
        assert!(!sel.any_selected());
    }

    #[test]
    fn test_evaluate_none_block() {
        let cells = [1i32, 2, 3];
        let block = ColumnBlock::new(BlockValues::Int32(&cells), None);
        let mut sel = SelectionVector::new(3);
        ColumnPredicate::none(int_col("c")).evaluate(&block, &mut sel);
        assert!(!sel.any_selected());
    }

    #[test]
    fn test_evaluate_in_list_block() {
        let cells = [1i32, 3, 4, 5, 9];
        let block = ColumnBlock::new(BlockValues::Int32(&cells), None);
        let mut sel = SelectionVector::new(5);
        int_list(&[3, 5, 7]).evaluate(&block, &mut sel);
        assert!(!sel.get(0));
        assert!(sel.get(1));
        assert!(!sel.get(2));
        assert!(sel.get(3));
        assert!(!sel.get(4));
    }

    #[test]
    fn test_evaluate_binary_block() {
        let a: &[u8] = b"apple";
        let b: &[u8] = b"banana";
        let c: &[u8] = b"cherry";
        let cells = [a, b, c];
        let block = ColumnBlock::new(BlockValues::Binary(&cells), None);

        let mut sel = SelectionVector::new(3);
        ColumnPredicate::equality(string_col("s"), Datum::Binary(b"banana"))
            .evaluate(&block, &mut sel);
        assert!(!sel.get(0));
        assert!(sel.get(1));
        assert!(!sel.get(2));

        let mut sel = SelectionVector::new(3);
        ColumnPredicate::range(
            string_col("s"),
            Some(Datum::Binary(b"b")),
            Some(Datum::Binary(b"cherry")),
        )
        .evaluate(&block, &mut sel);
        assert!(!sel.get(0));
        assert!(sel.get(1));
        assert!(!sel.get(2));
    }

    #[test]
    fn test_evaluate_bloom_block() {
        let filter = bloom_with_ints(&[3, 7, 11]);
        let spec = filter.as_spec(HashAlgorithm::City);
        let pred = ColumnPredicate::in_bloom_filter(
            int_col("c"),
            vec![spec],
            None,
            Some(Datum::Int32(10)),
        );

        let cells = [3i32, 5, 7, 11];
        let block = ColumnBlock::new(BlockValues::Int32(&cells), None);
        let mut sel = SelectionVector::new(4);
        pred.evaluate(&block, &mut sel);
        assert!(sel.get(0));
        assert!(!sel.get(1));
        assert!(sel.get(2));
        // 11 is in the filter but outside the range bound.
        assert!(!sel.get(3));
    }

    #[test]
    fn test_evaluate_timestamp_block() {
        let col = ColumnSchema::new("ts", PhysicalType::Timestamp);
        let cells = [100i64, 200, 300];
        let block = ColumnBlock::new(BlockValues::Timestamp(&cells), None);
        let mut sel = SelectionVector::new(3);
        ColumnPredicate::range(
            col,
            Some(Datum::Timestamp(150)),
            Some(Datum::Timestamp(300)),
        )
        .evaluate(&block, &mut sel);
        assert!(!sel.get(0));
        assert!(sel.get(1));
        assert!(!sel.get(2));
    }

    #[test]
    fn test_evaluate_cell_runtime_dispatch() {
        let pred = int_range(Some(10), Some(20));
        assert!(!pred.evaluate_cell(Datum::Int32(9)));
        assert!(pred.evaluate_cell(Datum::Int32(10)));
        assert!(pred.evaluate_cell(Datum::Int32(19)));
        assert!(!pred.evaluate_cell(Datum::Int32(20)));

        assert!(ColumnPredicate::is_not_null(int_col("c")).evaluate_cell(Datum::Int32(0)));
        assert!(!ColumnPredicate::is_null(nullable_int_col("c")).evaluate_cell(Datum::Int32(0)));
    }

    // ---- Ordering, display, equality ----

    #[test]
    fn test_selectivity_ordering_by_kind() {
        let filter = bloom_with_ints(&[1]);
        let spec = filter.as_spec(HashAlgorithm::City);
        let mut preds = vec![
            ColumnPredicate::is_not_null(int_col("c")),
            ColumnPredicate::in_bloom_filter(int_col("c"), vec![spec], None, None),
            int_range(Some(0), Some(10)),
            int_list(&[1, 2, 3]),
            int_equality(5),
            ColumnPredicate::is_null(nullable_int_col("c")),
            ColumnPredicate::none(int_col("c")),
        ];
        preds.sort_by(|a, b| selectivity_comparator(a, b));
        let kinds: Vec<PredicateKind> = preds.iter().map(|p| p.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                PredicateKind::None,
                PredicateKind::IsNull,
                PredicateKind::Equality,
                PredicateKind::InList,
                PredicateKind::Range,
                PredicateKind::InBloomFilter,
                PredicateKind::IsNotNull,
            ]
        );
    }

    #[test]
    fn test_selectivity_ordering_within_kind() {
        // Smaller lists sort first.
        assert_eq!(
            selectivity_comparator(&int_list(&[1, 2]), &int_list(&[1, 2, 3])),
            Ordering::Less
        );
        // Narrower ranges sort first.
        assert_eq!(
            selectivity_comparator(&int_range(Some(0), Some(5)), &int_range(Some(0), Some(50))),
            Ordering::Less
        );
        // Incomparable ranges fall back to the column name.
        let a = ColumnPredicate::range(int_col("a"), Some(Datum::Int32(0)), None);
        let b = ColumnPredicate::range(int_col("b"), Some(Datum::Int32(0)), None);
        assert_eq!(selectivity_comparator(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", int_equality(5)), "`c` = 5");
        assert_eq!(
            format!("{}", int_range(Some(3), Some(8))),
            "`c` >= 3 AND `c` < 8"
        );
        assert_eq!(format!("{}", int_range(None, Some(8))), "`c` < 8");
        assert_eq!(format!("{}", int_list(&[1, 2, 3])), "`c` IN (1, 2, 3)");
        assert_eq!(
            format!("{}", ColumnPredicate::is_not_null(int_col("c"))),
            "`c` IS NOT NULL"
        );
        assert_eq!(
            format!("{}", ColumnPredicate::is_null(nullable_int_col("c"))),
            "`c` IS NULL"
        );
        assert_eq!(
            format!("{}", ColumnPredicate::none(int_col("c"))),
            "`c` NONE"
        );
    }

    #[test]
    fn test_predicate_equality_by_kind() {
        assert_eq!(int_equality(5), int_equality(5));
        assert_ne!(int_equality(5), int_equality(6));
        assert_ne!(int_equality(5), int_range(Some(5), Some(7)));
        assert_ne!(
            ColumnPredicate::equality(int_col("a"), Datum::Int32(5)),
            ColumnPredicate::equality(int_col("b"), Datum::Int32(5))
        );
        assert_eq!(int_list(&[2, 1]), int_list(&[1, 2]));
    }
}
