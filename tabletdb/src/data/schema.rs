//! Column schema and physical type tags

use serde::{Deserialize, Serialize};

/// Physical storage type of a column.
///
/// The physical type determines the cell representation inside a block,
/// the total order used by comparisons, and the encoded byte width.
/// `String` shares `Binary`'s representation (a length-prefixed byte slice
/// compared lexicographically); `Timestamp` is a microsecond count stored
/// as a signed 64-bit integer; decimals are two's-complement integers whose
/// width is chosen by the declared precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Binary,
    String,
    Decimal32,
    Decimal64,
    Decimal128,
    Timestamp,
}

impl PhysicalType {
    /// Encoded byte width of a fixed-width cell, or `None` for
    /// variable-width types.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            PhysicalType::Bool | PhysicalType::Int8 | PhysicalType::UInt8 => Some(1),
            PhysicalType::Int16 | PhysicalType::UInt16 => Some(2),
            PhysicalType::Int32 | PhysicalType::UInt32 => Some(4),
            PhysicalType::Float | PhysicalType::Decimal32 => Some(4),
            PhysicalType::Int64 | PhysicalType::UInt64 => Some(8),
            PhysicalType::Double | PhysicalType::Decimal64 | PhysicalType::Timestamp => Some(8),
            PhysicalType::Decimal128 => Some(16),
            PhysicalType::Binary | PhysicalType::String => None,
        }
    }

    /// Whether cells of this type are variable-width byte slices.
    #[inline]
    pub fn is_variable_width(&self) -> bool {
        matches!(self, PhysicalType::Binary | PhysicalType::String)
    }

    /// Choose the decimal physical type for a declared precision.
    pub fn for_decimal_precision(precision: u8) -> PhysicalType {
        match precision {
            0..=9 => PhysicalType::Decimal32,
            10..=18 => PhysicalType::Decimal64,
            _ => PhysicalType::Decimal128,
        }
    }
}

/// Optional type attributes (precision/scale for decimal columns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeAttributes {
    pub precision: u8,
    pub scale: u8,
}

/// Column attribute descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name
    name: String,
    /// Physical data type
    physical_type: PhysicalType,
    /// Whether the column can contain null values
    nullable: bool,
    /// Precision/scale for decimal columns
    attributes: Option<TypeAttributes>,
}

impl ColumnSchema {
    /// Create a new non-nullable column schema
    pub fn new(name: impl Into<String>, physical_type: PhysicalType) -> Self {
        Self {
            name: name.into(),
            physical_type,
            nullable: false,
            attributes: None,
        }
    }

    /// Set the nullable flag
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Attach decimal precision/scale attributes
    pub fn with_attributes(mut self, attributes: TypeAttributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Column name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical type tag
    #[inline]
    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    /// Whether the column admits null values
    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Decimal attributes, if declared
    #[inline]
    pub fn attributes(&self) -> Option<&TypeAttributes> {
        self.attributes.as_ref()
    }
}

impl std::fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}`", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_widths() {
        assert_eq!(PhysicalType::Bool.fixed_width(), Some(1));
        assert_eq!(PhysicalType::Int32.fixed_width(), Some(4));
        assert_eq!(PhysicalType::Timestamp.fixed_width(), Some(8));
        assert_eq!(PhysicalType::Decimal128.fixed_width(), Some(16));
        assert_eq!(PhysicalType::String.fixed_width(), None);
        assert!(PhysicalType::Binary.is_variable_width());
    }

    #[test]
    fn test_decimal_precision_mapping() {
        assert_eq!(PhysicalType::for_decimal_precision(9), PhysicalType::Decimal32);
        assert_eq!(PhysicalType::for_decimal_precision(18), PhysicalType::Decimal64);
        assert_eq!(PhysicalType::for_decimal_precision(38), PhysicalType::Decimal128);
    }

    #[test]
    fn test_schema_builder() {
        let col = ColumnSchema::new("price", PhysicalType::Decimal64)
            .nullable(true)
            .with_attributes(TypeAttributes { precision: 12, scale: 2 });
        assert_eq!(col.name(), "price");
        assert!(col.is_nullable());
        assert_eq!(col.attributes().unwrap().precision, 12);
        assert_eq!(format!("{}", col), "`price`");
    }
}
