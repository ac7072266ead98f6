//! Column data model: physical types, schemas, cell values, blocks and
//! selection vectors.

pub mod column;
pub mod datum;
pub mod schema;
pub mod selection;

pub use column::{BlockValues, ColumnBlock};
pub use datum::Datum;
pub use schema::{ColumnSchema, PhysicalType, TypeAttributes};
pub use selection::SelectionVector;
