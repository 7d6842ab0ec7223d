//! Data model: schemas, rows, and field values.
//!
//! - **Schema**: an immutable ordered field list with a precomputed fixed
//!   row size
//! - **Row**: one record's field values, bound to a schema
//! - **Value**/**FieldType**: the supported column types and their
//!   fixed-width on-disk encoding

pub mod row;
pub mod schema;
pub mod value;

pub use row::{RecordId, Row};
pub use schema::{FieldDef, Schema};
pub use value::{FieldType, Value};
