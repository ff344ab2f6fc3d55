//! pawtrack core - value, row and schema types for the pawtrack record store.
//!
//! This crate provides the foundational types shared by every other pawtrack crate:
//!
//! - `DataType`: column types (Boolean, Int32, Int64, Float64, String, Jsonb)
//! - `Value`: runtime values with a total order, usable as index keys
//! - `Row`: a row of values with a process-wide unique identifier
//! - `schema`: table definitions (Column, Table, IndexDef, Constraints, ForeignKey)
//! - `Error`: failures raised by schema and row operations
//!
//! # Example
//!
//! ```rust
//! use pawtrack_core::{DataType, Value, Row};
//! use pawtrack_core::schema::TableBuilder;
//!
//! let table = TableBuilder::new("profiles")
//!     .unwrap()
//!     .add_column("id", DataType::String)
//!     .unwrap()
//!     .add_column("name", DataType::String)
//!     .unwrap()
//!     .add_primary_key(&["id"])
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! assert_eq!(table.columns().len(), 2);
//!
//! let row = Row::new(1, vec![Value::from("d1"), Value::from("Rex")]);
//! assert_eq!(row.get(1), Some(&Value::String("Rex".into())));
//! ```

mod error;
mod row;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result};
pub use row::{next_row_id, Row, RowId};
pub use types::DataType;
pub use value::{JsonbValue, Value};
