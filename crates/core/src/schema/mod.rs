//! Schema definitions: columns, tables, indexes and constraints.

mod column;
mod constraint;
mod index;
mod table;

pub use column::Column;
pub use constraint::{Constraints, ForeignKey};
pub use index::{IndexDef, IndexedColumn};
pub use table::{Table, TableBuilder};
