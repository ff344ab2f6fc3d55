//! pawtrack query - range query engine for the pawtrack record store.
//!
//! Answers "all records of owner X with a time field in [a, b]" over a compound
//! `(owner, time)` index, plus exact-prefix equality over any declared index.
//! Every function here is a pure read over a `RowStore` snapshot.
//!
//! - `range`: `range_by_owner_and_time`, `equals`, `by_owner`
//! - `window`: `SortOrder`, `Window`, `paginate`

pub mod range;
pub mod window;

pub use range::{by_owner, equals, range_by_owner_and_time};
pub use window::{paginate, SortOrder, Window};
