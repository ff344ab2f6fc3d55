//! pawtrack index - ordered indexes for the pawtrack record store.
//!
//! `BTreeIndex` maps keys to the row ids that carry them. Keys are any `Ord`
//! type; compound indexes use `Vec<Value>` keys, which order by the leading
//! component first and then by each following component.
//!
//! # Example
//!
//! ```rust
//! use pawtrack_core::Value;
//! use pawtrack_index::{BTreeIndex, Index, KeyRange, RangeIndex};
//!
//! let mut idx: BTreeIndex<Vec<Value>> = BTreeIndex::new(false);
//! idx.add(vec!["dog-a".into(), "2024-01-01T08:00:00.000Z".into()], 1).unwrap();
//! idx.add(vec!["dog-a".into(), "2024-01-02T08:00:00.000Z".into()], 2).unwrap();
//! idx.add(vec!["dog-b".into(), "2024-01-01T09:00:00.000Z".into()], 3).unwrap();
//!
//! let range = KeyRange::bound(
//!     vec!["dog-a".into(), "2024-01-01T00:00:00.000Z".into()],
//!     vec!["dog-a".into(), "2024-12-31T23:59:59.999Z".into()],
//!     false,
//!     false,
//! );
//! assert_eq!(idx.get_range(Some(&range), true, None, 0), vec![2, 1]);
//! assert_eq!(idx.get_prefix(&["dog-b".into()], false, None, 0), vec![3]);
//! ```

pub mod btree;
pub mod traits;

pub use btree::BTreeIndex;
pub use traits::{Index, IndexError, KeyRange, RangeIndex};
