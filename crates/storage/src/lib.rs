//! pawtrack storage - row storage layer for the pawtrack record store.
//!
//! This crate provides:
//!
//! - `RowStore`: rows of one table with primary-key and secondary index maintenance
//! - `TableCache`: the set of table stores making up a database
//! - `Journal`: change tracking for one write
//! - `Transaction`: constraint-checked writes with rollback support
//! - `ConstraintChecker`: column type, not-null and foreign key validation
//! - `StorageBackend`: durable persistence of committed changes as an append log
//!
//! # Example
//!
//! ```rust
//! use pawtrack_storage::{TableCache, Transaction};
//! use pawtrack_core::schema::TableBuilder;
//! use pawtrack_core::{DataType, Row, Value};
//!
//! let mut cache = TableCache::new();
//! let schema = TableBuilder::new("profiles")
//!     .unwrap()
//!     .add_column("id", DataType::String)
//!     .unwrap()
//!     .add_column("name", DataType::String)
//!     .unwrap()
//!     .add_primary_key(&["id"])
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! cache.create_table(schema).unwrap();
//!
//! let mut tx = Transaction::begin();
//! let row = Row::create(vec![Value::from("d1"), Value::from("Rex")]);
//! tx.insert(&mut cache, "profiles", row).unwrap();
//! tx.commit().unwrap();
//!
//! assert_eq!(cache.get_table("profiles").unwrap().len(), 1);
//! ```

pub mod backend;
pub mod cache;
pub mod constraint;
pub mod journal;
pub mod row_store;
pub mod transaction;

pub use backend::{
    replay, AppendLogBackend, BackendError, LogRecord, MemoryBackend, StorageBackend, SyncPolicy,
};
pub use cache::TableCache;
pub use constraint::ConstraintChecker;
pub use journal::{Journal, JournalEntry};
pub use row_store::{IndexKey, RowStore};
pub use transaction::{Transaction, TransactionId, TransactionState};
