//! pawtrack reactive - live queries for the pawtrack record store.
//!
//! A live query is a read function plus the data it depends on. After every
//! committed write the store hands the registry a `ChangeSet`; the registry
//! re-runs each live query whose dependencies it touches and publishes the new
//! result when it differs from the last one delivered.
//!
//! # Core Concepts
//!
//! - `Dependency`: a table, optionally narrowed to one owner
//! - `ChangeSet`: tables and owners touched by one or more commits
//! - `QueryRegistry`: coalesces commits and routes them to live queries
//! - `LiveQuery`: handle with `state()`, `changed()`, `ready()`, `set_key()` and `cancel()`
//!
//! Writes issued back to back are batched, so a burst of commits re-runs each
//! affected live query once.

pub mod change_set;
pub mod notify;
pub mod observable;

pub use change_set::{ChangeSet, Dependency, Owners};
pub use notify::{QueryRegistry, SubscriptionId};
pub use observable::{LiveQuery, LiveState, QueryFuture};
