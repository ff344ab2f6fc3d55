//! Range and equality queries over compound indexes.
//!
//! A time-range query targets an index declared on `(owner, time)`. Both
//! bounds are inclusive and compare as strings, which matches chronological
//! order for ISO-8601 instants and `YYYY-MM-DD` dates. Ties on the full key keep
//! insertion order ascending and the exact reverse when descending.

use crate::window::{SortOrder, Window};
use pawtrack_core::{Error, Result, Row, Value};
use pawtrack_index::KeyRange;
use pawtrack_storage::{IndexKey, RowStore};
use std::sync::Arc;
use tracing::trace;

fn index_arity(store: &RowStore, index: &str) -> Result<usize> {
    store
        .schema()
        .get_index(index)
        .map(|def| def.columns().len())
        .ok_or_else(|| Error::index_not_found(store.name(), index))
}

fn window_parts(window: Option<Window>) -> (Option<usize>, usize) {
    match window {
        Some(w) => (Some(w.limit), w.offset),
        None => (None, 0),
    }
}

/// Returns the rows of `owner` whose time component lies in `[start, end]`.
///
/// `index` must be a compound index whose first two columns are the owner and
/// the time field. An inverted range (`start > end`) yields an empty result.
pub fn range_by_owner_and_time(
    store: &RowStore,
    index: &str,
    owner: &Value,
    start: &Value,
    end: &Value,
    order: SortOrder,
    window: Option<Window>,
) -> Result<Vec<Arc<Row>>> {
    if index_arity(store, index)? != 2 {
        return Err(Error::invalid_operation(format!(
            "Index {} is not an (owner, time) index",
            index
        )));
    }
    if start > end {
        return Ok(Vec::new());
    }

    let range: KeyRange<IndexKey> = KeyRange::between(
        vec![owner.clone(), start.clone()],
        vec![owner.clone(), end.clone()],
    );
    let (limit, skip) = window_parts(window);
    trace!(table = store.name(), index, %owner, %start, %end, ?order, "range scan");
    store.index_scan(index, Some(&range), order.is_reverse(), limit, skip)
}

/// Returns the rows whose key in `index` starts with `key`.
///
/// `key` may cover every column of the index or only a leading part of it.
/// Matches are ordered by the full index key.
pub fn equals(
    store: &RowStore,
    index: &str,
    key: &[Value],
    order: SortOrder,
    window: Option<Window>,
) -> Result<Vec<Arc<Row>>> {
    let arity = index_arity(store, index)?;
    if key.is_empty() || key.len() > arity {
        return Err(Error::invalid_operation(format!(
            "Index {} takes 1 to {} key values, got {}",
            index,
            arity,
            key.len()
        )));
    }
    let (limit, skip) = window_parts(window);
    trace!(table = store.name(), index, parts = key.len(), ?order, "prefix scan");
    store.index_prefix_scan(index, key, order.is_reverse(), limit, skip)
}

/// Returns every row of `owner`, ordered by the remaining index columns.
pub fn by_owner(
    store: &RowStore,
    index: &str,
    owner: &Value,
    order: SortOrder,
    window: Option<Window>,
) -> Result<Vec<Arc<Row>>> {
    equals(store, index, std::slice::from_ref(owner), order, window)
}
