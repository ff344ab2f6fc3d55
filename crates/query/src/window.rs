//! Result ordering and pagination windows.

use serde::{Deserialize, Serialize};

/// Ordering of a time-range result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    /// Most recent first.
    #[default]
    Descending,
}

impl SortOrder {
    #[inline]
    pub fn is_reverse(self) -> bool {
        self == SortOrder::Descending
    }
}

/// A slice `[offset, offset + limit)` of an ordered result.
///
/// Windows are applied to a stable ordering, so re-requesting a window returns
/// the same rows and extending one only appends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// The first `n` items.
    pub const fn first(n: usize) -> Self {
        Self::new(0, n)
    }

    /// The same window grown by `n` more items.
    pub const fn extend(self, n: usize) -> Self {
        Self::new(self.offset, self.limit.saturating_add(n))
    }

    /// The window of the same size right after this one.
    pub const fn next_page(self) -> Self {
        Self::new(self.offset.saturating_add(self.limit), self.limit)
    }

    /// Exclusive end position.
    pub const fn end(self) -> usize {
        self.offset.saturating_add(self.limit)
    }
}

/// Slices an already-ordered sequence.
pub fn paginate<T: Clone>(items: &[T], window: Window) -> Vec<T> {
    let start = window.offset.min(items.len());
    let end = window.end().min(items.len());
    items[start..end].to_vec()
}
