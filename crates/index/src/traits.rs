//! Index trait definitions.

use core::ops::Bound;
use pawtrack_core::RowId;
use thiserror::Error;

/// A key range for index queries.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyRange<K> {
    /// All keys
    All,
    /// A single key (equality)
    Only(K),
    /// Keys >= lower bound
    LowerBound { value: K, exclusive: bool },
    /// Keys <= upper bound
    UpperBound { value: K, exclusive: bool },
    /// Keys between lower and upper bounds
    Bound {
        lower: K,
        upper: K,
        lower_exclusive: bool,
        upper_exclusive: bool,
    },
}

impl<K: Ord> KeyRange<K> {
    pub fn all() -> Self {
        KeyRange::All
    }

    pub fn only(key: K) -> Self {
        KeyRange::Only(key)
    }

    pub fn lower_bound(value: K, exclusive: bool) -> Self {
        KeyRange::LowerBound { value, exclusive }
    }

    pub fn upper_bound(value: K, exclusive: bool) -> Self {
        KeyRange::UpperBound { value, exclusive }
    }

    pub fn bound(lower: K, upper: K, lower_exclusive: bool, upper_exclusive: bool) -> Self {
        KeyRange::Bound {
            lower,
            upper,
            lower_exclusive,
            upper_exclusive,
        }
    }

    /// Both bounds inclusive.
    pub fn between(lower: K, upper: K) -> Self {
        Self::bound(lower, upper, false, false)
    }

    /// Returns true if no key can fall inside this range, e.g. `lower > upper`.
    pub fn is_empty(&self) -> bool {
        match self {
            KeyRange::Bound {
                lower,
                upper,
                lower_exclusive,
                upper_exclusive,
            } => lower > upper || (lower == upper && (*lower_exclusive || *upper_exclusive)),
            _ => false,
        }
    }

    /// Checks if a key is within this range.
    pub fn contains(&self, key: &K) -> bool {
        match self {
            KeyRange::All => true,
            KeyRange::Only(k) => key == k,
            KeyRange::LowerBound { value, exclusive } => {
                if *exclusive {
                    key > value
                } else {
                    key >= value
                }
            }
            KeyRange::UpperBound { value, exclusive } => {
                if *exclusive {
                    key < value
                } else {
                    key <= value
                }
            }
            KeyRange::Bound {
                lower,
                upper,
                lower_exclusive,
                upper_exclusive,
            } => {
                let lower_ok = if *lower_exclusive {
                    key > lower
                } else {
                    key >= lower
                };
                let upper_ok = if *upper_exclusive {
                    key < upper
                } else {
                    key <= upper
                };
                lower_ok && upper_ok
            }
        }
    }

    /// Converts to the bound pair accepted by `BTreeMap::range`.
    ///
    /// Callers must check `is_empty` first: an inverted pair makes `range` panic.
    pub(crate) fn as_bounds(&self) -> (Bound<&K>, Bound<&K>) {
        fn edge<K>(value: &K, exclusive: bool) -> Bound<&K> {
            if exclusive {
                Bound::Excluded(value)
            } else {
                Bound::Included(value)
            }
        }
        match self {
            KeyRange::All => (Bound::Unbounded, Bound::Unbounded),
            KeyRange::Only(k) => (Bound::Included(k), Bound::Included(k)),
            KeyRange::LowerBound { value, exclusive } => (edge(value, *exclusive), Bound::Unbounded),
            KeyRange::UpperBound { value, exclusive } => (Bound::Unbounded, edge(value, *exclusive)),
            KeyRange::Bound {
                lower,
                upper,
                lower_exclusive,
                upper_exclusive,
            } => (edge(lower, *lower_exclusive), edge(upper, *upper_exclusive)),
        }
    }
}

/// Core trait for all index implementations.
pub trait Index<K> {
    /// Adds a key-value pair to the index.
    /// For unique indexes, this will fail if the key already exists.
    fn add(&mut self, key: K, value: RowId) -> Result<(), IndexError>;

    /// Sets a key-value pair, replacing any existing values for the key.
    fn set(&mut self, key: K, value: RowId);

    /// Gets all row IDs associated with a key, in insertion order.
    fn get(&self, key: &K) -> Vec<RowId>;

    /// Removes a key (and optionally a specific value) from the index.
    /// If value is None, removes all values for the key.
    fn remove(&mut self, key: &K, value: Option<RowId>);

    fn contains_key(&self, key: &K) -> bool;

    /// Returns the number of (key, row id) entries in the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Returns the minimum key and its values.
    fn min(&self) -> Option<(&K, Vec<RowId>)>;

    /// Returns the maximum key and its values.
    fn max(&self) -> Option<(&K, Vec<RowId>)>;
}

/// Trait for indexes that support range queries.
pub trait RangeIndex<K>: Index<K> {
    /// Gets all row IDs within the given key range.
    ///
    /// `reverse` yields the exact reverse of the forward order, including the
    /// order of row ids sharing a key. `skip` and `limit` apply after ordering.
    fn get_range(
        &self,
        range: Option<&KeyRange<K>>,
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId>;
}

/// Error type for index operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Attempted to insert a duplicate key in a unique index.
    #[error("duplicate key in unique index")]
    DuplicateKey,
    #[error("key not found")]
    KeyNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_range_all() {
        let range: KeyRange<i32> = KeyRange::all();
        assert!(range.contains(&-100));
        assert!(range.contains(&100));
    }

    #[test]
    fn test_key_range_only() {
        let range = KeyRange::only(5);
        assert!(!range.contains(&4));
        assert!(range.contains(&5));
        assert!(!range.contains(&6));
    }

    #[test]
    fn test_key_range_lower_bound() {
        let range = KeyRange::lower_bound(5, false);
        assert!(!range.contains(&4));
        assert!(range.contains(&5));

        let range_ex = KeyRange::lower_bound(5, true);
        assert!(!range_ex.contains(&5));
        assert!(range_ex.contains(&6));
    }

    #[test]
    fn test_key_range_upper_bound() {
        let range = KeyRange::upper_bound(5, false);
        assert!(range.contains(&5));
        assert!(!range.contains(&6));

        let range_ex = KeyRange::upper_bound(5, true);
        assert!(range_ex.contains(&4));
        assert!(!range_ex.contains(&5));
    }

    #[test]
    fn test_key_range_between_inclusive() {
        let range = KeyRange::between("B", "D");
        assert!(!range.contains(&"A"));
        assert!(range.contains(&"B"));
        assert!(range.contains(&"C"));
        assert!(range.contains(&"D"));
        assert!(!range.contains(&"E"));
    }

    #[test]
    fn test_key_range_mixed_exclusive() {
        let range1 = KeyRange::bound(5, 10, false, true);
        assert!(range1.contains(&5));
        assert!(!range1.contains(&10));

        let range2 = KeyRange::bound(5, 10, true, false);
        assert!(!range2.contains(&5));
        assert!(range2.contains(&10));
    }

    #[test]
    fn test_key_range_empty() {
        let inverted = KeyRange::bound(10, 5, false, false);
        assert!(inverted.is_empty());
        assert!(!inverted.contains(&7));

        assert!(KeyRange::bound(5, 5, true, false).is_empty());
        assert!(!KeyRange::bound(5, 5, false, false).is_empty());
        assert!(!KeyRange::<i32>::all().is_empty());
    }
}
