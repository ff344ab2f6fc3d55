//! Ordered index backed by `BTreeMap`.

use crate::traits::{Index, IndexError, KeyRange, RangeIndex};
use pawtrack_core::RowId;
use std::collections::BTreeMap;

/// Row ids sharing one key, in insertion order.
type Postings = Vec<RowId>;

/// Ordered index mapping keys to row ids.
///
/// Row ids under the same key keep insertion order, so a forward scan is fully
/// deterministic and a reverse scan is its exact mirror.
#[derive(Clone, Debug)]
pub struct BTreeIndex<K> {
    map: BTreeMap<K, Postings>,
    unique: bool,
    len: usize,
}

impl<K: Ord + Clone> BTreeIndex<K> {
    /// Creates an empty index. A unique index rejects a second row id per key.
    pub fn new(unique: bool) -> Self {
        Self {
            map: BTreeMap::new(),
            unique,
            len: 0,
        }
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.map.len()
    }

    /// Iterates over keys in order, with their row ids.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &[RowId])> {
        self.map.iter().map(|(k, v)| (k, v.as_slice()))
    }

    fn collect<'a, I>(entries: I, reverse: bool, limit: Option<usize>, skip: usize) -> Vec<RowId>
    where
        I: DoubleEndedIterator<Item = &'a Postings>,
    {
        let limit = limit.unwrap_or(usize::MAX);
        if reverse {
            entries
                .rev()
                .flat_map(|ids| ids.iter().rev())
                .skip(skip)
                .take(limit)
                .copied()
                .collect()
        } else {
            entries
                .flat_map(|ids| ids.iter())
                .skip(skip)
                .take(limit)
                .copied()
                .collect()
        }
    }
}

impl<T: Ord + Clone> BTreeIndex<Vec<T>> {
    /// Gets the row ids whose compound key starts with `prefix`.
    ///
    /// Matches are ordered by the full key, so selecting on the leading
    /// component yields rows sorted by the trailing ones.
    pub fn get_prefix(
        &self,
        prefix: &[T],
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId> {
        // A prefix sorts before every key it prefixes, so the matches form one
        // contiguous run starting at the prefix itself.
        let run = self
            .map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, ids)| ids);
        if reverse {
            let matched: Vec<&Postings> = run.collect();
            Self::collect(matched.into_iter(), true, limit, skip)
        } else {
            let limit = limit.unwrap_or(usize::MAX);
            run.flat_map(|ids| ids.iter())
                .skip(skip)
                .take(limit)
                .copied()
                .collect()
        }
    }
}

impl<K: Ord + Clone> Index<K> for BTreeIndex<K> {
    fn add(&mut self, key: K, value: RowId) -> Result<(), IndexError> {
        let ids = self.map.entry(key).or_default();
        if self.unique && !ids.is_empty() {
            return Err(IndexError::DuplicateKey);
        }
        ids.push(value);
        self.len += 1;
        Ok(())
    }

    fn set(&mut self, key: K, value: RowId) {
        let previous = self.map.insert(key, vec![value]);
        self.len = self.len + 1 - previous.map_or(0, |ids| ids.len());
    }

    fn get(&self, key: &K) -> Vec<RowId> {
        self.map.get(key).cloned().unwrap_or_default()
    }

    fn remove(&mut self, key: &K, value: Option<RowId>) {
        let Some(ids) = self.map.get_mut(key) else {
            return;
        };
        match value {
            Some(row_id) => {
                if let Some(pos) = ids.iter().position(|id| *id == row_id) {
                    ids.remove(pos);
                    self.len -= 1;
                }
                if ids.is_empty() {
                    self.map.remove(key);
                }
            }
            None => {
                self.len -= ids.len();
                self.map.remove(key);
            }
        }
    }

    fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.map.clear();
        self.len = 0;
    }

    fn min(&self) -> Option<(&K, Vec<RowId>)> {
        self.map.iter().next().map(|(k, v)| (k, v.clone()))
    }

    fn max(&self) -> Option<(&K, Vec<RowId>)> {
        self.map.iter().next_back().map(|(k, v)| (k, v.clone()))
    }
}

impl<K: Ord + Clone> RangeIndex<K> for BTreeIndex<K> {
    fn get_range(
        &self,
        range: Option<&KeyRange<K>>,
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId> {
        match range {
            None => Self::collect(self.map.values(), reverse, limit, skip),
            Some(r) if r.is_empty() => Vec::new(),
            Some(r) => Self::collect(self.map.range(r.as_bounds()).map(|(_, v)| v), reverse, limit, skip),
        }
    }
}
