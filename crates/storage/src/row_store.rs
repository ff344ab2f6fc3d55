//! Row storage for a single table.
//!
//! `RowStore` owns the rows of one table together with its primary-key index and
//! every declared secondary index. Index keys are `Vec<Value>` built from the
//! indexed columns in declaration order, so a compound index orders rows by its
//! leading column first.

use pawtrack_core::schema::Table;
use pawtrack_core::{Error, Result, Row, RowId, Value};
use pawtrack_index::{BTreeIndex, Index, KeyRange, RangeIndex};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A compound index key.
pub type IndexKey = Vec<Value>;

struct SecondaryIndex {
    columns: Vec<usize>,
    index: BTreeIndex<IndexKey>,
}

/// Extracts the key for the given column positions from a row.
fn extract_key(row: &Row, columns: &[usize]) -> IndexKey {
    columns
        .iter()
        .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Row storage for a single table.
pub struct RowStore {
    schema: Table,
    /// Keyed by row id, which is allocated monotonically, so iteration follows
    /// insertion order.
    rows: BTreeMap<RowId, Arc<Row>>,
    primary_index: Option<BTreeIndex<IndexKey>>,
    pk_columns: Vec<usize>,
    secondary_indices: BTreeMap<String, SecondaryIndex>,
}

impl RowStore {
    /// Creates a new row store for the given table schema.
    pub fn new(schema: Table) -> Result<Self> {
        let (primary_index, pk_columns) = match schema.primary_key() {
            Some(pk) => (Some(BTreeIndex::new(true)), schema.column_positions(pk)?),
            None => (None, Vec::new()),
        };

        let mut secondary_indices = BTreeMap::new();
        for def in schema.indices() {
            secondary_indices.insert(
                def.name().to_owned(),
                SecondaryIndex {
                    columns: schema.column_positions(def)?,
                    index: BTreeIndex::new(def.is_unique()),
                },
            );
        }

        Ok(Self {
            schema,
            rows: BTreeMap::new(),
            primary_index,
            pk_columns,
            secondary_indices,
        })
    }

    #[inline]
    pub fn schema(&self) -> &Table {
        &self.schema
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the primary key of a row.
    pub fn extract_pk(&self, row: &Row) -> IndexKey {
        extract_key(row, &self.pk_columns)
    }

    /// Inserts a row into the store.
    pub fn insert(&mut self, row: Row) -> Result<RowId> {
        let row_id = row.id();
        if self.rows.contains_key(&row_id) {
            return Err(Error::invalid_operation("Row ID already exists"));
        }

        if let Some(pk_index) = self.primary_index.as_mut() {
            let pk = extract_key(&row, &self.pk_columns);
            if pk_index.add(pk.clone(), row_id).is_err() {
                return Err(Error::unique_constraint("primary_key", key_value(pk)));
            }
        }

        let mut added: Vec<String> = Vec::new();
        let mut failure = None;
        for (name, idx) in &mut self.secondary_indices {
            let key = extract_key(&row, &idx.columns);
            if idx.index.add(key.clone(), row_id).is_err() {
                failure = Some(Error::unique_constraint(name.clone(), key_value(key)));
                break;
            }
            added.push(name.clone());
        }

        if let Some(err) = failure {
            self.unindex(row_id, &row, &added);
            return Err(err);
        }

        self.rows.insert(row_id, Arc::new(row));
        Ok(row_id)
    }

    /// Removes a half-inserted row from the primary index and the named
    /// secondary indexes.
    fn unindex(&mut self, row_id: RowId, row: &Row, secondary: &[String]) {
        if let Some(pk_index) = self.primary_index.as_mut() {
            pk_index.remove(&extract_key(row, &self.pk_columns), Some(row_id));
        }
        for name in secondary {
            if let Some(idx) = self.secondary_indices.get_mut(name) {
                idx.index.remove(&extract_key(row, &idx.columns), Some(row_id));
            }
        }
    }

    /// Replaces the row stored under `row_id`. Returns the previous row.
    pub fn update(&mut self, row_id: RowId, new_row: Row) -> Result<Arc<Row>> {
        let old_row = self
            .rows
            .get(&row_id)
            .cloned()
            .ok_or_else(|| Error::not_found(self.schema.name(), Value::Int64(row_id as i64)))?;

        // Check every uniqueness constraint before touching any index.
        if let Some(pk_index) = self.primary_index.as_ref() {
            let old_pk = extract_key(&old_row, &self.pk_columns);
            let new_pk = extract_key(&new_row, &self.pk_columns);
            if old_pk != new_pk && pk_index.contains_key(&new_pk) {
                return Err(Error::unique_constraint("primary_key", key_value(new_pk)));
            }
        }
        for (name, idx) in &self.secondary_indices {
            let old_key = extract_key(&old_row, &idx.columns);
            let new_key = extract_key(&new_row, &idx.columns);
            if idx.index.is_unique() && old_key != new_key && idx.index.contains_key(&new_key) {
                return Err(Error::unique_constraint(name.clone(), key_value(new_key)));
            }
        }

        if let Some(pk_index) = self.primary_index.as_mut() {
            let old_pk = extract_key(&old_row, &self.pk_columns);
            let new_pk = extract_key(&new_row, &self.pk_columns);
            if old_pk != new_pk {
                pk_index.remove(&old_pk, Some(row_id));
                pk_index.set(new_pk, row_id);
            }
        }
        for idx in self.secondary_indices.values_mut() {
            let old_key = extract_key(&old_row, &idx.columns);
            let new_key = extract_key(&new_row, &idx.columns);
            if old_key != new_key {
                idx.index.remove(&old_key, Some(row_id));
                // Uniqueness was checked above.
                let _ = idx.index.add(new_key, row_id);
            }
        }

        self.rows.insert(row_id, Arc::new(new_row));
        Ok(old_row)
    }

    /// Deletes a row from the store.
    pub fn delete(&mut self, row_id: RowId) -> Result<Arc<Row>> {
        let row = self
            .rows
            .remove(&row_id)
            .ok_or_else(|| Error::not_found(self.schema.name(), Value::Int64(row_id as i64)))?;

        if let Some(pk_index) = self.primary_index.as_mut() {
            pk_index.remove(&extract_key(&row, &self.pk_columns), Some(row_id));
        }
        for idx in self.secondary_indices.values_mut() {
            idx.index.remove(&extract_key(&row, &idx.columns), Some(row_id));
        }

        Ok(row)
    }

    /// Gets a row by ID.
    pub fn get(&self, row_id: RowId) -> Option<Arc<Row>> {
        self.rows.get(&row_id).cloned()
    }

    /// Returns all rows in insertion order.
    pub fn scan(&self) -> impl Iterator<Item = Arc<Row>> + '_ {
        self.rows.values().cloned()
    }

    /// Gets the row with the given primary key.
    pub fn get_by_pk(&self, pk: &[Value]) -> Option<Arc<Row>> {
        let pk_index = self.primary_index.as_ref()?;
        pk_index
            .get(&pk.to_vec())
            .first()
            .and_then(|id| self.rows.get(id).cloned())
    }

    /// Checks whether a row with the given primary key exists.
    pub fn pk_exists(&self, pk: &[Value]) -> bool {
        self.primary_index
            .as_ref()
            .is_some_and(|idx| idx.contains_key(&pk.to_vec()))
    }

    pub fn has_index(&self, index_name: &str) -> bool {
        self.secondary_indices.contains_key(index_name)
    }

    fn secondary(&self, index_name: &str) -> Result<&SecondaryIndex> {
        self.secondary_indices
            .get(index_name)
            .ok_or_else(|| Error::index_not_found(self.schema.name(), index_name))
    }

    fn resolve(&self, ids: Vec<RowId>) -> Vec<Arc<Row>> {
        ids.into_iter()
            .filter_map(|id| self.rows.get(&id).cloned())
            .collect()
    }

    /// Scans a secondary index over a key range.
    ///
    /// Rows come back in index order (descending when `reverse`), rows sharing
    /// a key in insertion order. `skip` and `limit` apply after ordering.
    pub fn index_scan(
        &self,
        index_name: &str,
        range: Option<&KeyRange<IndexKey>>,
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<Vec<Arc<Row>>> {
        let idx = self.secondary(index_name)?;
        Ok(self.resolve(idx.index.get_range(range, reverse, limit, skip)))
    }

    /// Scans the rows of a (compound) secondary index whose key starts with
    /// `prefix`.
    pub fn index_prefix_scan(
        &self,
        index_name: &str,
        prefix: &[Value],
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<Vec<Arc<Row>>> {
        let idx = self.secondary(index_name)?;
        Ok(self.resolve(idx.index.get_prefix(prefix, reverse, limit, skip)))
    }

    /// Removes every row.
    pub fn clear(&mut self) {
        self.rows.clear();
        if let Some(pk_index) = self.primary_index.as_mut() {
            pk_index.clear();
        }
        for idx in self.secondary_indices.values_mut() {
            idx.index.clear();
        }
    }
}

/// Renders a key for error reporting: single-column keys unwrap to the value.
fn key_value(mut key: IndexKey) -> Value {
    if key.len() == 1 {
        key.remove(0)
    } else {
        Value::String(
            key.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawtrack_core::schema::TableBuilder;
    use pawtrack_core::DataType;

    fn incidents() -> Table {
        TableBuilder::new("incidents")
            .unwrap()
            .add_column("id", DataType::String)
            .unwrap()
            .add_column("dogId", DataType::String)
            .unwrap()
            .add_column("timestamp", DataType::String)
            .unwrap()
            .add_column("intensity", DataType::Int32)
            .unwrap()
            .add_primary_key(&["id"])
            .unwrap()
            .add_index("dogId", &["dogId"], false)
            .unwrap()
            .add_index("dogId_timestamp", &["dogId", "timestamp"], false)
            .unwrap()
            .build()
            .unwrap()
    }

    fn incident(row_id: RowId, id: &str, dog: &str, ts: &str, intensity: i32) -> Row {
        Row::new(
            row_id,
            vec![id.into(), dog.into(), ts.into(), Value::Int32(intensity)],
        )
    }

    #[test]
    fn test_insert_and_get_by_pk() {
        let mut store = RowStore::new(incidents()).unwrap();
        store.insert(incident(1, "i1", "d1", "2024-01-01T00:00:00.000Z", 3)).unwrap();

        assert_eq!(store.len(), 1);
        let row = store.get_by_pk(&["i1".into()]).unwrap();
        assert_eq!(row.get(3), Some(&Value::Int32(3)));
        assert!(store.pk_exists(&["i1".into()]));
        assert!(!store.pk_exists(&["i2".into()]));
    }

    #[test]
    fn test_duplicate_pk_rejected_without_residue() {
        let mut store = RowStore::new(incidents()).unwrap();
        store.insert(incident(1, "i1", "d1", "2024-01-01T00:00:00.000Z", 3)).unwrap();
        let err = store
            .insert(incident(2, "i1", "d2", "2024-01-02T00:00:00.000Z", 1))
            .unwrap_err();
        assert!(matches!(err, Error::UniqueConstraint { .. }));
        assert_eq!(store.len(), 1);
        assert!(store
            .index_prefix_scan("dogId", &["d2".into()], false, None, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_update_moves_index_entries() {
        let mut store = RowStore::new(incidents()).unwrap();
        store.insert(incident(1, "i1", "d1", "2024-01-01T00:00:00.000Z", 3)).unwrap();
        let old = store
            .update(1, incident(1, "i1", "d2", "2024-01-01T00:00:00.000Z", 4))
            .unwrap();
        assert_eq!(old.get(1), Some(&Value::from("d1")));

        let d1 = store.index_scan("dogId", Some(&KeyRange::only(vec!["d1".into()])), false, None, 0);
        assert!(d1.unwrap().is_empty());
        let d2 = store.index_scan("dogId", Some(&KeyRange::only(vec!["d2".into()])), false, None, 0);
        assert_eq!(d2.unwrap().len(), 1);
    }

    #[test]
    fn test_update_missing_row() {
        let mut store = RowStore::new(incidents()).unwrap();
        let err = store
            .update(9, incident(9, "i9", "d1", "2024-01-01T00:00:00.000Z", 1))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_delete() {
        let mut store = RowStore::new(incidents()).unwrap();
        store.insert(incident(1, "i1", "d1", "2024-01-01T00:00:00.000Z", 3)).unwrap();
        store.delete(1).unwrap();
        assert!(store.is_empty());
        assert!(!store.pk_exists(&["i1".into()]));
        assert!(store.delete(1).is_err());
    }

    #[test]
    fn test_compound_scan_descending() {
        let mut store = RowStore::new(incidents()).unwrap();
        store.insert(incident(1, "i1", "d1", "2024-01-01T00:00:00.000Z", 1)).unwrap();
        store.insert(incident(2, "i2", "d1", "2024-01-03T00:00:00.000Z", 2)).unwrap();
        store.insert(incident(3, "i3", "d2", "2024-01-02T00:00:00.000Z", 3)).unwrap();
        store.insert(incident(4, "i4", "d1", "2024-01-02T00:00:00.000Z", 4)).unwrap();

        let rows = store
            .index_prefix_scan("dogId_timestamp", &["d1".into()], true, None, 0)
            .unwrap();
        let ids: Vec<RowId> = rows.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![2, 4, 1]);
    }

    #[test]
    fn test_scan_insertion_order() {
        let mut store = RowStore::new(incidents()).unwrap();
        store.insert(incident(5, "b", "d1", "2024-01-01T00:00:00.000Z", 1)).unwrap();
        store.insert(incident(6, "a", "d1", "2024-01-01T00:00:00.000Z", 1)).unwrap();
        let pks: Vec<Value> = store.scan().map(|r| r.get(0).cloned().unwrap()).collect();
        assert_eq!(pks, vec![Value::from("b"), Value::from("a")]);
    }

    #[test]
    fn test_unknown_index() {
        let store = RowStore::new(incidents()).unwrap();
        let err = store.index_scan("trigger", None, false, None, 0).unwrap_err();
        assert!(matches!(err, Error::IndexNotFound { .. }));
    }
}
