//! Mapping between records and table rows.
//!
//! A row is laid out as `[key, indexed columns.., doc]`: the primary key, the
//! values every secondary index reads, then the whole record as a JSON
//! document. Reads only ever decode `doc`.

use crate::error::{Result, StoreError};
use crate::model::TimeKey;
use pawtrack_core::{JsonbValue, Row, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Longest accepted display name, in characters.
pub const MAX_NAME_CHARS: usize = 50;

/// A record type stored in its own table.
pub trait Entity:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const TABLE: &'static str;

    /// JSON field holding the primary key.
    const KEY_FIELD: &'static str = "id";

    fn key(&self) -> &str;

    /// Id of the profile this record belongs to.
    fn owner(&self) -> &str;

    /// Checks field ranges. Runs before anything is written.
    fn validate(&self) -> Result<()>;

    /// Values of the indexed columns that sit between the key and the document.
    fn index_values(&self) -> Vec<Value> {
        Vec::new()
    }
}

/// A record ordered in time within its owner.
pub trait Timeline: Entity {
    /// Compound `(dogId, time)` index.
    const TIME_INDEX: &'static str;

    type Time: TimeKey + Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    fn time(&self) -> &Self::Time;
}

pub(crate) fn to_row<E: Entity>(entity: &E) -> Result<Vec<Value>> {
    let doc = serde_json::to_value(entity)?;
    let indexed = entity.index_values();
    let mut values = Vec::with_capacity(indexed.len() + 2);
    values.push(Value::from(entity.key()));
    values.extend(indexed);
    values.push(Value::Jsonb(JsonbValue::from_json(&doc)));
    Ok(values)
}

pub(crate) fn from_row<E: Entity>(row: &Row) -> Result<E> {
    let doc = row
        .values()
        .last()
        .and_then(Value::as_jsonb)
        .ok_or_else(|| {
            StoreError::storage(format!("row {} of {} carries no document", row.id(), E::TABLE))
        })?;
    Ok(serde_json::from_str(doc.as_str())?)
}

/// Applies a partial object to a record.
///
/// Fields present in `patch` replace the record's; `null` clears an optional
/// field. The key field may be repeated but not changed.
pub(crate) fn merge_patch<E: Entity>(current: &E, patch: serde_json::Value) -> Result<E> {
    let serde_json::Value::Object(fields) = patch else {
        return Err(StoreError::validation("patch", "must be a JSON object"));
    };

    let mut doc = serde_json::to_value(current)?;
    let Some(target) = doc.as_object_mut() else {
        return Err(StoreError::storage(format!("{} record is not an object", E::TABLE)));
    };

    for (field, value) in fields {
        if field == E::KEY_FIELD {
            if value.as_str() != Some(current.key()) {
                return Err(StoreError::validation(field, "the key cannot change"));
            }
            continue;
        }
        if value.is_null() {
            target.remove(&field);
        } else {
            target.insert(field, value);
        }
    }

    serde_json::from_value(doc).map_err(|e| StoreError::validation(E::TABLE, e.to_string()))
}

pub(crate) fn check_name(field: &str, name: &str) -> Result<()> {
    let chars = name.trim().chars().count();
    if chars == 0 {
        return Err(StoreError::validation(field, "must not be blank"));
    }
    if chars > MAX_NAME_CHARS {
        return Err(StoreError::validation(
            field,
            format!("must be at most {MAX_NAME_CHARS} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn check_owner(field: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(StoreError::validation(field, "must reference a profile"));
    }
    Ok(())
}

pub(crate) fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + fmt::Display,
{
    // Negated so NaN is rejected too.
    if !(value >= min && value <= max) {
        return Err(StoreError::validation(
            field,
            format!("{value} is not between {min} and {max}"),
        ));
    }
    Ok(())
}

pub(crate) fn check_tags(tags: &[String]) -> Result<()> {
    if tags.iter().any(|t| t.trim().is_empty()) {
        return Err(StoreError::validation("tags", "must not contain blank tags"));
    }
    Ok(())
}
