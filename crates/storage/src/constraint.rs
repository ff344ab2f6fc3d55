//! Constraint checking.
//!
//! Rows are checked for shape (arity and column types), not-null columns and
//! foreign keys before they reach a `RowStore`. Foreign keys are enforced on the
//! child side only; removing a parent row leaves its children untouched.

use crate::cache::TableCache;
use pawtrack_core::schema::Table;
use pawtrack_core::{Error, Result, Row};

/// Constraint checker for validating rows against their table.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Checks arity, per-column type and the not-null constraint.
    pub fn check_row(schema: &Table, row: &Row) -> Result<()> {
        let columns = schema.columns();
        if row.len() != columns.len() {
            return Err(Error::invalid_operation(format!(
                "Row for {} has {} values, expected {}",
                schema.name(),
                row.len(),
                columns.len()
            )));
        }

        for (column, value) in columns.iter().zip(row.values()) {
            match value.data_type() {
                None if !column.is_nullable() => {
                    return Err(Error::null_constraint(column.name()));
                }
                Some(got) if got != column.data_type() => {
                    return Err(Error::type_mismatch(column.name(), column.data_type(), got));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Checks that every non-null foreign key value of `row` references an
    /// existing parent row.
    pub fn check_foreign_keys(cache: &TableCache, schema: &Table, row: &Row) -> Result<()> {
        for fk in schema.constraints().get_foreign_keys() {
            let parent = cache.table(&fk.parent_table)?;
            let child_col = schema
                .get_column_index(&fk.child_column)
                .ok_or_else(|| Error::column_not_found(schema.name(), &fk.child_column))?;

            let Some(value) = row.get(child_col) else {
                continue;
            };
            if !value.is_null() && !parent.pk_exists(std::slice::from_ref(value)) {
                return Err(Error::foreign_key(
                    &fk.name,
                    format!(
                        "Referenced key {} does not exist in {}",
                        value, fk.parent_table
                    ),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawtrack_core::schema::TableBuilder;
    use pawtrack_core::{DataType, Value};

    fn setup() -> TableCache {
        let profiles = TableBuilder::new("profiles")
            .unwrap()
            .add_column("id", DataType::String)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_primary_key(&["id"])
            .unwrap()
            .build()
            .unwrap();
        let locations = TableBuilder::new("namedLocations")
            .unwrap()
            .add_column("id", DataType::String)
            .unwrap()
            .add_column("dogId", DataType::String)
            .unwrap()
            .add_column("radiusMeters", DataType::Float64)
            .unwrap()
            .add_column("note", DataType::String)
            .unwrap()
            .add_nullable(&["note"])
            .add_primary_key(&["id"])
            .unwrap()
            .add_foreign_key("fk_namedLocations_dogId", "dogId", "profiles", "id")
            .unwrap()
            .build()
            .unwrap();

        let mut cache = TableCache::new();
        cache.create_table(profiles).unwrap();
        cache.create_table(locations).unwrap();
        cache
            .table_mut("profiles")
            .unwrap()
            .insert(Row::create(vec!["d1".into(), "Rex".into()]))
            .unwrap();
        cache
    }

    fn location(dog: &str, radius: Value, note: Value) -> Row {
        Row::create(vec!["l1".into(), dog.into(), radius, note])
    }

    #[test]
    fn test_check_row_accepts_nullable_null() {
        let cache = setup();
        let schema = cache.table("namedLocations").unwrap().schema();
        let row = location("d1", Value::Float64(50.0), Value::Null);
        assert!(ConstraintChecker::check_row(schema, &row).is_ok());
    }

    #[test]
    fn test_check_row_rejects_null_and_type() {
        let cache = setup();
        let schema = cache.table("namedLocations").unwrap().schema();

        let row = Row::create(vec!["l1".into(), Value::Null, Value::Float64(1.0), Value::Null]);
        assert!(matches!(
            ConstraintChecker::check_row(schema, &row),
            Err(Error::NullConstraint { .. })
        ));

        let row = location("d1", Value::Int32(50), Value::Null);
        assert!(matches!(
            ConstraintChecker::check_row(schema, &row),
            Err(Error::TypeMismatch { .. })
        ));

        let row = Row::create(vec!["l1".into()]);
        assert!(ConstraintChecker::check_row(schema, &row).is_err());
    }

    #[test]
    fn test_foreign_key() {
        let cache = setup();
        let schema = cache.table("namedLocations").unwrap().schema();

        let ok = location("d1", Value::Float64(50.0), Value::Null);
        assert!(ConstraintChecker::check_foreign_keys(&cache, schema, &ok).is_ok());

        let orphan = location("ghost", Value::Float64(50.0), Value::Null);
        assert!(matches!(
            ConstraintChecker::check_foreign_keys(&cache, schema, &orphan),
            Err(Error::ForeignKeyViolation { .. })
        ));
    }
}
