//! Persisted schema, version 1.
//!
//! Each table stores `[key, indexed columns.., doc]`; see [`crate::entity`].

use pawtrack_core::schema::{Table, TableBuilder};
use pawtrack_core::{DataType, Result};

pub const SCHEMA_VERSION: u32 = 1;

pub const PROFILES: &str = "profiles";
pub const SETTINGS: &str = "settings";
pub const NAMED_LOCATIONS: &str = "namedLocations";
pub const INCIDENTS: &str = "incidents";
pub const DEPARTURES: &str = "departures";
pub const WEEKLY_TARGETS: &str = "weeklyTargets";
pub const MEDICATION_CONFIGS: &str = "medicationConfigs";
pub const MEDICATION_ENTRIES: &str = "medicationEntries";

pub const INDEX_DOG_TIMESTAMP: &str = "dogId_timestamp";
pub const INDEX_DOG_WEEK_START: &str = "dogId_weekStart";
pub const INDEX_DOG_DATE: &str = "dogId_date";
pub const INDEX_DOG_MEDICATION: &str = "dogId_medicationId";

/// Column holding the owning profile id of a table's rows.
pub fn owner_column(table: &str) -> Option<&'static str> {
    match table {
        PROFILES => Some("id"),
        SETTINGS => Some("activeDogId"),
        NAMED_LOCATIONS | INCIDENTS | DEPARTURES | WEEKLY_TARGETS | MEDICATION_CONFIGS
        | MEDICATION_ENTRIES => Some("dogId"),
        _ => None,
    }
}

fn keyed(name: &str, key: &str, columns: &[(&str, DataType)]) -> Result<TableBuilder> {
    let mut builder = TableBuilder::new(name)?.add_column(key, DataType::String)?;
    for (column, data_type) in columns {
        builder = builder.add_column(*column, *data_type)?;
    }
    builder
        .add_column("doc", DataType::Jsonb)?
        .add_primary_key(&[key])
}

fn owned(builder: TableBuilder, table: &str) -> Result<TableBuilder> {
    builder.add_foreign_key(format!("fk_{table}_dogId"), "dogId", PROFILES, "id")
}

/// Builds every table of the current schema, parents first.
pub fn tables() -> Result<Vec<Table>> {
    use DataType::{Int32, String as Text};

    let profiles = keyed(PROFILES, "id", &[("name", Text)])?
        .add_index("name", &["name"], false)?
        .build()?;

    let settings = keyed(SETTINGS, "activeDogId", &[])?
        .add_foreign_key("fk_settings_activeDogId", "activeDogId", PROFILES, "id")?
        .build()?;

    let named_locations = keyed(NAMED_LOCATIONS, "id", &[("dogId", Text), ("name", Text)])?
        .add_index("dogId", &["dogId"], false)?
        .add_index("name", &["name"], false)?;
    let named_locations = owned(named_locations, NAMED_LOCATIONS)?.build()?;

    let incidents = keyed(
        INCIDENTS,
        "id",
        &[
            ("dogId", Text),
            ("timestamp", Text),
            ("trigger", Text),
            ("intensity", Int32),
        ],
    )?
    .add_index("dogId", &["dogId"], false)?
    .add_index("timestamp", &["timestamp"], false)?
    .add_index(INDEX_DOG_TIMESTAMP, &["dogId", "timestamp"], false)?
    .add_index("trigger", &["trigger"], false)?
    .add_index("intensity", &["intensity"], false)?;
    let incidents = owned(incidents, INCIDENTS)?.build()?;

    let departures = keyed(
        DEPARTURES,
        "id",
        &[
            ("dogId", Text),
            ("timestamp", Text),
            ("exitType", Text),
            ("outcome", Text),
        ],
    )?
    .add_index("dogId", &["dogId"], false)?
    .add_index("timestamp", &["timestamp"], false)?
    .add_index(INDEX_DOG_TIMESTAMP, &["dogId", "timestamp"], false)?
    .add_index("exitType", &["exitType"], false)?
    .add_index("outcome", &["outcome"], false)?;
    let departures = owned(departures, DEPARTURES)?.build()?;

    let weekly_targets = keyed(WEEKLY_TARGETS, "id", &[("dogId", Text), ("weekStart", Text)])?
        .add_index("dogId", &["dogId"], false)?
        .add_index("weekStart", &["weekStart"], false)?
        .add_index(INDEX_DOG_WEEK_START, &["dogId", "weekStart"], false)?;
    let weekly_targets = owned(weekly_targets, WEEKLY_TARGETS)?.build()?;

    let medication_configs = keyed(MEDICATION_CONFIGS, "id", &[("dogId", Text), ("name", Text)])?
        .add_index("dogId", &["dogId"], false)?
        .add_index("name", &["name"], false)?;
    let medication_configs = owned(medication_configs, MEDICATION_CONFIGS)?.build()?;

    let medication_entries = keyed(
        MEDICATION_ENTRIES,
        "id",
        &[("dogId", Text), ("date", Text), ("medicationId", Text)],
    )?
    .add_index("dogId", &["dogId"], false)?
    .add_index("date", &["date"], false)?
    .add_index("medicationId", &["medicationId"], false)?
    .add_index(INDEX_DOG_DATE, &["dogId", "date"], false)?
    .add_index(INDEX_DOG_MEDICATION, &["dogId", "medicationId"], false)?;
    let medication_entries = owned(medication_entries, MEDICATION_ENTRIES)?.build()?;

    Ok(vec![
        profiles,
        settings,
        named_locations,
        incidents,
        departures,
        weekly_targets,
        medication_configs,
        medication_entries,
    ])
}
