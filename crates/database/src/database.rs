//! The store handle.
//!
//! `Database` owns the table cache, the durable backend and the live query
//! registry. It is cheap to clone; clones share one store. Writers hold the
//! write guard across the durable append, so writes are applied one at a time
//! and a write is visible to readers only once it is durable.

use crate::config::{BackendConfig, StoreConfig};
use crate::entity::{self, Entity, Timeline};
use crate::error::{Result, StoreError};
use crate::model::{
    Departure, Incident, IncidentLocation, IsoDate, MedicationEntry, NamedLocation, Profile,
    Settings, TimeKey, Timestamp, WeeklyTarget,
};
use crate::schema::{self, INDEX_DOG_MEDICATION, SCHEMA_VERSION};
use pawtrack_core::{Row, Value};
use pawtrack_geo::{nearest_match, Coordinate};
use pawtrack_query::{SortOrder, Window};
use pawtrack_reactive::{ChangeSet, QueryRegistry};
use pawtrack_storage::{
    replay, AppendLogBackend, JournalEntry, LogRecord, MemoryBackend, StorageBackend, TableCache,
    Transaction,
};
use std::slice;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

struct DbState {
    cache: TableCache,
    backend: Box<dyn StorageBackend>,
}

struct DbInner {
    state: RwLock<DbState>,
    registry: QueryRegistry,
    config: StoreConfig,
}

/// Handle to an open store.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DbInner>,
}

/// The named location that best contains a point.
#[derive(Clone, Debug, PartialEq)]
pub struct NearestLocation {
    pub location: NamedLocation,
    pub distance_meters: f64,
}

impl Database {
    /// Opens a store, replaying whatever the configured backend holds.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let backend: Box<dyn StorageBackend> = match &config.backend {
            BackendConfig::Memory => Box::new(MemoryBackend::new()),
            BackendConfig::AppendLog { path, sync } => {
                Box::new(AppendLogBackend::open(path, *sync).await?)
            }
        };
        Self::with_backend(config, backend).await
    }

    /// Opens a store over a caller-supplied backend. `config.backend` is
    /// ignored.
    ///
    /// Live queries run on the tokio runtime this is called from, if any.
    pub async fn with_backend(
        config: StoreConfig,
        mut backend: Box<dyn StorageBackend>,
    ) -> Result<Self> {
        let mut cache = TableCache::new();
        for table in schema::tables()? {
            cache.create_table(table)?;
        }

        let records = backend.load().await?;
        let applied = replay(&records, &mut cache)?;
        info!(
            backend = backend.name(),
            schema_version = SCHEMA_VERSION,
            records = applied,
            rows = cache.total_row_count(),
            "store opened"
        );

        Ok(Self {
            inner: Arc::new(DbInner {
                state: RwLock::new(DbState { cache, backend }),
                registry: Handle::try_current()
                    .map_or_else(|_| QueryRegistry::new(), QueryRegistry::with_runtime),
                config,
            }),
        })
    }

    /// Opens an empty store that keeps nothing past the process.
    pub async fn in_memory() -> Result<Self> {
        Self::open(StoreConfig::in_memory()).await
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Registry driving this store's live queries.
    pub fn registry(&self) -> &QueryRegistry {
        &self.inner.registry
    }

    /// Number of rows in `table`.
    pub async fn count(&self, table: &str) -> Result<usize> {
        self.read(|cache| Ok(cache.table(table)?.len())).await
    }

    pub(crate) async fn read<R>(&self, op: impl FnOnce(&TableCache) -> Result<R>) -> Result<R> {
        let state = self.inner.state.read().await;
        op(&state.cache)
    }

    /// Runs `op` as one transaction: on success the changes are appended to the
    /// backend, committed and announced to live queries; on any failure they are
    /// rolled back.
    pub(crate) async fn write<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&mut TableCache, &mut Transaction) -> Result<R> + Send,
        R: Send,
    {
        let mut guard = self.inner.state.write().await;
        let DbState { cache, backend } = &mut *guard;

        let mut tx = Transaction::begin();
        let out = match op(cache, &mut tx) {
            Ok(out) => out,
            Err(err) => return Err(abort(tx, cache, err)),
        };
        if tx.changes().is_empty() {
            tx.commit()?;
            return Ok(out);
        }

        let records: pawtrack_core::Result<Vec<LogRecord>> = tx
            .changes()
            .iter()
            .map(|entry| LogRecord::from_entry(entry, cache))
            .collect();
        let records = match records {
            Ok(records) => records,
            Err(err) => return Err(abort(tx, cache, err.into())),
        };
        if let Err(err) = backend.append(&records).await {
            warn!(backend = backend.name(), error = %err, "durable append failed");
            return Err(abort(tx, cache, err.into()));
        }

        let entries = tx.commit()?;
        let changes = change_set(cache, &entries);
        drop(guard);

        self.inner.registry.on_commit(changes);
        Ok(out)
    }

    // Generic record operations

    /// Inserts a new record and returns its key.
    ///
    /// Fails with `Conflict` when the key is taken.
    pub async fn add<E: Entity>(&self, record: E) -> Result<String> {
        record.validate()?;
        self.write(move |cache, tx| {
            insert(cache, tx, &record)?;
            Ok(record.key().to_owned())
        })
        .await
    }

    /// Inserts or replaces a record and returns its key.
    pub async fn put<E: Entity>(&self, record: E) -> Result<String> {
        record.validate()?;
        self.write(move |cache, tx| {
            upsert(cache, tx, &record)?;
            Ok(record.key().to_owned())
        })
        .await
    }

    pub async fn get<E: Entity>(&self, key: &str) -> Result<E> {
        self.find::<E>(key)
            .await?
            .ok_or_else(|| StoreError::not_found(E::TABLE, key))
    }

    pub async fn find<E: Entity>(&self, key: &str) -> Result<Option<E>> {
        self.read(|cache| Ok(lookup::<E>(cache, key)?.map(|(_, record)| record)))
            .await
    }

    /// Every record of a table, in insertion order.
    pub async fn to_array<E: Entity>(&self) -> Result<Vec<E>> {
        self.read(|cache| {
            cache
                .table(E::TABLE)?
                .scan()
                .map(|row| entity::from_row(&row))
                .collect()
        })
        .await
    }

    /// Merges `patch`, a partial JSON object, into the stored record.
    pub async fn update<E: Entity>(&self, key: &str, patch: serde_json::Value) -> Result<E> {
        let key = key.to_owned();
        self.write(move |cache, tx| {
            let (row, current) = lookup::<E>(cache, &key)?
                .ok_or_else(|| StoreError::not_found(E::TABLE, key.as_str()))?;
            let updated = entity::merge_patch(&current, patch)?;
            updated.validate()?;
            let values = entity::to_row(&updated)?;
            tx.update(cache, E::TABLE, row.id(), row.successor(values))?;
            Ok(updated)
        })
        .await
    }

    /// Removes a record and returns it.
    pub async fn delete<E: Entity>(&self, key: &str) -> Result<E> {
        let key = key.to_owned();
        self.write(move |cache, tx| {
            let (row, current) = lookup::<E>(cache, &key)?
                .ok_or_else(|| StoreError::not_found(E::TABLE, key.as_str()))?;
            tx.delete(cache, E::TABLE, row.id())?;
            Ok(current)
        })
        .await
    }

    /// Records whose `index` key equals `key`, or starts with it for a
    /// compound index.
    pub async fn where_equals<E: Entity>(&self, index: &str, key: &[Value]) -> Result<Vec<E>> {
        self.read(|cache| {
            let rows = pawtrack_query::equals(
                cache.table(E::TABLE)?,
                index,
                key,
                SortOrder::Ascending,
                None,
            )?;
            decode(&rows)
        })
        .await
    }

    // Timelines

    /// Records of `owner` whose time lies in `[start, end]`.
    pub async fn range_by_owner_and_time<E: Timeline>(
        &self,
        owner: &str,
        start: &E::Time,
        end: &E::Time,
        order: SortOrder,
    ) -> Result<Vec<E>> {
        let owner = Value::from(owner);
        let start = Value::from(start.as_key());
        let end = Value::from(end.as_key());
        self.read(|cache| {
            let rows = pawtrack_query::range_by_owner_and_time(
                cache.table(E::TABLE)?,
                E::TIME_INDEX,
                &owner,
                &start,
                &end,
                order,
                None,
            )?;
            decode(&rows)
        })
        .await
    }

    /// A window of `owner`'s records, newest first.
    pub async fn timeline_page<E: Timeline>(&self, owner: &str, window: Window) -> Result<Vec<E>> {
        let owner = Value::from(owner);
        self.read(|cache| {
            let rows = pawtrack_query::by_owner(
                cache.table(E::TABLE)?,
                E::TIME_INDEX,
                &owner,
                SortOrder::Descending,
                Some(window),
            )?;
            decode(&rows)
        })
        .await
    }

    // Profiles

    /// Creates a profile together with its default settings.
    pub async fn create_profile(&self, name: &str) -> Result<Profile> {
        let profile = Profile::new(name.trim());
        profile.validate()?;
        let settings = Settings::defaults(profile.id.as_str());
        self.write(move |cache, tx| {
            insert(cache, tx, &profile)?;
            insert(cache, tx, &settings)?;
            Ok(profile)
        })
        .await
    }

    pub async fn rename_profile(&self, id: &str, name: &str) -> Result<Profile> {
        self.update(id, serde_json::json!({ "name": name.trim() }))
            .await
    }

    /// The profile being tracked: the first one created.
    pub async fn active_profile(&self) -> Result<Option<Profile>> {
        self.read(|cache| {
            cache
                .table(schema::PROFILES)?
                .scan()
                .next()
                .map(|row| entity::from_row(&row))
                .transpose()
        })
        .await
    }

    // Logs

    /// Incidents of `dog_id` in `[start, end]`, newest first.
    pub async fn incidents_in_range(
        &self,
        dog_id: &str,
        start: &Timestamp,
        end: &Timestamp,
    ) -> Result<Vec<Incident>> {
        self.range_by_owner_and_time(dog_id, start, end, SortOrder::Descending)
            .await
    }

    /// Departures of `dog_id` in `[start, end]`, newest first.
    pub async fn departures_in_range(
        &self,
        dog_id: &str,
        start: &Timestamp,
        end: &Timestamp,
    ) -> Result<Vec<Departure>> {
        self.range_by_owner_and_time(dog_id, start, end, SortOrder::Descending)
            .await
    }

    /// Medication entries of `dog_id` dated within `[start, end]`, oldest first.
    pub async fn medication_entries_in_range(
        &self,
        dog_id: &str,
        start: &IsoDate,
        end: &IsoDate,
    ) -> Result<Vec<MedicationEntry>> {
        self.range_by_owner_and_time(dog_id, start, end, SortOrder::Ascending)
            .await
    }

    pub async fn medication_entries_for(
        &self,
        dog_id: &str,
        medication_id: &str,
    ) -> Result<Vec<MedicationEntry>> {
        self.where_equals(
            INDEX_DOG_MEDICATION,
            &[Value::from(dog_id), Value::from(medication_id)],
        )
        .await
    }

    pub async fn weekly_target(
        &self,
        dog_id: &str,
        week_start: &IsoDate,
    ) -> Result<Option<WeeklyTarget>> {
        let found = self
            .range_by_owner_and_time::<WeeklyTarget>(
                dog_id,
                week_start,
                week_start,
                SortOrder::Ascending,
            )
            .await?;
        Ok(found.into_iter().next())
    }

    /// Sets the target for one week, replacing the week's existing target.
    ///
    /// There is at most one target per profile and week.
    pub async fn set_weekly_target(
        &self,
        dog_id: &str,
        week_start: &IsoDate,
        target_duration: u32,
    ) -> Result<WeeklyTarget> {
        let candidate = WeeklyTarget::new(dog_id, week_start.clone(), target_duration);
        candidate.validate()?;
        self.write(move |cache, tx| {
            let key = [
                Value::from(candidate.dog_id.as_str()),
                Value::from(candidate.week_start.as_str()),
            ];
            let existing = cache
                .table(WeeklyTarget::TABLE)?
                .index_prefix_scan(WeeklyTarget::TIME_INDEX, &key, false, Some(1), 0)?;
            let target = match existing.first() {
                Some(row) => {
                    let mut target: WeeklyTarget = entity::from_row(row)?;
                    target.target_duration = candidate.target_duration;
                    let values = entity::to_row(&target)?;
                    tx.update(cache, WeeklyTarget::TABLE, row.id(), row.successor(values))?;
                    target
                }
                None => {
                    insert(cache, tx, &candidate)?;
                    candidate
                }
            };
            Ok(target)
        })
        .await
    }

    // Places

    /// Named locations of `dog_id`, in creation order.
    pub async fn named_locations(&self, dog_id: &str) -> Result<Vec<NamedLocation>> {
        self.where_equals("dogId", &[Value::from(dog_id)]).await
    }

    /// The named location of `dog_id` closest to `point` among those whose
    /// radius contains it.
    pub async fn find_nearest_location(
        &self,
        dog_id: &str,
        point: Coordinate,
    ) -> Result<Option<NearestLocation>> {
        point
            .validate()
            .map_err(|e| StoreError::validation("point", e.to_string()))?;
        let locations = self.named_locations(dog_id).await?;
        Ok(nearest_match(point, &locations).map(|found| NearestLocation {
            location: found.place.clone(),
            distance_meters: found.distance,
        }))
    }

    /// Where an incident happened, resolved against the named locations.
    pub async fn resolve_location(&self, dog_id: &str, point: Coordinate) -> Result<IncidentLocation> {
        let nearest = self.find_nearest_location(dog_id, point).await?;
        let mut location = IncidentLocation::from(point);
        location.named_location_id = nearest.map(|n| n.location.id);
        Ok(location)
    }
}

fn abort(tx: Transaction, cache: &mut TableCache, err: StoreError) -> StoreError {
    if let Err(rollback) = tx.rollback(cache) {
        warn!(error = %rollback, "rollback failed");
    }
    err
}

/// Owners touched by a committed transaction, per table.
fn change_set(cache: &TableCache, entries: &[JournalEntry]) -> ChangeSet {
    let mut changes = ChangeSet::new();
    for entry in entries {
        let table = entry.table();
        let owner_col = schema::owner_column(table).and_then(|column| {
            cache
                .get_table(table)
                .and_then(|store| store.schema().get_column_index(column))
        });
        for row in entry.touched_rows() {
            let owner = owner_col.and_then(|i| row.get(i)).and_then(Value::as_str);
            let key = row.get(0).and_then(Value::as_str).unwrap_or_default();
            debug!(table, key, owner = owner.unwrap_or_default(), "committed write");
            changes.touch(table, owner);
        }
    }
    changes
}

fn decode<E: Entity>(rows: &[Arc<Row>]) -> Result<Vec<E>> {
    rows.iter().map(|row| entity::from_row(row)).collect()
}

pub(crate) fn lookup<E: Entity>(cache: &TableCache, key: &str) -> Result<Option<(Arc<Row>, E)>> {
    let key = Value::from(key);
    match cache.table(E::TABLE)?.get_by_pk(slice::from_ref(&key)) {
        Some(row) => Ok(Some((Arc::clone(&row), entity::from_row(&row)?))),
        None => Ok(None),
    }
}

pub(crate) fn insert<E: Entity>(cache: &mut TableCache, tx: &mut Transaction, record: &E) -> Result<()> {
    let key = Value::from(record.key());
    if cache.table(E::TABLE)?.pk_exists(slice::from_ref(&key)) {
        return Err(StoreError::conflict(E::TABLE, record.key()));
    }
    tx.insert(cache, E::TABLE, Row::create(entity::to_row(record)?))?;
    Ok(())
}

pub(crate) fn upsert<E: Entity>(cache: &mut TableCache, tx: &mut Transaction, record: &E) -> Result<()> {
    match lookup::<E>(cache, record.key())? {
        Some((_, current)) if current == *record => {}
        Some((row, _)) => {
            tx.update(cache, E::TABLE, row.id(), row.successor(entity::to_row(record)?))?;
        }
        None => {
            tx.insert(cache, E::TABLE, Row::create(entity::to_row(record)?))?;
        }
    }
    Ok(())
}
