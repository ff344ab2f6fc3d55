//! Live queries over the store.
//!
//! Each function subscribes a read to the store's registry and returns the
//! handle. The subscription re-runs after commits touching the tables and
//! owners it depends on, and stops when the handle is cancelled or dropped.
//!
//! Queries run on the tokio runtime the store was opened on, so the handles
//! can be created from any thread. A store opened outside of a runtime can
//! only start live queries from inside one.

use crate::database::Database;
use crate::entity::{Entity, Timeline};
use crate::error::StoreError;
use crate::model::{Incident, NamedLocation, Profile, Settings};
use crate::schema::{NAMED_LOCATIONS, PROFILES, SETTINGS};
use pawtrack_query::{SortOrder, Window};
use pawtrack_reactive::{Dependency, LiveQuery, QueryFuture};

/// A live query over the store keyed by `K`.
pub type Live<K, T> = LiveQuery<Database, K, T, StoreError>;

/// Key of a live time range: owner, first and last time, order.
pub type RangeKey<E> = (String, <E as Timeline>::Time, <E as Timeline>::Time, SortOrder);

impl Database {
    /// A window of `owner`'s incidents, newest first. Grow the window with
    /// `set_key` to load more.
    ///
    /// # Panics
    ///
    /// Panics if the store was opened outside of a tokio runtime and this is
    /// called outside of one too.
    pub fn live_incidents(
        &self,
        owner: impl Into<String>,
        window: Window,
    ) -> Live<(String, Window), Vec<Incident>> {
        self.registry().subscribe(
            self.clone(),
            (owner.into(), window),
            |(owner, _): &(String, Window)| vec![Dependency::owned(Incident::TABLE, owner.as_str())],
            timeline_page::<Incident>,
        )
    }

    /// Panics under the same conditions as [`Database::live_incidents`].
    pub fn live_named_locations(&self, owner: impl Into<String>) -> Live<String, Vec<NamedLocation>> {
        self.registry().subscribe(
            self.clone(),
            owner.into(),
            |owner: &String| vec![Dependency::owned(NAMED_LOCATIONS, owner.as_str())],
            named_locations,
        )
    }

    /// Panics under the same conditions as [`Database::live_incidents`].
    pub fn live_active_profile(&self) -> Live<(), Option<Profile>> {
        self.registry().subscribe(
            self.clone(),
            (),
            |_: &()| vec![Dependency::table(PROFILES)],
            active_profile,
        )
    }

    /// `owner`'s settings, or the defaults while none are stored.
    ///
    /// Panics under the same conditions as [`Database::live_incidents`].
    pub fn live_settings(&self, owner: impl Into<String>) -> Live<String, Settings> {
        self.registry().subscribe(
            self.clone(),
            owner.into(),
            |owner: &String| vec![Dependency::owned(SETTINGS, owner.as_str())],
            settings_or_defaults,
        )
    }

    /// `owner`'s records of one timeline within `[start, end]`.
    ///
    /// Panics under the same conditions as [`Database::live_incidents`].
    pub fn live_timeline_range<E: Timeline>(
        &self,
        owner: impl Into<String>,
        start: E::Time,
        end: E::Time,
        order: SortOrder,
    ) -> Live<RangeKey<E>, Vec<E>> {
        self.registry().subscribe(
            self.clone(),
            (owner.into(), start, end, order),
            |key: &RangeKey<E>| vec![Dependency::owned(E::TABLE, key.0.as_str())],
            timeline_range::<E>,
        )
    }
}

fn timeline_page<E: Timeline>(
    db: Database,
    (owner, window): (String, Window),
) -> QueryFuture<Vec<E>, StoreError> {
    Box::pin(async move { db.timeline_page::<E>(&owner, window).await })
}

fn timeline_range<E: Timeline>(db: Database, key: RangeKey<E>) -> QueryFuture<Vec<E>, StoreError> {
    let (owner, start, end, order) = key;
    Box::pin(async move {
        db.range_by_owner_and_time::<E>(&owner, &start, &end, order)
            .await
    })
}

fn named_locations(db: Database, owner: String) -> QueryFuture<Vec<NamedLocation>, StoreError> {
    Box::pin(async move { db.named_locations(&owner).await })
}

fn active_profile(db: Database, _: ()) -> QueryFuture<Option<Profile>, StoreError> {
    Box::pin(async move { db.active_profile().await })
}

fn settings_or_defaults(db: Database, owner: String) -> QueryFuture<Settings, StoreError> {
    Box::pin(async move {
        Ok(db
            .find::<Settings>(&owner)
            .await?
            .unwrap_or_else(|| Settings::defaults(owner)))
    })
}
