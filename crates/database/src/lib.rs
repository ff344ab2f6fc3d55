//! pawtrack - local-first reactive record store for dog behaviour logs.
//!
//! The store keeps one table per record type (see [`schema`]) in memory,
//! persists every committed write to a durable backend and re-runs live queries
//! whose data a write touched.
//!
//! # Core Components
//!
//! - `Database`: the store handle, opened once and passed to whoever needs it
//! - `model`: the record types (profiles, incidents, departures, medication)
//! - `settings`: per-profile settings with the recent tags list
//! - `capture`: logging an incident together with the device position
//! - `Live`: live query handles returned by `Database::live_*`
//!
//! # Example
//!
//! ```rust
//! use pawtrack::model::{Incident, Timestamp, TriggerType};
//! use pawtrack::Database;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> pawtrack::Result<()> {
//! let db = Database::in_memory().await?;
//! let rex = db.create_profile("Rex").await?;
//!
//! for (ts, intensity) in [("2024-03-01T08:00:00Z", 2), ("2024-03-02T08:00:00Z", 4)] {
//!     let incident = Incident::new(&rex.id, Timestamp::parse(ts)?, TriggerType::Bike, intensity);
//!     db.add(incident).await?;
//! }
//!
//! let newest_first = db
//!     .incidents_in_range(
//!         &rex.id,
//!         &Timestamp::parse("2024-03-01T00:00:00Z")?,
//!         &Timestamp::parse("2024-03-31T00:00:00Z")?,
//!     )
//!     .await?;
//! assert_eq!(newest_first[0].intensity, 4);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
mod database;
pub mod entity;
pub mod error;
mod live;
pub mod model;
pub mod schema;
pub mod settings;
pub mod telemetry;

pub use capture::{log_incident, FixedLocation, IncidentDraft, LocationProvider, NoLocation};
pub use config::{BackendConfig, StoreConfig};
pub use database::{Database, NearestLocation};
pub use entity::{Entity, Timeline};
pub use error::{LocationUnavailable, Result, StoreError};
pub use live::{Live, RangeKey};

pub use pawtrack_core::Value;
pub use pawtrack_geo::Coordinate;
pub use pawtrack_query::{SortOrder, Window};
pub use pawtrack_reactive::LiveState;
pub use pawtrack_storage::{BackendError, LogRecord, StorageBackend, SyncPolicy};

/// Generates a fresh record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
