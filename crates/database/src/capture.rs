//! Logging an incident as it happens.
//!
//! The current position is requested from a [`LocationProvider`] when an
//! incident is logged. A provider that refuses, fails or does not answer in
//! time never fails the log: the incident is stored without a location.

use crate::database::Database;
use crate::entity::Entity;
use crate::error::{LocationUnavailable, Result};
use crate::model::{
    DistanceBucket, DogBehavior, DurationBucket, HandlerResponse, Incident, Timestamp, TriggerType,
};
use crate::settings;
use async_trait::async_trait;
use pawtrack_geo::Coordinate;
use tracing::debug;

/// Source of the device position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> std::result::Result<Coordinate, LocationUnavailable>;
}

/// A provider for devices without positioning.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_position(&self) -> std::result::Result<Coordinate, LocationUnavailable> {
        Err(LocationUnavailable::Unsupported)
    }
}

/// A provider that always reports the same position.
#[derive(Clone, Copy, Debug)]
pub struct FixedLocation(pub Coordinate);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> std::result::Result<Coordinate, LocationUnavailable> {
        Ok(self.0)
    }
}

/// An incident as entered by the user, before an id, time and location are
/// attached.
#[derive(Clone, Debug, PartialEq)]
pub struct IncidentDraft {
    pub dog_id: String,
    pub trigger: TriggerType,
    pub intensity: u8,
    /// Defaults to the moment the draft is logged.
    pub timestamp: Option<Timestamp>,
    pub duration: Option<DurationBucket>,
    pub dog_behaviors: Vec<DogBehavior>,
    pub handler_response: Option<HandlerResponse>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub distance: Option<DistanceBucket>,
}

impl IncidentDraft {
    pub fn new(dog_id: impl Into<String>, trigger: TriggerType, intensity: u8) -> Self {
        Self {
            dog_id: dog_id.into(),
            trigger,
            intensity,
            timestamp: None,
            duration: None,
            dog_behaviors: Vec::new(),
            handler_response: None,
            notes: None,
            tags: Vec::new(),
            distance: None,
        }
    }

    fn into_incident(self) -> Incident {
        let mut incident = Incident::new(
            self.dog_id,
            self.timestamp.unwrap_or_else(Timestamp::now),
            self.trigger,
            self.intensity,
        );
        incident.duration = self.duration;
        incident.dog_behaviors = self.dog_behaviors;
        incident.handler_response = self.handler_response;
        incident.notes = self.notes.filter(|n| !n.trim().is_empty());
        incident.tags = self.tags;
        incident.distance = self.distance;
        incident
    }
}

/// Stores an incident, tagged with where it happened when the position is
/// known, and moves its tags to the front of the recent tags.
pub async fn log_incident<P>(db: &Database, provider: &P, draft: IncidentDraft) -> Result<Incident>
where
    P: LocationProvider + ?Sized,
{
    let mut incident = draft.into_incident();
    incident.validate()?;

    match locate(db, provider).await {
        Ok(point) => {
            incident.location = Some(db.resolve_location(&incident.dog_id, point).await?);
        }
        Err(reason) => {
            debug!(dog_id = %incident.dog_id, %reason, "logging incident without a location");
        }
    }

    db.add(incident.clone()).await?;
    if !incident.tags.is_empty() {
        settings::add_recent_tags(db, &incident.dog_id, incident.tags.iter().map(String::as_str))
            .await?;
    }
    Ok(incident)
}

async fn locate<P>(db: &Database, provider: &P) -> std::result::Result<Coordinate, LocationUnavailable>
where
    P: LocationProvider + ?Sized,
{
    let reading = tokio::time::timeout(db.config().location_timeout(), provider.current_position())
        .await
        .map_err(|_| LocationUnavailable::TimedOut)??;
    reading
        .validate()
        .map_err(|e| LocationUnavailable::Failed(e.to_string()))?;
    Ok(reading)
}
