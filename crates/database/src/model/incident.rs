use super::time::Timestamp;
use crate::entity::{check_owner, check_range, check_tags, Entity, Timeline};
use crate::error::{Result, StoreError};
use crate::schema::{INCIDENTS, INDEX_DOG_TIMESTAMP};
use pawtrack_core::Value;
use pawtrack_geo::Coordinate;
use serde::{Deserialize, Serialize};

labeled_enum! {
    /// What set the dog off.
    TriggerType {
        Dog => "dog",
        Person => "person",
        Bike => "bike",
        Car => "car",
        Skateboard => "skateboard",
        LoudNoise => "loud_noise",
        Child => "child",
        Jogger => "jogger",
        Other => "other",
    }
}

labeled_enum! {
    DogBehavior {
        Barking => "barking",
        Lunging => "lunging",
        Growling => "growling",
        Whining => "whining",
        Freezing => "freezing",
        Hackling => "hackling",
        Pulling => "pulling",
        Hiding => "hiding",
    }
}

labeled_enum! {
    HandlerResponse {
        Redirected => "redirected",
        Treated => "treated",
        Removed => "removed",
        WaitedOut => "waited_out",
        CounterConditioned => "counter_conditioned",
        Other => "other",
    }
}

labeled_enum! {
    /// How long the reaction lasted.
    DurationBucket {
        Brief => "brief",
        Moderate => "moderate",
        Prolonged => "prolonged",
    }
}

labeled_enum! {
    /// How far away the trigger was.
    DistanceBucket {
        Far => "far",
        Medium => "medium",
        Close => "close",
    }
}

/// Where an incident happened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_location_id: Option<String>,
}

impl IncidentLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

impl From<Coordinate> for IncidentLocation {
    fn from(at: Coordinate) -> Self {
        Self {
            lat: at.lat,
            lng: at.lng,
            named_location_id: None,
        }
    }
}

/// One reactivity incident.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub dog_id: String,
    pub timestamp: Timestamp,
    pub trigger: TriggerType,
    /// 1 (mild) to 5 (severe).
    pub intensity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<IncidentLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationBucket>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dog_behaviors: Vec<DogBehavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_response: Option<HandlerResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<DistanceBucket>,
}

impl Incident {
    pub fn new(
        dog_id: impl Into<String>,
        timestamp: Timestamp,
        trigger: TriggerType,
        intensity: u8,
    ) -> Self {
        Self {
            id: crate::new_id(),
            dog_id: dog_id.into(),
            timestamp,
            trigger,
            intensity,
            location: None,
            duration: None,
            dog_behaviors: Vec::new(),
            handler_response: None,
            notes: None,
            tags: Vec::new(),
            distance: None,
        }
    }
}

impl Entity for Incident {
    const TABLE: &'static str = INCIDENTS;

    fn key(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.dog_id
    }

    fn validate(&self) -> Result<()> {
        check_owner("dogId", &self.dog_id)?;
        check_range("intensity", self.intensity, 1, 5)?;
        if let Some(location) = &self.location {
            location
                .coordinate()
                .validate()
                .map_err(|e| StoreError::validation("location", e.to_string()))?;
        }
        check_tags(&self.tags)
    }

    fn index_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.dog_id.as_str()),
            Value::from(self.timestamp.as_str()),
            Value::from(self.trigger.as_str()),
            Value::Int32(i32::from(self.intensity)),
        ]
    }
}

impl Timeline for Incident {
    const TIME_INDEX: &'static str = INDEX_DOG_TIMESTAMP;
    type Time = Timestamp;

    fn time(&self) -> &Timestamp {
        &self.timestamp
    }
}
