use super::time::{IsoDate, Timestamp};
use crate::entity::{check_owner, check_range, check_tags, Entity, Timeline};
use crate::error::{Result, StoreError};
use crate::schema::{DEPARTURES, INDEX_DOG_TIMESTAMP, INDEX_DOG_WEEK_START, WEEKLY_TARGETS};
use pawtrack_core::Value;
use serde::{Deserialize, Serialize};

/// Longest departure or weekly target, in minutes.
pub const MAX_DEPARTURE_MINUTES: u32 = 480;

labeled_enum! {
    ExitType {
        FrontDoor => "front_door",
        GarageDoor => "garage_door",
        BackDoor => "back_door",
        NoExit => "no_exit",
    }
}

labeled_enum! {
    /// Overall verdict on a departure.
    Outcome {
        Calm => "calm",
        Okay => "okay",
        Rough => "rough",
    }
}

labeled_enum! {
    DogState {
        Calm => "calm",
        Relaxed => "relaxed",
        Tired => "tired",
        Anxious => "anxious",
        Hyper => "hyper",
        Alert => "alert",
        Neutral => "neutral",
    }
}

labeled_enum! {
    ExerciseType {
        Walk => "walk",
        Run => "run",
        PlaySession => "play_session",
        Training => "training",
        SniffWalk => "sniff_walk",
        Fetch => "fetch",
        None => "none",
    }
}

labeled_enum! {
    /// Things done before leaving that the dog may have learned to read.
    DepartureCue {
        GrabbedJacket => "grabbed_jacket",
        GrabbedKeys => "grabbed_keys",
        GrabbedBackpack => "grabbed_backpack",
        GrabbedPurse => "grabbed_purse",
        Showered => "showered",
        GotDressed => "got_dressed",
        PutOnShoes => "put_on_shoes",
        TurnedOnWhiteNoise => "turned_on_white_noise",
        GaveChew => "gave_chew",
        GaveEnrichment => "gave_enrichment",
        SaidGoodbye => "said_goodbye",
        UsedCueWord => "used_cue_word",
        Other => "other",
    }
}

labeled_enum! {
    ConfinementType {
        Crate => "crate",
        GatedRoom => "gated_room",
        ClosedRoom => "closed_room",
        FreeRoam => "free_roam",
        PennedArea => "penned_area",
    }
}

labeled_enum! {
    /// Who stayed home with the dog.
    CompanionType {
        Alone => "alone",
        OtherDog => "other_dog",
        OtherPet => "other_pet",
        Person => "person",
    }
}

labeled_enum! {
    EnrichmentType {
        FrozenKong => "frozen_kong",
        Kong => "kong",
        PuzzleFeeder => "puzzle_feeder",
        BullyStick => "bully_stick",
        SnuffleMat => "snuffle_mat",
        LickMat => "lick_mat",
        Chew => "chew",
        Toppl => "toppl",
        Other => "other",
    }
}

labeled_enum! {
    EngagementLevel {
        Ignored => "ignored",
        Engaged => "engaged",
        Finished => "finished",
        Partial => "partial",
    }
}

labeled_enum! {
    DepartureBehavior {
        Calm => "calm",
        Resting => "resting",
        Sleeping => "sleeping",
        Playing => "playing",
        Pacing => "pacing",
        Whining => "whining",
        Barking => "barking",
        Howling => "howling",
        ScratchingDoor => "scratching_door",
        Destructive => "destructive",
        Drooling => "drooling",
        Panting => "panting",
        EscapeAttempt => "escape_attempt",
        Elimination => "elimination",
    }
}

labeled_enum! {
    ReturnBehavior {
        Calm => "calm",
        NormalGreeting => "normal_greeting",
        Excited => "excited",
        OverExcited => "over_excited",
        Frantic => "frantic",
        Clingy => "clingy",
    }
}

labeled_enum! {
    DistressEvidence {
        None => "none",
        Destruction => "destruction",
        Elimination => "elimination",
        Drooling => "drooling",
        SelfHarm => "self_harm",
        EscapeDamage => "escape_damage",
        MovedObjects => "moved_objects",
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(rename = "type")]
    pub kind: EnrichmentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_level: Option<EngagementLevel>,
}

/// What the dog was doing `minute_mark` minutes into the departure, usually
/// read off a camera recording.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorEntry {
    pub minute_mark: u32,
    pub behavior: DepartureBehavior,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One absence from home, logged for separation training.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    pub id: String,
    pub dog_id: String,
    pub timestamp: Timestamp,
    /// Minutes away.
    pub duration: u32,
    pub exit_type: ExitType,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_departure_state: Option<DogState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_beforehand: Option<ExerciseType>,
    /// Minutes between the last meal and leaving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_since_last_meal: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub departure_cues: Vec<DepartureCue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confinement_setup: Option<ConfinementType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companions_remaining: Vec<CompanionType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_factors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behavior_log: Vec<BehaviorEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_behavior: Option<ReturnBehavior>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distress_evidence: Vec<DistressEvidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Departure {
    pub fn new(
        dog_id: impl Into<String>,
        timestamp: Timestamp,
        duration: u32,
        exit_type: ExitType,
        outcome: Outcome,
    ) -> Self {
        Self {
            id: crate::new_id(),
            dog_id: dog_id.into(),
            timestamp,
            duration,
            exit_type,
            outcome,
            pre_departure_state: None,
            exercise_beforehand: None,
            time_since_last_meal: None,
            departure_cues: Vec::new(),
            confinement_setup: None,
            companions_remaining: Vec::new(),
            external_factors: Vec::new(),
            enrichment: None,
            behavior_log: Vec::new(),
            return_behavior: None,
            distress_evidence: Vec::new(),
            notes: None,
            tags: Vec::new(),
        }
    }
}

impl Entity for Departure {
    const TABLE: &'static str = DEPARTURES;

    fn key(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.dog_id
    }

    fn validate(&self) -> Result<()> {
        check_owner("dogId", &self.dog_id)?;
        check_range("duration", self.duration, 0, MAX_DEPARTURE_MINUTES)?;
        for entry in &self.behavior_log {
            if entry.minute_mark > self.duration {
                return Err(StoreError::validation(
                    "behaviorLog",
                    format!(
                        "minute mark {} is past the {} minute departure",
                        entry.minute_mark, self.duration
                    ),
                ));
            }
            if let Some(intensity) = entry.intensity {
                check_range("behaviorLog.intensity", intensity, 1, 5)?;
            }
        }
        check_tags(&self.tags)
    }

    fn index_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.dog_id.as_str()),
            Value::from(self.timestamp.as_str()),
            Value::from(self.exit_type.as_str()),
            Value::from(self.outcome.as_str()),
        ]
    }
}

impl Timeline for Departure {
    const TIME_INDEX: &'static str = INDEX_DOG_TIMESTAMP;
    type Time = Timestamp;

    fn time(&self) -> &Timestamp {
        &self.timestamp
    }
}

/// Planned total absence for one week, starting Monday.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTarget {
    pub id: String,
    pub dog_id: String,
    pub week_start: IsoDate,
    /// Minutes.
    pub target_duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WeeklyTarget {
    pub fn new(dog_id: impl Into<String>, week_start: IsoDate, target_duration: u32) -> Self {
        Self {
            id: crate::new_id(),
            dog_id: dog_id.into(),
            week_start,
            target_duration,
            notes: None,
        }
    }
}

impl Entity for WeeklyTarget {
    const TABLE: &'static str = WEEKLY_TARGETS;

    fn key(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.dog_id
    }

    fn validate(&self) -> Result<()> {
        check_owner("dogId", &self.dog_id)?;
        if !self.week_start.is_monday() {
            return Err(StoreError::validation(
                "weekStart",
                format!("{} is not a Monday", self.week_start),
            ));
        }
        check_range("targetDuration", self.target_duration, 0, MAX_DEPARTURE_MINUTES)
    }

    fn index_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.dog_id.as_str()),
            Value::from(self.week_start.as_str()),
        ]
    }
}

impl Timeline for WeeklyTarget {
    const TIME_INDEX: &'static str = INDEX_DOG_WEEK_START;
    type Time = IsoDate;

    fn time(&self) -> &IsoDate {
        &self.week_start
    }
}
