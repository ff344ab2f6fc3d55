//! Record types persisted by the store.
//!
//! Every record serializes with camelCase field names, the layout its `doc`
//! column carries. Closed vocabularies are enums whose serialized labels are
//! the persisted snake_case strings.

/// Declares a closed vocabulary: an enum with fixed serialized labels, an
/// `ALL` listing and `as_str`/`Display`.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $variant:ident => $label:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( #[serde(rename = $label)] $variant, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

mod departure;
mod incident;
mod medication;
mod profile;
mod time;

pub use departure::{
    BehaviorEntry, CompanionType, ConfinementType, Departure, DepartureBehavior, DepartureCue,
    DistressEvidence, DogState, Enrichment, EnrichmentType, EngagementLevel, ExerciseType,
    ExitType, Outcome, ReturnBehavior, WeeklyTarget, MAX_DEPARTURE_MINUTES,
};
pub use incident::{
    DistanceBucket, DogBehavior, DurationBucket, HandlerResponse, Incident, IncidentLocation,
    TriggerType,
};
pub use medication::{DoseSchedule, MedicationConfig, MedicationEntry};
pub use profile::{NamedLocation, Profile, Settings, DEFAULT_RADIUS_METERS, MAX_RECENT_TAGS};
pub use time::{ClockTime, IsoDate, TimeKey, Timestamp};
