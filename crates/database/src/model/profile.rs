use crate::entity::{check_name, check_owner, check_tags, Entity};
use crate::error::{Result, StoreError};
use crate::schema::{NAMED_LOCATIONS, PROFILES, SETTINGS};
use pawtrack_core::Value;
use pawtrack_geo::{Coordinate, Place};
use serde::{Deserialize, Serialize};

/// Size of the recent tags list.
pub const MAX_RECENT_TAGS: usize = 10;

pub const DEFAULT_RADIUS_METERS: f64 = 50.0;

/// The animal whose behaviour is being recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(crate::new_id(), name)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Entity for Profile {
    const TABLE: &'static str = PROFILES;

    fn key(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        check_owner("id", &self.id)?;
        check_name("name", &self.name)
    }

    fn index_values(&self) -> Vec<Value> {
        vec![Value::from(self.name.as_str())]
    }
}

/// Per-profile preferences, keyed by the profile id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub active_dog_id: String,
    /// Most recently used first.
    #[serde(default)]
    pub recent_tags: Vec<String>,
    #[serde(default)]
    pub dark_mode: bool,
}

impl Settings {
    pub fn defaults(active_dog_id: impl Into<String>) -> Self {
        Self {
            active_dog_id: active_dog_id.into(),
            recent_tags: Vec::new(),
            dark_mode: false,
        }
    }

    /// Moves `tag` to the front, dropping an older occurrence and anything past
    /// the size limit. Returns whether the list changed.
    pub fn push_recent_tag(&mut self, tag: &str) -> bool {
        let before = self.recent_tags.clone();
        self.recent_tags.retain(|t| t != tag);
        self.recent_tags.insert(0, tag.to_owned());
        self.recent_tags.truncate(MAX_RECENT_TAGS);
        self.recent_tags != before
    }
}

impl Entity for Settings {
    const TABLE: &'static str = SETTINGS;
    const KEY_FIELD: &'static str = "activeDogId";

    fn key(&self) -> &str {
        &self.active_dog_id
    }

    fn owner(&self) -> &str {
        &self.active_dog_id
    }

    fn validate(&self) -> Result<()> {
        check_owner("activeDogId", &self.active_dog_id)?;
        check_tags(&self.recent_tags)?;
        if self.recent_tags.len() > MAX_RECENT_TAGS {
            return Err(StoreError::validation(
                "recentTags",
                format!("holds at most {MAX_RECENT_TAGS} tags"),
            ));
        }
        for (i, tag) in self.recent_tags.iter().enumerate() {
            if self.recent_tags[..i].contains(tag) {
                return Err(StoreError::validation(
                    "recentTags",
                    format!("{tag:?} appears twice"),
                ));
            }
        }
        Ok(())
    }
}

/// A place the user named, matched against incident coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedLocation {
    pub id: String,
    pub dog_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_radius")]
    pub radius_meters: f64,
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS_METERS
}

impl NamedLocation {
    pub fn new(dog_id: impl Into<String>, name: impl Into<String>, at: Coordinate) -> Self {
        Self {
            id: crate::new_id(),
            dog_id: dog_id.into(),
            name: name.into(),
            lat: at.lat,
            lng: at.lng,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }

    pub fn with_radius(mut self, radius_meters: f64) -> Self {
        self.radius_meters = radius_meters;
        self
    }
}

impl Place for NamedLocation {
    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    fn radius_meters(&self) -> f64 {
        self.radius_meters
    }
}

impl Entity for NamedLocation {
    const TABLE: &'static str = NAMED_LOCATIONS;

    fn key(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.dog_id
    }

    fn validate(&self) -> Result<()> {
        check_owner("dogId", &self.dog_id)?;
        check_name("name", &self.name)?;
        self.coordinate()
            .validate()
            .map_err(|e| StoreError::validation("location", e.to_string()))?;
        if !(self.radius_meters > 0.0 && self.radius_meters.is_finite()) {
            return Err(StoreError::validation(
                "radiusMeters",
                format!("{} is not a positive distance", self.radius_meters),
            ));
        }
        Ok(())
    }

    fn index_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.dog_id.as_str()),
            Value::from(self.name.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_tags_most_recent_first() {
        let mut settings = Settings::defaults("d1");
        assert!(settings.push_recent_tag("walk"));
        assert!(settings.push_recent_tag("park"));
        assert!(settings.push_recent_tag("walk"));
        assert_eq!(settings.recent_tags, vec!["walk", "park"]);
        assert!(!settings.push_recent_tag("walk"));
    }

    #[test]
    fn test_recent_tags_bounded() {
        let mut settings = Settings::defaults("d1");
        for i in 0..15 {
            settings.push_recent_tag(&format!("t{i}"));
        }
        assert_eq!(settings.recent_tags.len(), MAX_RECENT_TAGS);
        assert_eq!(settings.recent_tags[0], "t14");
        assert_eq!(settings.recent_tags[9], "t5");
        settings.validate().unwrap();
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::defaults("d1");
        settings.recent_tags = vec!["a".into(), "a".into()];
        assert!(settings.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_settings_serde_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"activeDogId":"d1"}"#).unwrap();
        assert_eq!(settings, Settings::defaults("d1"));
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["darkMode"], false);
    }

    #[test]
    fn test_named_location_validation() {
        let home = NamedLocation::new("d1", "Home", Coordinate::new(52.52, 13.405));
        assert_eq!(home.radius_meters, DEFAULT_RADIUS_METERS);
        home.validate().unwrap();

        assert!(home.clone().with_radius(0.0).validate().is_err());
        assert!(home.clone().with_radius(f64::NAN).validate().is_err());

        let mut off_map = home;
        off_map.lat = 91.0;
        assert!(off_map.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_profile_name_rules() {
        assert!(Profile::new("Rex").validate().is_ok());
        assert!(Profile::new("   ").validate().is_err());
        assert!(Profile::new("x".repeat(51)).validate().is_err());
    }
}
