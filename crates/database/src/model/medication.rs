use super::time::{ClockTime, IsoDate};
use crate::entity::{check_name, check_owner, check_range, check_tags, Entity, Timeline};
use crate::error::{Result, StoreError};
use crate::schema::{INDEX_DOG_DATE, MEDICATION_CONFIGS, MEDICATION_ENTRIES};
use pawtrack_core::Value;
use serde::{Deserialize, Serialize};

const MIN_DOSE: f64 = 0.1;
const MAX_DOSE: f64 = 1000.0;

/// One scheduled dose of a medication.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseSchedule {
    pub id: String,
    pub label: String,
    pub target_time: ClockTime,
    /// Milligrams.
    pub default_dose: f64,
}

impl DoseSchedule {
    pub fn new(label: impl Into<String>, target_time: ClockTime, default_dose: f64) -> Self {
        Self {
            id: crate::new_id(),
            label: label.into(),
            target_time,
            default_dose,
        }
    }
}

/// A medication and its daily dose plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationConfig {
    pub id: String,
    pub dog_id: String,
    pub name: String,
    pub doses: Vec<DoseSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MedicationConfig {
    pub fn new(dog_id: impl Into<String>, name: impl Into<String>, doses: Vec<DoseSchedule>) -> Self {
        Self {
            id: crate::new_id(),
            dog_id: dog_id.into(),
            name: name.into(),
            doses,
            notes: None,
        }
    }

    pub fn dose(&self, dose_schedule_id: &str) -> Option<&DoseSchedule> {
        self.doses.iter().find(|d| d.id == dose_schedule_id)
    }
}

impl Entity for MedicationConfig {
    const TABLE: &'static str = MEDICATION_CONFIGS;

    fn key(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.dog_id
    }

    fn validate(&self) -> Result<()> {
        check_owner("dogId", &self.dog_id)?;
        check_name("name", &self.name)?;
        if self.doses.is_empty() {
            return Err(StoreError::validation("doses", "needs at least one dose"));
        }
        for (i, dose) in self.doses.iter().enumerate() {
            check_name("doses.label", &dose.label)?;
            check_range("doses.defaultDose", dose.default_dose, MIN_DOSE, MAX_DOSE)?;
            if self.doses[..i].iter().any(|d| d.id == dose.id) {
                return Err(StoreError::validation(
                    "doses",
                    format!("dose id {} appears twice", dose.id),
                ));
            }
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

/// One administered dose.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationEntry {
    pub id: String,
    pub dog_id: String,
    pub date: IsoDate,
    pub medication_id: String,
    pub dose_schedule_id: String,
    pub target_time: ClockTime,
    pub actual_time: ClockTime,
    /// Milligrams.
    pub dose: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl MedicationEntry {
    /// An entry for `schedule` of `config`, given at `actual_time` with the
    /// schedule's default dose.
    pub fn for_schedule(
        config: &MedicationConfig,
        schedule: &DoseSchedule,
        date: IsoDate,
        actual_time: ClockTime,
    ) -> Self {
        Self {
            id: crate::new_id(),
            dog_id: config.dog_id.clone(),
            date,
            medication_id: config.id.clone(),
            dose_schedule_id: schedule.id.clone(),
            target_time: schedule.target_time.clone(),
            actual_time,
            dose: schedule.default_dose,
            notes: None,
            tags: Vec::new(),
        }
    }
}

impl Entity for MedicationEntry {
    const TABLE: &'static str = MEDICATION_ENTRIES;

    fn key(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.dog_id
    }

    fn validate(&self) -> Result<()> {
        check_owner("dogId", &self.dog_id)?;
        if self.medication_id.trim().is_empty() {
            return Err(StoreError::validation("medicationId", "must reference a medication"));
        }
        check_range("dose", self.dose, MIN_DOSE, MAX_DOSE)?;
        check_tags(&self.tags)
    }

    fn index_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.dog_id.as_str()),
            Value::from(self.date.as_str()),
            Value::from(self.medication_id.as_str()),
        ]
    }
}

impl Timeline for MedicationEntry {
    const TIME_INDEX: &'static str = INDEX_DOG_DATE;
    type Time = IsoDate;

    fn time(&self) -> &IsoDate {
        &self.date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MedicationConfig {
        MedicationConfig::new(
            "d1",
            "Trazodone",
            vec![DoseSchedule::new("Morning", ClockTime::parse("08:00").unwrap(), 50.0)],
        )
    }

    #[test]
    fn test_config_validation() {
        config().validate().unwrap();

        let mut no_doses = config();
        no_doses.doses.clear();
        assert!(no_doses.validate().is_err());

        let mut overdose = config();
        overdose.doses[0].default_dose = 1000.5;
        assert!(overdose.validate().is_err());

        let mut duplicated = config();
        let copy = duplicated.doses[0].clone();
        duplicated.doses.push(copy);
        assert!(duplicated.validate().is_err());
    }

    #[test]
    fn test_entry_from_schedule() {
        let config = config();
        let entry = MedicationEntry::for_schedule(
            &config,
            &config.doses[0],
            IsoDate::parse("2024-03-01").unwrap(),
            ClockTime::parse("08:15").unwrap(),
        );
        assert_eq!(entry.medication_id, config.id);
        assert_eq!(entry.dose, 50.0);
        assert_eq!(entry.target_time.as_str(), "08:00");
        entry.validate().unwrap();

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["doseScheduleId"], config.doses[0].id.as_str());
        assert_eq!(json["actualTime"], "08:15");
    }

    #[test]
    fn test_entry_dose_bounds() {
        let config = config();
        let mut entry = MedicationEntry::for_schedule(
            &config,
            &config.doses[0],
            IsoDate::parse("2024-03-01").unwrap(),
            ClockTime::parse("08:15").unwrap(),
        );
        entry.dose = 0.05;
        assert!(entry.validate().unwrap_err().is_validation());
    }
}
