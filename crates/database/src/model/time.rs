//! Time value types.
//!
//! Each type holds its canonical text form, so string comparison of two values
//! is chronological comparison and the text can go straight into an index key.

use crate::error::{Result, StoreError};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, SecondsFormat, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A time value usable as the trailing component of an (owner, time) index.
pub trait TimeKey {
    fn as_key(&self) -> &str;
}

impl TimeKey for Timestamp {
    fn as_key(&self) -> &str {
        &self.0
    }
}

impl TimeKey for IsoDate {
    fn as_key(&self) -> &str {
        &self.0
    }
}

/// An instant in UTC, rendered as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Parses any RFC 3339 instant and normalizes it to UTC milliseconds.
    pub fn parse(text: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(text)
            .map(|at| Self::from_datetime(at.with_timezone(&Utc)))
            .map_err(|e| StoreError::validation("timestamp", format!("{text:?} is not RFC 3339: {e}")))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }

    /// The calendar date of this instant in UTC.
    pub fn date(&self) -> IsoDate {
        IsoDate(self.0[..10].to_owned())
    }
}

impl TryFrom<String> for Timestamp {
    type Error = StoreError;

    fn try_from(text: String) -> Result<Self> {
        Self::parse(&text)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::from_datetime(at)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A calendar date, `YYYY-MM-DD`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IsoDate(String);

impl IsoDate {
    pub fn parse(text: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Self::from_naive)
            .map_err(|e| StoreError::validation("date", format!("{text:?} is not YYYY-MM-DD: {e}")))?;
        // Only the zero-padded form sorts correctly as text.
        if date.0 != text {
            return Err(StoreError::validation(
                "date",
                format!("{text:?} is not zero-padded YYYY-MM-DD"),
            ));
        }
        Ok(date)
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date.format("%Y-%m-%d").to_string())
    }

    pub fn today() -> Self {
        Self::from_naive(Utc::now().date_naive())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, "%Y-%m-%d").ok()
    }

    pub fn is_monday(&self) -> bool {
        self.to_naive().is_some_and(|d| d.weekday() == Weekday::Mon)
    }

    /// The Monday of the week containing this date.
    pub fn week_start(&self) -> Option<IsoDate> {
        let date = self.to_naive()?;
        let back = chrono::Days::new(u64::from(date.weekday().num_days_from_monday()));
        date.checked_sub_days(back).map(Self::from_naive)
    }
}

impl TryFrom<String> for IsoDate {
    type Error = StoreError;

    fn try_from(text: String) -> Result<Self> {
        Self::parse(&text)
    }
}

impl From<IsoDate> for String {
    fn from(date: IsoDate) -> Self {
        date.0
    }
}

impl fmt::Display for IsoDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A wall-clock time, `HH:MM` on a 24-hour clock.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(String);

impl ClockTime {
    pub fn parse(text: &str) -> Result<Self> {
        NaiveTime::parse_from_str(text, "%H:%M")
            .map(|t| Self(t.format("%H:%M").to_string()))
            .map_err(|e| StoreError::validation("time", format!("{text:?} is not HH:MM: {e}")))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClockTime {
    type Error = StoreError;

    fn try_from(text: String) -> Result<Self> {
        Self::parse(&text)
    }
}

impl From<ClockTime> for String {
    fn from(time: ClockTime) -> Self {
        time.0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
