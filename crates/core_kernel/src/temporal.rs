//! Effective-date windows and timezone handling
//!
//! Rate cards, contracts, and depreciation records are all scoped by
//! calendar dates rather than instants. `EffectivePeriod` is the shared
//! closed window `[from, to]` where an absent `to` means open-ended.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Timezone wrapper for company-local dates
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timezone::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parses an IANA timezone name such as `America/Chicago`
    pub fn parse(name: &str) -> Result<Self, TemporalError> {
        Tz::from_str(name)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(name.to_string()))
    }

    /// Returns the calendar date of a UTC instant in this timezone
    pub fn local_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.0).date_naive()
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// A closed calendar window; `to = None` means the window is open-ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePeriod {
    /// First effective day (inclusive)
    pub from: NaiveDate,
    /// Last effective day (inclusive)
    pub to: Option<NaiveDate>,
}

impl EffectivePeriod {
    /// Creates a new period, rejecting windows that end before they start
    pub fn new(from: NaiveDate, to: Option<NaiveDate>) -> Result<Self, TemporalError> {
        if let Some(to) = to {
            if to < from {
                return Err(TemporalError::InvalidPeriod { start: from, end: to });
            }
        }
        Ok(Self { from, to })
    }

    /// Creates an open-ended period starting on the given date
    pub fn starting(from: NaiveDate) -> Self {
        Self { from, to: None }
    }

    /// Returns true if the date falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && self.to.map_or(true, |to| date <= to)
    }

    /// Returns true if the two windows share at least one day
    pub fn overlaps(&self, other: &EffectivePeriod) -> bool {
        let self_end = self.to.unwrap_or(NaiveDate::MAX);
        let other_end = other.to.unwrap_or(NaiveDate::MAX);

        self.from <= other_end && other.from <= self_end
    }

    /// Returns true if the window has no end date
    pub fn is_open_ended(&self) -> bool {
        self.to.is_none()
    }
}

/// Number of complete years between `start` and `as_of`.
///
/// An anniversary counts on the same month/day; `as_of` before `start`
/// yields zero.
pub fn full_years_between(start: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of <= start {
        return 0;
    }
    let mut years = as_of.year() - start.year();
    if (as_of.month(), as_of.day()) < (start.month(), start.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_is_inclusive_on_both_ends() {
        let period = EffectivePeriod::new(date(2024, 1, 1), Some(date(2024, 12, 31))).unwrap();
        assert!(period.contains(date(2024, 1, 1)));
        assert!(period.contains(date(2024, 12, 31)));
        assert!(!period.contains(date(2025, 1, 1)));
    }

    #[test]
    fn test_full_years_between() {
        assert_eq!(full_years_between(date(2020, 6, 15), date(2023, 6, 14)), 2);
        assert_eq!(full_years_between(date(2020, 6, 15), date(2023, 6, 15)), 3);
        assert_eq!(full_years_between(date(2020, 6, 15), date(2019, 1, 1)), 0);
    }
}
