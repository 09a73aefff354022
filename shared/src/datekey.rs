use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
const AUDIT_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let candidate = s.trim().replace('/', "-");
        NaiveDate::parse_from_str(&candidate, DATE_KEY_FORMAT)
            .map(Self)
            .map_err(|_| DomainError::InvalidDateKey(s.to_string()))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, DomainError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| DomainError::InvalidOffset(raw.to_string()));
    }

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(DomainError::InvalidOffset(raw.to_string())),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| DomainError::InvalidOffset(raw.to_string()))?;
    let hours: i32 = hours.parse().map_err(|_| DomainError::InvalidOffset(raw.to_string()))?;
    let minutes: i32 = minutes.parse().map_err(|_| DomainError::InvalidOffset(raw.to_string()))?;
    if hours > 23 || minutes > 59 {
        return Err(DomainError::InvalidOffset(raw.to_string()));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| DomainError::InvalidOffset(raw.to_string()))
}

/// Parses a reply receipt timestamp and expresses it in the reference offset.
///
/// Timestamps carrying `Z` or an explicit offset are converted; naive
/// timestamps are taken to already be in the reference offset.
pub fn parse_received_at(raw: &str, reference: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(reference));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .and_then(|naive| reference.from_local_datetime(&naive).single())
}

pub fn reply_date_key(received_at: &DateTime<FixedOffset>) -> DateKey {
    DateKey(received_at.date_naive())
}

pub fn audit_stamp(received_at: &DateTime<FixedOffset>) -> String {
    received_at.format(AUDIT_STAMP_FORMAT).to_string()
}

pub fn midday() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()
}

/// Lenient time-of-day parse used for ordering only: 24h `HH:MM`, then
/// 12h `HH:MM AM/PM`, else midday.
pub fn sort_time(raw: &str) -> NaiveTime {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&trimmed.to_uppercase(), "%I:%M %p"))
        .unwrap_or_else(|_| midday())
}

pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, DomainError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| DomainError::InvalidTimeOfDay(raw.to_string()))
}
