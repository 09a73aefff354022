use std::fmt;
use std::str::FromStr;

use crate::datekey::DateKey;
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cohort {
    DayOf,
    DayBefore,
}

impl Cohort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cohort::DayOf => "day_of",
            Cohort::DayBefore => "day_before",
        }
    }

    pub fn target_date(&self, today: DateKey) -> Option<DateKey> {
        match self {
            Cohort::DayOf => Some(today),
            Cohort::DayBefore => today.succ(),
        }
    }

    pub fn day_word(&self) -> &'static str {
        match self {
            Cohort::DayOf => "today",
            Cohort::DayBefore => "tomorrow",
        }
    }

    pub fn correlation_ref(&self, epoch_seconds: i64) -> String {
        format!("{}_{}", self.as_str(), epoch_seconds)
    }

    pub fn audit_note(&self, sent: bool, clock: &str) -> String {
        let outcome = if sent { "sent" } else { "failed" };
        format!("{} SMS {} {}", self.as_str(), outcome, clock)
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cohort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('-', "_").as_str() {
            "day_of" => Ok(Cohort::DayOf),
            "day_before" => Ok(Cohort::DayBefore),
            _ => Err(DomainError::UnknownCohort(s.to_string())),
        }
    }
}
