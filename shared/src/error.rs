use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid date key: {0}")]
    InvalidDateKey(String),

    #[error("unknown reservation status: {0}")]
    UnknownStatus(String),

    #[error("unknown reminder cohort: {0}")]
    UnknownCohort(String),

    #[error("invalid UTC offset: {0}")]
    InvalidOffset(String),

    #[error("invalid time of day: {0}")]
    InvalidTimeOfDay(String),
}
