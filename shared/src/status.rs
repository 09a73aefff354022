use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

pub const NEEDS_REVIEW_PREFIX: &str = "Reply needs review: ";

const AFFIRMATIVE_REPLIES: [&str; 6] = ["Y", "YES", "YEP", "YUP", "CONFIRM", "CONFIRMED"];
const NEGATIVE_REPLIES: [&str; 5] = ["N", "NO", "NOPE", "CANCEL", "CANCELLED"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    NeedsReview(String),
}

impl ReservationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "Pending"),
            ReservationStatus::Confirmed => write!(f, "Confirmed"),
            ReservationStatus::Cancelled => write!(f, "Cancelled"),
            ReservationStatus::NeedsReview(reply) => write!(f, "{}{}", NEEDS_REVIEW_PREFIX, reply),
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(reply) = s.strip_prefix(NEEDS_REVIEW_PREFIX) {
            return Ok(ReservationStatus::NeedsReview(reply.to_string()));
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            _ => Err(DomainError::UnknownStatus(s.to_string())),
        }
    }
}

impl Serialize for ReservationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReservationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyClassification {
    pub status: ReservationStatus,
    pub method: &'static str,
}

pub fn classify_reply(message: &str) -> ReplyClassification {
    let normalized = message.trim().to_uppercase();

    if AFFIRMATIVE_REPLIES.contains(&normalized.as_str()) {
        ReplyClassification {
            status: ReservationStatus::Confirmed,
            method: "Confirmed by SMS",
        }
    } else if NEGATIVE_REPLIES.contains(&normalized.as_str()) {
        ReplyClassification {
            status: ReservationStatus::Cancelled,
            method: "Cancelled by SMS",
        }
    } else {
        ReplyClassification {
            status: ReservationStatus::NeedsReview(message.to_string()),
            method: "SMS",
        }
    }
}
