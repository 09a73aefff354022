mod cohort;
mod datekey;
mod error;
mod messages;
mod phone;
mod row;
mod status;

pub use cohort::Cohort;
pub use datekey::{
    audit_stamp, midday, parse_received_at, parse_time_of_day, parse_utc_offset, reply_date_key,
    sort_time, DateKey,
};
pub use error::DomainError;
pub use messages::{confirmation_email, long_date, reminder_sms, EmailMessage, Venue};
pub use phone::{normalize, NormalizedPhone, COUNTRY_CODE};
pub use row::{CellWrite, Column, DateTable, NewReservation, ReservationRow};
pub use status::{classify_reply, ReplyClassification, ReservationStatus, NEEDS_REVIEW_PREFIX};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReply {
    pub phone: String,
    pub message: String,
    pub received_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReply {
    pub phone: String,
    pub message: String,
    pub received_at: String,
    pub status: String,
}

pub const NEEDS_MANUAL_REVIEW: &str = "Needs manual review";

impl UnknownReply {
    pub fn needs_review(reply: &InboundReply) -> Self {
        Self {
            phone: reply.phone.clone(),
            message: reply.message.clone(),
            received_at: reply.received_at.clone().unwrap_or_default(),
            status: NEEDS_MANUAL_REVIEW.to_string(),
        }
    }
}
