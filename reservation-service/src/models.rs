use chrono::{DateTime, Utc};
use diesel::prelude::*;
use shared::{DateKey, DateTable, EmailMessage, NewReservation, ReservationRow, ReservationStatus};
use tracing::warn;
use uuid::Uuid;

use crate::outbox::EmailJob;
use crate::store::StoreError;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::master_reservations)]
pub struct NewMasterReservation {
    pub name: String,
    pub booking_date: String,
    pub time_slot: String,
    pub people: String,
    pub dish_type: String,
    pub phone: String,
    pub email: String,
    pub notes: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::date_tables)]
pub struct NewDateTable {
    pub date_key: String,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::reservation_rows)]
pub struct DbReservationRow {
    pub date_key: String,
    pub row_number: i32,
    pub name: String,
    pub time_slot: String,
    pub people: String,
    pub phone: String,
    pub email: String,
    pub booking_date: String,
    pub dish_type: String,
    pub notes: String,
    pub status: String,
    pub reservation_id: Option<i64>,
    pub sms_reply: String,
    pub confirmation_method: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::unknown_replies)]
pub struct NewUnknownReply {
    pub id: Uuid,
    pub logged_at: DateTime<Utc>,
    pub phone: String,
    pub message: String,
    pub received_at: String,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::email_outbox)]
pub struct DbEmailJob {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub state: String,
    pub last_error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<&NewReservation> for NewMasterReservation {
    fn from(booking: &NewReservation) -> Self {
        Self {
            name: booking.name.clone(),
            booking_date: booking.date.to_string(),
            time_slot: booking.time.clone(),
            people: booking.people.clone(),
            dish_type: booking.dish_type.clone(),
            phone: booking.phone.clone(),
            email: booking.email.clone(),
            notes: booking.notes.clone(),
        }
    }
}

impl DbReservationRow {
    pub fn new(date_key: &DateKey, row_number: i32, row: ReservationRow) -> Self {
        Self {
            date_key: date_key.to_string(),
            row_number,
            name: row.name,
            time_slot: row.time,
            people: row.people,
            phone: row.phone,
            email: row.email,
            booking_date: row.date,
            dish_type: row.dish_type,
            notes: row.notes,
            status: row.status.to_string(),
            reservation_id: row.reservation_id,
            sms_reply: row.sms_reply,
            confirmation_method: row.confirmation_method,
            updated_at: Some(Utc::now()),
        }
    }
}

impl TryFrom<DbReservationRow> for ReservationRow {
    type Error = StoreError;

    fn try_from(db_row: DbReservationRow) -> Result<Self, Self::Error> {
        let malformed = |reason: String| StoreError::MalformedRow {
            date_key: db_row.date_key.clone(),
            row_number: db_row.row_number,
            reason,
        };

        let row_number = u32::try_from(db_row.row_number)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| malformed("row number must be positive".to_string()))?;
        let status = db_row
            .status
            .parse::<ReservationStatus>()
            .map_err(|e| malformed(e.to_string()))?;

        Ok(Self {
            row_number,
            name: db_row.name,
            time: db_row.time_slot,
            people: db_row.people,
            phone: db_row.phone,
            email: db_row.email,
            date: db_row.booking_date,
            dish_type: db_row.dish_type,
            notes: db_row.notes,
            status,
            reservation_id: db_row.reservation_id,
            sms_reply: db_row.sms_reply,
            confirmation_method: db_row.confirmation_method,
        })
    }
}

pub fn stored_table(date_key: DateKey, db_rows: Vec<DbReservationRow>) -> DateTable {
    let rows = db_rows
        .into_iter()
        .filter_map(|db_row| match ReservationRow::try_from(db_row) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("Skipping stored row: {}", e);
                None
            }
        })
        .collect();
    DateTable { key: date_key, rows }
}

impl From<&EmailJob> for DbEmailJob {
    fn from(job: &EmailJob) -> Self {
        Self {
            id: job.id,
            recipient: job.message.to.clone(),
            subject: job.message.subject.clone(),
            body: job.message.body.clone(),
            state: "pending".to_string(),
            last_error: None,
            created_at: Some(Utc::now()),
            processed_at: None,
        }
    }
}

impl From<DbEmailJob> for EmailJob {
    fn from(db_job: DbEmailJob) -> Self {
        Self {
            id: db_job.id,
            message: EmailMessage {
                to: db_job.recipient,
                subject: db_job.subject,
                body: db_job.body,
            },
        }
    }
}
