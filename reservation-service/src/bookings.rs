use serde::{Deserialize, Deserializer, Serialize};
use shared::*;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::outbox::{EmailJob, EmailOutbox};
use crate::store::{ReservationStore, StoreError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub people: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub dish_type: String,
    #[serde(default)]
    pub notes: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unrecognized phone number: {0}")]
    InvalidPhone(String),

    #[error("people must be a positive whole number, got {0:?}")]
    InvalidPeople(String),

    #[error(transparent)]
    InvalidField(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, BookingError::Store(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub reservation_id: i64,
    pub date: DateKey,
    pub row_number: u32,
    pub status: ReservationStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationListing {
    pub success: bool,
    pub message: String,
    pub reservations: Vec<ReservationRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_confirmed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pending: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_people: Option<u32>,
}

impl ReservationListing {
    fn empty(message: String) -> Self {
        Self {
            success: false,
            message,
            reservations: Vec::new(),
            total_confirmed: None,
            total_pending: None,
            total_people: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub date: String,
    pub row_number: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdateResult {
    pub success: bool,
    pub message: String,
}

fn required(value: &str, field: &'static str) -> Result<String, BookingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BookingError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

pub struct BookingService {
    store: Arc<dyn ReservationStore>,
    outbox: Arc<dyn EmailOutbox>,
    venue: Venue,
}

impl BookingService {
    pub fn new(store: Arc<dyn ReservationStore>, outbox: Arc<dyn EmailOutbox>, venue: Venue) -> Self {
        Self {
            store,
            outbox,
            venue,
        }
    }

    fn validate(request: BookingRequest) -> Result<NewReservation, BookingError> {
        let name = required(&request.name, "name")?;
        let email = required(&request.email, "email")?;
        let raw_phone = required(&request.phone, "phone")?;
        let people = required(&request.people, "people")?;
        let date = required(&request.date, "date")?;
        let time = required(&request.time, "time")?;

        let phone = normalize(&raw_phone)
            .into_canonical()
            .ok_or(BookingError::InvalidPhone(raw_phone))?;

        match people.parse::<u32>() {
            Ok(n) if n > 0 && people.chars().all(|c| c.is_ascii_digit()) => {}
            _ => return Err(BookingError::InvalidPeople(people)),
        }

        Ok(NewReservation {
            name,
            time,
            people,
            phone,
            email,
            date: date.parse()?,
            dish_type: request.dish_type.trim().to_string(),
            notes: request.notes.trim().to_string(),
        })
    }

    pub async fn create_reservation(
        &self,
        request: BookingRequest,
    ) -> Result<BookingConfirmation, BookingError> {
        let booking = Self::validate(request)?;
        let date_key = booking.date;

        let reservation_id = self.store.append_master_row(&booking).await?;
        self.store.create_table(&date_key).await?;

        let email = confirmation_email(&booking, &self.venue);
        let row_number = self
            .store
            .append_row(&date_key, booking.into_row(reservation_id))
            .await?;

        info!(
            "Created reservation {} on {} (row {})",
            reservation_id, date_key, row_number
        );

        if let Err(e) = self.outbox.enqueue(&EmailJob::new(email)).await {
            error!(
                "Failed to queue confirmation email for reservation {}: {}",
                reservation_id, e
            );
        }

        Ok(BookingConfirmation {
            reservation_id,
            date: date_key,
            row_number,
            status: ReservationStatus::Pending,
            message: "Reservation received. A confirmation email is on its way.".to_string(),
        })
    }

    pub async fn list_reservations(&self, date: &str) -> ReservationListing {
        let date_key: DateKey = match date.parse() {
            Ok(key) => key,
            Err(e) => return ReservationListing::empty(format!("Error loading reservations: {}", e)),
        };

        let table = match self.store.get_table(&date_key).await {
            Ok(Some(table)) if !table.is_empty() => table,
            Ok(_) => {
                return ReservationListing::empty(format!("No reservations found for {}", date_key))
            }
            Err(e) => {
                warn!("Failed to load reservations for {}: {}", date_key, e);
                return ReservationListing::empty(format!("Error loading reservations: {}", e));
            }
        };

        let mut reservations = table.rows;
        reservations.sort_by_key(|row| sort_time(&row.time));

        let total_confirmed = reservations
            .iter()
            .filter(|row| row.status == ReservationStatus::Confirmed)
            .count();
        let total_pending = reservations.iter().filter(|row| row.status.is_pending()).count();
        let total_people = reservations.iter().filter_map(ReservationRow::party_size).sum();

        ReservationListing {
            success: true,
            message: format!("Found {} reservations for {}", reservations.len(), date_key),
            reservations,
            total_confirmed: Some(total_confirmed),
            total_pending: Some(total_pending),
            total_people: Some(total_people),
        }
    }

    /// Staff override of a single status cell. No audit note is written.
    pub async fn update_status(&self, update: StatusUpdate) -> StatusUpdateResult {
        match self.try_update_status(&update).await {
            Ok(status) => {
                info!(
                    "Staff set row {} on {} to {}",
                    update.row_number, update.date, status
                );
                StatusUpdateResult {
                    success: true,
                    message: format!("Reservation updated to {}", status),
                }
            }
            Err(e) => {
                warn!("Status update on {} row {} failed: {}", update.date, update.row_number, e);
                StatusUpdateResult {
                    success: false,
                    message: format!("Error updating reservation: {}", e),
                }
            }
        }
    }

    async fn try_update_status(&self, update: &StatusUpdate) -> Result<ReservationStatus, BookingError> {
        let date_key: DateKey = update.date.parse()?;
        let status: ReservationStatus = update.status.parse()?;
        self.store
            .update_single_cell(&date_key, update.row_number, Column::Status, &status.to_string())
            .await?;
        Ok(status)
    }
}
