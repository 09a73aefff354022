use serde::Serialize;
use std::fmt;

use crate::datekey::DateKey;
use crate::status::ReservationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Time,
    People,
    Phone,
    Email,
    Date,
    DishType,
    Notes,
    Status,
    ReservationId,
    SmsReply,
    ConfirmationMethod,
}

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Time => "Time",
            Column::People => "People",
            Column::Phone => "Phone",
            Column::Email => "Email",
            Column::Date => "Date",
            Column::DishType => "Dish Type",
            Column::Notes => "Notes",
            Column::Status => "Confirmed",
            Column::ReservationId => "Reservation ID",
            Column::SmsReply => "SMS Reply",
            Column::ConfirmationMethod => "Confirmation Method",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Column::ReservationId)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationRow {
    /// 1-based position within the owning date table.
    pub row_number: u32,
    pub name: String,
    pub time: String,
    pub people: String,
    pub phone: String,
    pub email: String,
    pub date: String,
    pub dish_type: String,
    pub notes: String,
    pub status: ReservationStatus,
    pub reservation_id: Option<i64>,
    pub sms_reply: String,
    pub confirmation_method: String,
}

impl ReservationRow {
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Name => self.name.clone(),
            Column::Time => self.time.clone(),
            Column::People => self.people.clone(),
            Column::Phone => self.phone.clone(),
            Column::Email => self.email.clone(),
            Column::Date => self.date.clone(),
            Column::DishType => self.dish_type.clone(),
            Column::Notes => self.notes.clone(),
            Column::Status => self.status.to_string(),
            Column::ReservationId => self
                .reservation_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            Column::SmsReply => self.sms_reply.clone(),
            Column::ConfirmationMethod => self.confirmation_method.clone(),
        }
    }

    pub fn party_size(&self) -> Option<u32> {
        let people = self.people.trim();
        if people.is_empty() || !people.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        people.parse().ok()
    }

    pub fn has_phone(&self) -> bool {
        !self.phone.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub name: String,
    pub time: String,
    pub people: String,
    pub phone: String,
    pub email: String,
    pub date: DateKey,
    pub dish_type: String,
    pub notes: String,
}

impl NewReservation {
    pub fn into_row(self, reservation_id: i64) -> ReservationRow {
        ReservationRow {
            row_number: 0,
            name: self.name,
            time: self.time,
            people: self.people,
            phone: self.phone,
            email: self.email,
            date: self.date.to_string(),
            dish_type: self.dish_type,
            notes: self.notes,
            status: ReservationStatus::Pending,
            reservation_id: Some(reservation_id),
            sms_reply: String::new(),
            confirmation_method: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    pub row_number: u32,
    pub column: Column,
    pub value: String,
}

impl CellWrite {
    pub fn new(row_number: u32, column: Column, value: impl Into<String>) -> Self {
        Self {
            row_number,
            column,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTable {
    pub key: DateKey,
    pub rows: Vec<ReservationRow>,
}

impl DateTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn pending_with_phone(&self) -> impl Iterator<Item = &ReservationRow> {
        self.rows
            .iter()
            .filter(|row| row.status.is_pending() && row.has_phone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(row_number: u32, phone: &str, status: ReservationStatus) -> ReservationRow {
        ReservationRow {
            row_number,
            name: format!("Guest {row_number}"),
            time: "18:00".to_string(),
            people: "4".to_string(),
            phone: phone.to_string(),
            email: "guest@example.com".to_string(),
            date: "2024-09-30".to_string(),
            dish_type: String::new(),
            notes: String::new(),
            status,
            reservation_id: Some(row_number as i64),
            sms_reply: String::new(),
            confirmation_method: String::new(),
        }
    }

    #[test]
    fn pending_with_phone_skips_settled_and_phoneless_rows() {
        let table = DateTable {
            key: "2024-09-30".parse().unwrap(),
            rows: vec![
                row(1, "61412345678", ReservationStatus::Pending),
                row(2, "", ReservationStatus::Pending),
                row(3, "61412345679", ReservationStatus::Confirmed),
                row(4, "61412345670", ReservationStatus::Pending),
            ],
        };
        let selected: Vec<u32> = table.pending_with_phone().map(|r| r.row_number).collect();
        assert_eq!(selected, vec![1, 4]);
    }

    #[test]
    fn party_size_ignores_non_numeric_people() {
        let mut r = row(1, "61412345678", ReservationStatus::Pending);
        assert_eq!(r.party_size(), Some(4));
        r.people = "4-5".to_string();
        assert_eq!(r.party_size(), None);
        r.people = String::new();
        assert_eq!(r.party_size(), None);
    }

    #[test]
    fn status_column_keeps_its_legacy_header() {
        assert_eq!(Column::Status.to_string(), "Confirmed");
        assert_eq!(Column::SmsReply.to_string(), "SMS Reply");
        assert!(Column::ReservationId.is_read_only());
        assert!(!Column::Status.is_read_only());
    }

    #[test]
    fn new_reservation_starts_pending() {
        let booking = NewReservation {
            name: "Ada".to_string(),
            time: "19:00".to_string(),
            people: "2".to_string(),
            phone: "61412345678".to_string(),
            email: "ada@example.com".to_string(),
            date: "2024-09-30".parse().unwrap(),
            dish_type: "Spicy".to_string(),
            notes: String::new(),
        };
        let row = booking.into_row(7);
        assert_eq!(row.status, ReservationStatus::Pending);
        assert_eq!(row.reservation_id, Some(7));
        assert_eq!(row.date, "2024-09-30");
        assert_eq!(row.cell(Column::ReservationId), "7");
    }
}
