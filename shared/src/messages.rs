use chrono::NaiveDate;

use crate::cohort::Cohort;
use crate::row::{NewReservation, ReservationRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Venue {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl Default for Venue {
    fn default() -> Self {
        Self {
            name: "JiuLongDing Chongqing Hotpot".to_string(),
            address: "71 Dixon Street (up the stairs), Haymarket".to_string(),
            phone: "+61 423 987 048".to_string(),
        }
    }
}

pub fn reminder_sms(row: &ReservationRow, cohort: Cohort, venue: &Venue) -> String {
    format!(
        "Hi {}!\nThis is a reminder of your reservation {} on {} at {} for {} people.\nPlease reply Y to confirm or N to cancel.\nLocation: {}\n - {}",
        row.name,
        cohort.day_word(),
        row.date,
        row.time,
        row.people,
        venue.address,
        venue.name,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %d, %Y").to_string()
}

pub fn confirmation_email(booking: &NewReservation, venue: &Venue) -> EmailMessage {
    let formatted_date = long_date(booking.date.date());
    let dish_type = if booking.dish_type.trim().is_empty() {
        "Not specified"
    } else {
        booking.dish_type.as_str()
    };

    let body = format!(
        "Dear {name},\n\
         \n\
         Thank you for choosing {venue_name}!\n\
         \n\
         RESERVATION SUMMARY\n\
         Date: {date}\n\
         Time: {time}\n\
         People: {people} people\n\
         Dish Type: {dish_type}\n\
         Contact: {phone}\n\
         \n\
         RESTAURANT LOCATION\n\
         {venue_name}\n\
         {address}\n\
         Phone: {venue_phone}\n\
         \n\
         IMPORTANT REMINDERS\n\
         - Please arrive on time - we hold tables for 15 minutes\n\
         - To cancel or make changes, please call us at {venue_phone} with your name and date of reservation\n\
         \n\
         Warm regards,\n\
         The {venue_name} Team\n\
         \n\
         ---\n\
         This is an automated reservation summary.",
        name = booking.name,
        venue_name = venue.name,
        date = formatted_date,
        time = booking.time,
        people = booking.people,
        dish_type = dish_type,
        phone = booking.phone,
        address = venue.address,
        venue_phone = venue.phone,
    );

    EmailMessage {
        to: booking.email.clone(),
        subject: format!("Booking Summary - {} at {}", formatted_date, booking.time),
        body,
    }
}
