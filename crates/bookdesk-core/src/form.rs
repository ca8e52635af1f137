use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::Serialize;

use crate::booking::{AdvanceAmount, AmountError, Booking};
use crate::datetime::{clock_serde, parse_clock_time};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Please fill all required fields")]
    MissingFields(Vec<&'static str>),
    #[error("Please enter a valid advance amount")]
    InvalidAdvance,
    #[error("Advance amount cannot be negative")]
    NegativeAdvance,
    #[error("invalid booking date: {0}")]
    InvalidDate(String),
    #[error("invalid time: {0}")]
    InvalidTime(String),
    #[error("End time must be after start time")]
    EndNotAfterStart,
    #[error("Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.")]
    InvalidPhone,
}

/// Raw booking form fields as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub client_name: String,
    pub booking_date: String,
    pub start_time: String,
    pub end_time: String,
    pub phone_number: String,
    pub email: String,
    pub event_type: String,
    pub menu_type: String,
    pub no_of_packs: String,
    pub advance_given: String,
}

/// Create/update request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingPayload {
    pub client_name: String,
    pub booking_date: NaiveDate,
    #[serde(with = "clock_serde")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_serde")]
    pub end_time: NaiveTime,
    pub phone_number: String,
    pub email: String,
    pub event_type: String,
    pub menu_type: String,
    pub no_of_packs: String,
    pub advance_given: AdvanceAmount,
}

fn phone_pattern() -> Option<&'static Regex> {
    static PHONE_RE: OnceLock<Option<Regex>> = OnceLock::new();
    PHONE_RE
        .get_or_init(|| Regex::new(r"^\+?1?\d{9,15}$").ok())
        .as_ref()
}

impl BookingDraft {
    /// Prefills the edit form from a stored booking.
    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            client_name: booking.client_name.clone(),
            booking_date: booking.booking_date.format("%Y-%m-%d").to_string(),
            start_time: booking.start_time.format("%H:%M").to_string(),
            end_time: booking.end_time.format("%H:%M").to_string(),
            phone_number: booking.extra_text("phone_number"),
            email: booking.extra_text("email"),
            event_type: booking.event_type.clone(),
            menu_type: booking.extra_text("menu_type"),
            no_of_packs: booking.extra_text("no_of_packs"),
            advance_given: booking.advance_given.to_string(),
        }
    }

    /// Updates one field from a `key:value` style name. Returns false for
    /// unknown keys.
    pub fn set_field(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "client" | "client_name" => &mut self.client_name,
            "date" | "booking_date" => &mut self.booking_date,
            "start" | "start_time" => &mut self.start_time,
            "end" | "end_time" => &mut self.end_time,
            "phone" | "phone_number" => &mut self.phone_number,
            "email" => &mut self.email,
            "event" | "event_type" => &mut self.event_type,
            "menu" | "menu_type" => &mut self.menu_type,
            "packs" | "no_of_packs" => &mut self.no_of_packs,
            "advance" | "advance_given" => &mut self.advance_given,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }

    pub fn validate(&self) -> Result<BookingPayload, DraftError> {
        let required = [
            ("client_name", &self.client_name),
            ("booking_date", &self.booking_date),
            ("start_time", &self.start_time),
            ("end_time", &self.end_time),
            ("phone_number", &self.phone_number),
            ("event_type", &self.event_type),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(DraftError::MissingFields(missing));
        }

        let advance_given = self.advance_given.parse::<AdvanceAmount>().map_err(|err| match err {
            AmountError::Negative(_) => DraftError::NegativeAdvance,
            AmountError::Empty | AmountError::Invalid(_) => DraftError::InvalidAdvance,
        })?;

        let booking_date = NaiveDate::parse_from_str(self.booking_date.trim(), "%Y-%m-%d")
            .map_err(|_| DraftError::InvalidDate(self.booking_date.clone()))?;
        let start_time = parse_clock_time(&self.start_time)
            .ok_or_else(|| DraftError::InvalidTime(self.start_time.clone()))?;
        let end_time = parse_clock_time(&self.end_time)
            .ok_or_else(|| DraftError::InvalidTime(self.end_time.clone()))?;
        if end_time <= start_time {
            return Err(DraftError::EndNotAfterStart);
        }

        let phone_number = self.phone_number.trim().to_string();
        if !phone_pattern().is_some_and(|re| re.is_match(&phone_number)) {
            return Err(DraftError::InvalidPhone);
        }

        Ok(BookingPayload {
            client_name: self.client_name.trim().to_string(),
            booking_date,
            start_time,
            end_time,
            phone_number,
            email: self.email.trim().to_string(),
            event_type: self.event_type.trim().to_string(),
            menu_type: self.menu_type.trim().to_string(),
            no_of_packs: self.no_of_packs.trim().to_string(),
            advance_given,
        })
    }
}
