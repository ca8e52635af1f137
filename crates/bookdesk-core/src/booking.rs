use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use tracing::warn;

use crate::datetime::clock_serde;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ShiftType {
    Morning,
    Evening,
    Fullday,
    #[default]
    #[serde(other)]
    None,
}

impl ShiftType {
    pub fn as_str(self) -> &'static str {
        match self {
            ShiftType::Morning => "morning",
            ShiftType::Evening => "evening",
            ShiftType::Fullday => "fullday",
            ShiftType::None => "none",
        }
    }

    /// Label shown next to a single booking's time range.
    pub fn label(self) -> &'static str {
        match self {
            ShiftType::Morning => "[Morning]",
            ShiftType::Evening => "[Evening]",
            ShiftType::Fullday => "[Full Day]",
            ShiftType::None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount is not a number: {0}")]
    Invalid(String),
    #[error("amount cannot be negative: {0}")]
    Negative(String),
}

/// Non-negative money amount held as minor units (two decimal places).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdvanceAmount {
    paisa: u64,
}

impl AdvanceAmount {
    pub fn from_paisa(paisa: u64) -> Self {
        Self { paisa }
    }

    pub fn paisa(self) -> u64 {
        self.paisa
    }
}

impl fmt::Display for AdvanceAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.paisa / 100, self.paisa % 100)
    }
}

impl FromStr for AdvanceAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(AmountError::Empty);
        }

        if let Some(rest) = raw.strip_prefix('-') {
            return match rest.parse::<AdvanceAmount>() {
                Ok(amount) if amount.paisa == 0 => Ok(amount),
                Ok(_) => Err(AmountError::Negative(raw.to_string())),
                Err(_) => Err(AmountError::Invalid(raw.to_string())),
            };
        }

        let invalid = || AmountError::Invalid(raw.to_string());
        let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
            || frac.len() > 2
        {
            return Err(invalid());
        }

        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<u64>().map_err(|_| invalid())?
        };
        let frac_units = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse::<u64>().map_err(|_| invalid())?,
        };

        let paisa = whole_units
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac_units))
            .ok_or_else(invalid)?;

        Ok(Self { paisa })
    }
}

impl Serialize for AdvanceAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(f64),
}

impl RawAmount {
    fn parse(self) -> Result<AdvanceAmount, AmountError> {
        match self {
            RawAmount::Text(text) => text.parse(),
            RawAmount::Number(value) => format!("{value:.2}").parse(),
        }
    }
}

impl<'de> Deserialize<'de> for AdvanceAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawAmount::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// Stored records are not validated server side, so a negative advance on
/// the wire reads as zero instead of failing the whole list.
fn deserialize_stored_amount<'de, D>(deserializer: D) -> Result<AdvanceAmount, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<RawAmount>::deserialize(deserializer)? else {
        return Ok(AdvanceAmount::default());
    };
    match raw.parse() {
        Ok(amount) => Ok(amount),
        Err(AmountError::Negative(text)) => {
            warn!(amount = %text, "negative advance in stored booking; reading as 0.00");
            Ok(AdvanceAmount::default())
        }
        Err(err) => Err(serde::de::Error::custom(err)),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: u64,

    pub client_name: String,

    pub booking_date: NaiveDate,

    #[serde(with = "clock_serde")]
    pub start_time: NaiveTime,

    #[serde(with = "clock_serde")]
    pub end_time: NaiveTime,

    #[serde(default, deserialize_with = "deserialize_shift")]
    pub shift_type: ShiftType,

    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub event_type: String,

    #[serde(default)]
    pub event_type_display: Option<String>,

    #[serde(default)]
    pub created_by: String,

    #[serde(default, deserialize_with = "deserialize_stored_amount")]
    pub advance_given: AdvanceAmount,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Booking {
    pub fn new(
        id: u64,
        client_name: impl Into<String>,
        booking_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        shift_type: ShiftType,
    ) -> Self {
        Self {
            id,
            client_name: client_name.into(),
            booking_date,
            start_time,
            end_time,
            shift_type,
            color: String::new(),
            event_type: String::new(),
            event_type_display: None,
            created_by: String::new(),
            advance_given: AdvanceAmount::default(),
            extra: BTreeMap::new(),
        }
    }

    /// Human readable event type, preferring the server-side display name.
    pub fn event_label(&self) -> &str {
        self.event_type_display
            .as_deref()
            .filter(|label| !label.is_empty())
            .unwrap_or(&self.event_type)
    }

    /// Free-form extra field as display text; numbers are printed as-is and
    /// null or missing values read as empty.
    pub fn extra_text(&self, key: &str) -> String {
        match self.extra.get(key) {
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    pub fn time_range(&self) -> String {
        format!(
            "{}-{}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

fn deserialize_shift<'de, D>(deserializer: D) -> Result<ShiftType, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ShiftType>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of the "list bookings" endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingsEnvelope {
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_advance_amounts() {
        assert_eq!("1500".parse::<AdvanceAmount>().map(|a| a.paisa()), Ok(150_000));
        assert_eq!("1500.5".parse::<AdvanceAmount>().map(|a| a.paisa()), Ok(150_050));
        assert_eq!("0.05".parse::<AdvanceAmount>().map(|a| a.paisa()), Ok(5));
        assert_eq!(".75".parse::<AdvanceAmount>().map(|a| a.paisa()), Ok(75));
        assert_eq!(
            "-10".parse::<AdvanceAmount>(),
            Err(AmountError::Negative("-10".to_string()))
        );
        assert_eq!(
            "ten".parse::<AdvanceAmount>(),
            Err(AmountError::Invalid("ten".to_string()))
        );
        assert_eq!(
            "1.234".parse::<AdvanceAmount>(),
            Err(AmountError::Invalid("1.234".to_string()))
        );
        assert_eq!("  ".parse::<AdvanceAmount>(), Err(AmountError::Empty));
    }

    #[test]
    fn displays_two_decimal_places() {
        assert_eq!(AdvanceAmount::from_paisa(150_050).to_string(), "1500.50");
        assert_eq!(AdvanceAmount::default().to_string(), "0.00");
    }

    #[test]
    fn decodes_wire_booking() {
        let raw = r##"{
            "id": 7,
            "client_name": "Sita Sharma",
            "booking_date": "2025-06-10",
            "booking_date_nepali": "2082 Jestha 27",
            "start_time": "10:00",
            "end_time": "14:30",
            "shift_type": "morning",
            "color": "#f59e0b",
            "event_type": "wedding",
            "event_type_display": "Wedding",
            "advance_given": "5000.00",
            "created_by": "Admin User (Admin)"
        }"##;

        let booking: Booking = serde_json::from_str(raw).expect("decode booking");
        assert_eq!(booking.id, 7);
        assert_eq!(booking.shift_type, ShiftType::Morning);
        assert_eq!(booking.event_label(), "Wedding");
        assert_eq!(booking.time_range(), "10:00-14:30");
        assert_eq!(booking.advance_given.to_string(), "5000.00");
        assert!(booking.extra.contains_key("booking_date_nepali"));
    }

    #[test]
    fn unknown_or_missing_shift_is_none() {
        let raw = r#"{"id": 1, "client_name": "A", "booking_date": "2025-01-01",
            "start_time": "09:00:00", "end_time": "10:00", "shift_type": "night",
            "advance_given": 250}"#;
        let booking: Booking = serde_json::from_str(raw).expect("decode booking");
        assert_eq!(booking.shift_type, ShiftType::None);
        assert_eq!(booking.event_label(), "");
        assert_eq!(booking.advance_given.to_string(), "250.00");

        let raw = r#"{"id": 2, "client_name": "B", "booking_date": "2025-01-01",
            "start_time": "09:00", "end_time": "10:00", "shift_type": null}"#;
        let booking: Booking = serde_json::from_str(raw).expect("decode booking");
        assert_eq!(booking.shift_type, ShiftType::None);
    }

    #[test]
    fn envelope_without_bookings_is_empty() {
        let envelope: BookingsEnvelope = serde_json::from_str("{}").expect("decode");
        assert!(envelope.bookings.is_empty());
    }

    #[test]
    fn negative_stored_advance_does_not_fail_the_list() {
        let raw = r#"{"bookings": [
            {"id": 1, "client_name": "A", "booking_date": "2025-06-10",
             "start_time": "09:00", "end_time": "11:00", "advance_given": "-5.00"},
            {"id": 2, "client_name": "B", "booking_date": "2025-06-11",
             "start_time": "09:00", "end_time": "11:00", "advance_given": null}
        ]}"#;
        let envelope: BookingsEnvelope = serde_json::from_str(raw).expect("decode list");
        assert_eq!(envelope.bookings.len(), 2);
        assert_eq!(envelope.bookings[0].advance_given, AdvanceAmount::default());
        assert_eq!(envelope.bookings[1].advance_given, AdvanceAmount::default());

        let garbage = r#"{"id": 3, "client_name": "C", "booking_date": "2025-06-12",
            "start_time": "09:00", "end_time": "11:00", "advance_given": "lots"}"#;
        assert!(serde_json::from_str::<Booking>(garbage).is_err());
        assert!(serde_json::from_str::<AdvanceAmount>("\"-5.00\"").is_err());
    }

    #[test]
    fn extra_fields_read_as_text() {
        let raw = r#"{"id": 4, "client_name": "D", "booking_date": "2025-06-10",
            "start_time": "09:00", "end_time": "11:00", "no_of_packs": 200,
            "menu_type": "veg", "email": null}"#;
        let booking: Booking = serde_json::from_str(raw).expect("decode booking");
        assert_eq!(booking.extra_text("no_of_packs"), "200");
        assert_eq!(booking.extra_text("menu_type"), "veg");
        assert_eq!(booking.extra_text("email"), "");
        assert_eq!(booking.extra_text("phone_number"), "");
    }
}
