use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Alternate-calendar date shown under a Gregorian day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryDateEntry {
    pub gregorian_date: NaiveDate,
    pub month_name: String,
    pub day: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Deserialize)]
struct WireSecondaryDate {
    year: i32,
    day: u32,
    #[serde(default)]
    month_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WireCalendarDay {
    date: NaiveDate,
    #[serde(default)]
    nepali_date: Option<WireSecondaryDate>,
}

/// Body of the "calendar metadata" endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarMonthEnvelope {
    #[serde(default)]
    calendar_days: Vec<WireCalendarDay>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
}

/// Per-month lookup keyed by Gregorian date. Cells outside the requested
/// month usually have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondaryCalendar {
    entries: BTreeMap<NaiveDate, SecondaryDateEntry>,
}

impl SecondaryCalendar {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = SecondaryDateEntry>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.gregorian_date, entry))
                .collect(),
        }
    }

    pub fn from_envelope(envelope: CalendarMonthEnvelope) -> Self {
        let total = envelope.calendar_days.len();
        let calendar = Self::from_entries(envelope.calendar_days.into_iter().filter_map(|day| {
            let secondary = day.nepali_date?;
            Some(SecondaryDateEntry {
                gregorian_date: day.date,
                month_name: secondary.month_name,
                day: secondary.day,
                year: secondary.year,
            })
        }));
        debug!(
            days = total,
            entries = calendar.len(),
            "built secondary calendar lookup"
        );
        calendar
    }

    pub fn get(&self, date: NaiveDate) -> Option<&SecondaryDateEntry> {
        self.entries.get(&date)
    }

    /// "{month} {day}" for the cell, empty when the date has no entry.
    pub fn label(&self, date: NaiveDate) -> String {
        self.get(date)
            .map(|entry| format!("{} {}", entry.month_name, entry.day))
            .unwrap_or_default()
    }

    /// Month heading taken from the earliest entry.
    pub fn header(&self) -> Option<String> {
        self.entries
            .values()
            .next()
            .map(|entry| format!("{} {}", entry.month_name, entry.year))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "calendar_days": [
            {"date": "2025-06-01", "day": 1, "is_today": false, "booking_count": 0, "bookings": [],
             "nepali_date": {"year": 2082, "month": 2, "day": 18, "month_name": "Jestha",
                             "formatted": "2082-02-18", "formatted_nepali": "2082 Jestha 18"}},
            {"date": "2025-06-02", "day": 2, "nepali_date": null},
            {"date": "2025-06-15", "day": 15,
             "nepali_date": {"year": 2082, "month": 3, "day": 1, "month_name": "Asar"}}
        ],
        "year": 2025,
        "month": 6
    }"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn builds_lookup_from_month_body() {
        let envelope: CalendarMonthEnvelope = serde_json::from_str(BODY).expect("decode");
        assert_eq!(envelope.month, Some(6));
        let calendar = SecondaryCalendar::from_envelope(envelope);

        assert_eq!(calendar.len(), 2);
        assert_eq!(calendar.label(date(2025, 6, 1)), "Jestha 18");
        assert_eq!(calendar.label(date(2025, 6, 15)), "Asar 1");
        assert_eq!(calendar.label(date(2025, 6, 2)), "");
        assert_eq!(calendar.label(date(2025, 7, 1)), "");
        assert_eq!(calendar.header().as_deref(), Some("Jestha 2082"));
    }

    #[test]
    fn empty_calendar_has_no_header() {
        let calendar = SecondaryCalendar::default();
        assert!(calendar.is_empty());
        assert_eq!(calendar.header(), None);
    }
}
