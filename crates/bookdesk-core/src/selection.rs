use chrono::NaiveDate;
use serde::Serialize;

use crate::booking::Booking;
use crate::index::bookings_on;

/// The venue takes at most this many bookings on one date.
pub const MAX_BOOKINGS_PER_DAY: usize = 2;

/// What selecting a calendar day leads to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DayAction {
    Add { date: NaiveDate },
    View { id: u64 },
    List { date: NaiveDate, ids: Vec<u64> },
}

pub fn resolve_day(bookings: &[Booking], date: NaiveDate) -> DayAction {
    let day = bookings_on(bookings, date);
    match day.as_slice() {
        [] => DayAction::Add { date },
        [only] => DayAction::View { id: only.id },
        many => DayAction::List {
            date,
            ids: many.iter().map(|booking| booking.id).collect(),
        },
    }
}

pub fn can_add_on(bookings: &[Booking], date: NaiveDate) -> bool {
    bookings
        .iter()
        .filter(|booking| booking.booking_date == date)
        .count()
        < MAX_BOOKINGS_PER_DAY
}

/// Whether booking `id` may move to `target`. Staying on its own date is
/// always allowed; otherwise the target must have room once the booking
/// itself is left out of the count. An unknown id is treated as a new
/// booking.
pub fn can_reschedule(bookings: &[Booking], id: u64, target: NaiveDate) -> bool {
    if bookings
        .iter()
        .any(|booking| booking.id == id && booking.booking_date == target)
    {
        return true;
    }

    bookings
        .iter()
        .filter(|booking| booking.id != id && booking.booking_date == target)
        .count()
        < MAX_BOOKINGS_PER_DAY
}
