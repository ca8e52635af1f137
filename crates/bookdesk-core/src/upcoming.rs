use chrono::NaiveDate;
use serde::Serialize;

use crate::booking::Booking;

pub const DEFAULT_UPCOMING_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Upcoming<'a> {
    /// All bookings on or after the reference date, before truncation.
    pub total: usize,
    pub bookings: Vec<&'a Booking>,
}

/// Bookings from `today` onwards, ordered by date then start time.
pub fn upcoming(bookings: &[Booking], today: NaiveDate, limit: usize) -> Upcoming<'_> {
    let mut ahead: Vec<&Booking> = bookings
        .iter()
        .filter(|booking| booking.booking_date >= today)
        .collect();
    ahead.sort_by_key(|booking| (booking.booking_date, booking.start_time));

    let total = ahead.len();
    ahead.truncate(limit);
    Upcoming {
        total,
        bookings: ahead,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::booking::ShiftType;

    fn booking(id: u64, day: u32, hour: u32) -> Booking {
        Booking::new(
            id,
            "client",
            NaiveDate::from_ymd_opt(2025, 6, day).expect("date"),
            NaiveTime::from_hms_opt(hour, 0, 0).expect("start"),
            NaiveTime::from_hms_opt(hour + 1, 0, 0).expect("end"),
            ShiftType::None,
        )
    }

    #[test]
    fn skips_past_bookings_and_orders_the_rest() {
        let bookings = vec![
            booking(1, 12, 18),
            booking(2, 9, 10),
            booking(3, 10, 15),
            booking(4, 12, 8),
            booking(5, 10, 9),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).expect("date");

        let list = upcoming(&bookings, today, DEFAULT_UPCOMING_LIMIT);
        assert_eq!(list.total, 4);
        assert_eq!(
            list.bookings.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![5, 3, 4, 1]
        );

        let short = upcoming(&bookings, today, 2);
        assert_eq!(short.total, 4);
        assert_eq!(short.bookings.len(), 2);
    }
}
