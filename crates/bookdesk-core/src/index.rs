use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::booking::Booking;

/// Bookings on `date`, ordered by start time. Equal start times keep their
/// input order.
pub fn bookings_on(bookings: &[Booking], date: NaiveDate) -> Vec<&Booking> {
    let mut matched: Vec<&Booking> = bookings
        .iter()
        .filter(|booking| booking.booking_date == date)
        .collect();
    matched.sort_by_key(|booking| booking.start_time);
    matched
}

/// Date to bookings multimap, rebuilt for each render pass.
#[derive(Debug, Clone, Default)]
pub struct BookingIndex<'a> {
    by_date: BTreeMap<NaiveDate, Vec<&'a Booking>>,
}

impl<'a> BookingIndex<'a> {
    pub fn build(bookings: &'a [Booking]) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<&'a Booking>> = BTreeMap::new();
        for booking in bookings {
            by_date.entry(booking.booking_date).or_default().push(booking);
        }
        for day in by_date.values_mut() {
            day.sort_by_key(|booking| booking.start_time);
        }
        Self { by_date }
    }

    pub fn on(&self, date: NaiveDate) -> &[&'a Booking] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }

    /// Total number of indexed bookings.
    pub fn len(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}
