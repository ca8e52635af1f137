//! Month view model: the per-cell data a display layer needs to draw the
//! booking calendar. Nothing here touches a terminal or a DOM.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::instrument;

use crate::booking::Booking;
use crate::datetime::month_title;
use crate::grid::month_grid;
use crate::index::BookingIndex;
use crate::secondary::SecondaryCalendar;
use crate::shift::{ShiftClass, classify};

/// Bookings summarised inside a cell; the rest collapse into an overflow count.
pub const SUMMARY_LIMIT: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSummary {
    pub id: u64,
    pub client_name: String,
    pub color: String,
    pub shift_label: &'static str,
    pub tooltip: String,
}

impl BookingSummary {
    fn from_booking(booking: &Booking) -> Self {
        let shift_label = booking.shift_type.label();
        Self {
            id: booking.id,
            client_name: booking.client_name.clone(),
            color: booking.color.clone(),
            shift_label,
            tooltip: format!(
                "{} - {} ({}) {}",
                booking.client_name,
                booking.event_label(),
                booking.time_range(),
                shift_label
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub day_number: u32,
    pub in_current_month: bool,
    pub is_today: bool,
    pub secondary_label: String,
    /// Every booking on this date, ordered by start time.
    pub bookings: Vec<Booking>,
    pub summaries: Vec<BookingSummary>,
    pub overflow: usize,
    pub shift: ShiftClass,
}

impl CalendarCell {
    pub fn has_bookings(&self) -> bool {
        !self.bookings.is_empty()
    }

    pub fn overflow_label(&self) -> Option<String> {
        (self.overflow > 0).then(|| format!("+{} more", self.overflow))
    }

    pub fn css_classes(&self) -> Vec<&'static str> {
        let mut classes = vec!["calendar-day"];
        if !self.in_current_month {
            classes.push("other-month");
        }
        if self.is_today {
            classes.push("today");
        }
        if self.has_bookings() {
            classes.push("has-booking");
            let shift = self.shift.css_class();
            if !shift.is_empty() {
                classes.push(shift);
            }
        }
        classes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub title: String,
    pub secondary_title: Option<String>,
    pub cells: Vec<CalendarCell>,
}

#[instrument(skip(bookings, secondary), fields(bookings = bookings.len()))]
pub fn render_month(
    year: i32,
    month: u32,
    bookings: &[Booking],
    secondary: Option<&SecondaryCalendar>,
    today: NaiveDate,
) -> MonthView {
    let index = BookingIndex::build(bookings);

    let cells = month_grid(year, month)
        .into_iter()
        .map(|grid_date| {
            let date = grid_date.date;
            let day = index.on(date);
            CalendarCell {
                date,
                day_number: date.day(),
                in_current_month: grid_date.in_target_month,
                is_today: date == today,
                secondary_label: secondary.map(|cal| cal.label(date)).unwrap_or_default(),
                bookings: day.iter().map(|booking| (*booking).clone()).collect(),
                summaries: day
                    .iter()
                    .take(SUMMARY_LIMIT)
                    .map(|booking| BookingSummary::from_booking(booking))
                    .collect(),
                overflow: day.len().saturating_sub(SUMMARY_LIMIT),
                shift: classify(day.iter().copied()),
            }
        })
        .collect();

    MonthView {
        year,
        month,
        title: month_title(year, month),
        secondary_title: secondary.and_then(SecondaryCalendar::header),
        cells,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::booking::ShiftType;
    use crate::grid::GRID_CELLS;
    use crate::secondary::SecondaryDateEntry;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn at(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).expect("valid time")
    }

    fn booking(id: u64, day: NaiveDate, start: u32, shift: ShiftType) -> Booking {
        let mut booking = Booking::new(id, format!("Client {id}"), day, at(start), at(start + 2), shift);
        booking.event_type = "wedding".to_string();
        booking.event_type_display = Some("Wedding".to_string());
        booking.color = "#3b82f6".to_string();
        booking
    }

    #[test]
    fn three_bookings_show_two_summaries_and_overflow() {
        let day = date(2025, 6, 10);
        let bookings = vec![
            booking(1, day, 18, ShiftType::Evening),
            booking(2, day, 9, ShiftType::Morning),
            booking(3, day, 12, ShiftType::Morning),
        ];
        let view = render_month(2025, 6, &bookings, None, date(2025, 6, 1));
        assert_eq!(view.cells.len(), GRID_CELLS);

        let cell = view.cells.iter().find(|c| c.date == day).expect("cell present");
        assert_eq!(cell.bookings.len(), 3);
        assert_eq!(cell.summaries.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(cell.overflow, 1);
        assert_eq!(cell.overflow_label().as_deref(), Some("+1 more"));
        assert_eq!(cell.shift, ShiftClass::Mixed);
        assert_eq!(
            cell.css_classes(),
            vec!["calendar-day", "has-booking", "has-multiple-shifts"]
        );
        assert_eq!(cell.summaries[0].tooltip, "Client 2 - Wedding (09:00-11:00) [Morning]");
    }

    #[test]
    fn empty_day_has_no_classification_or_label() {
        let view = render_month(2025, 6, &[], None, date(2025, 6, 10));
        let cell = view.cells.iter().find(|c| c.date == date(2025, 6, 20)).expect("cell present");
        assert_eq!(cell.shift, ShiftClass::None);
        assert_eq!(cell.secondary_label, "");
        assert_eq!(cell.overflow, 0);
        assert_eq!(cell.overflow_label(), None);
        assert_eq!(cell.css_classes(), vec!["calendar-day"]);
    }

    #[test]
    fn marks_today_and_adjacent_month_cells() {
        let view = render_month(2025, 5, &[], None, date(2025, 5, 15));
        let today: Vec<_> = view.cells.iter().filter(|c| c.is_today).collect();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].day_number, 15);

        // 2025-05-01 is a Thursday, so four April days lead the grid.
        assert_eq!(view.cells[0].date, date(2025, 4, 27));
        assert!(!view.cells[0].in_current_month);
        assert!(view.cells[0].css_classes().contains(&"other-month"));
        assert_eq!(view.title, "May 2025");
    }

    #[test]
    fn bookings_in_adjacent_month_cells_are_shown() {
        let spill = date(2025, 7, 2);
        let bookings = vec![booking(9, spill, 8, ShiftType::Fullday)];
        let view = render_month(2025, 6, &bookings, None, date(2025, 6, 1));
        let cell = view.cells.iter().find(|c| c.date == spill).expect("cell present");
        assert!(!cell.in_current_month);
        assert_eq!(cell.shift, ShiftClass::Fullday);
        assert_eq!(view.cells.iter().map(|c| c.bookings.len()).sum::<usize>(), 1);
    }

    #[test]
    fn uses_secondary_calendar_labels() {
        let secondary = SecondaryCalendar::from_entries([SecondaryDateEntry {
            gregorian_date: date(2025, 6, 1),
            month_name: "Jestha".to_string(),
            day: 18,
            year: 2082,
        }]);
        let view = render_month(2025, 6, &[], Some(&secondary), date(2025, 6, 1));
        assert_eq!(view.secondary_title.as_deref(), Some("Jestha 2082"));
        assert_eq!(view.cells[0].secondary_label, "Jestha 18");
        assert_eq!(view.cells[1].secondary_label, "");
    }
}
