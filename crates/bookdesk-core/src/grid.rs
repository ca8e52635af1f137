use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::datetime::{add_days, first_day_of_month};

/// Six weeks of seven days.
pub const GRID_CELLS: usize = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridDate {
    pub date: NaiveDate,
    pub in_target_month: bool,
}

/// Builds the Sunday-first month grid: trailing days of the previous month,
/// every day of `month`, then leading days of the next month up to 42 cells.
///
/// `month` must be within `1..=12`.
pub fn month_grid(year: i32, month: u32) -> Vec<GridDate> {
    debug_assert!((1..=12).contains(&month), "month out of range: {month}");

    let first = first_day_of_month(year, month);
    let lead = first.weekday().num_days_from_sunday() as i64;
    let start = add_days(first, -lead);

    (0..GRID_CELLS as i64)
        .map(|offset| {
            let date = add_days(start, offset);
            GridDate {
                date,
                in_target_month: date.year() == year && date.month() == month,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::days_in_month;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn every_month_has_42_consecutive_days() {
        for year in [1999, 2000, 2023, 2024, 2025, 2100] {
            for month in 1..=12 {
                let grid = month_grid(year, month);
                assert_eq!(grid.len(), GRID_CELLS);

                for pair in grid.windows(2) {
                    assert_eq!(add_days(pair[0].date, 1), pair[1].date);
                }

                let first_in = grid
                    .iter()
                    .position(|cell| cell.in_target_month)
                    .expect("month run present");
                let run = grid[first_in..]
                    .iter()
                    .take_while(|cell| cell.in_target_month)
                    .count();
                assert_eq!(run as u32, days_in_month(year, month));
                assert_eq!(
                    grid.iter().filter(|cell| cell.in_target_month).count(),
                    run,
                    "month run must be contiguous"
                );
                assert_eq!(grid[first_in].date, ymd(year, month, 1));
                assert_eq!(first_in as u32, ymd(year, month, 1).weekday().num_days_from_sunday());
            }
        }
    }

    #[test]
    fn leap_february_includes_the_29th() {
        let grid = month_grid(2024, 2);
        assert!(grid.iter().any(|cell| cell.date == ymd(2024, 2, 29) && cell.in_target_month));
        assert_eq!(grid.len(), 42);
    }

    #[test]
    fn rolls_over_year_boundaries() {
        let january = month_grid(2025, 1);
        // 2025-01-01 is a Wednesday.
        assert_eq!(january[0].date, ymd(2024, 12, 29));
        assert!(!january[0].in_target_month);

        let december = month_grid(2025, 12);
        assert_eq!(december[41].date, ymd(2026, 1, 10));
        assert!(!december[41].in_target_month);
    }

    #[test]
    fn month_starting_on_sunday_has_no_leading_days() {
        // 2025-06-01 is a Sunday.
        let grid = month_grid(2025, 6);
        assert_eq!(grid[0].date, ymd(2025, 6, 1));
        assert!(grid[0].in_target_month);
        assert_eq!(grid[41].date, ymd(2025, 7, 12));
    }
}
