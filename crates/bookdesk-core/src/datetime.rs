use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  Local,
  NaiveDate,
  NaiveTime,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

const MONTH_NAMES: [&str; 12] = [
  "January",
  "February",
  "March",
  "April",
  "May",
  "June",
  "July",
  "August",
  "September",
  "October",
  "November",
  "December"
];

pub const WEEKDAY_LABELS: [&str; 7] = [
  "Sun", "Mon", "Tue", "Wed", "Thu",
  "Fri", "Sat"
];

/// Reference date used for the
/// "today" marker. Falls back to the
/// local clock when no timezone is
/// configured.
#[must_use]
pub fn today_in(
  timezone: Option<Tz>
) -> NaiveDate {
  match timezone {
    | Some(tz) => {
      Utc::now()
        .with_timezone(&tz)
        .date_naive()
    }
    | None => Local::now().date_naive()
  }
}

pub fn parse_timezone(
  raw: &str
) -> anyhow::Result<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(anyhow!(
      "timezone cannot be empty"
    ));
  }
  trimmed.parse::<Tz>().map_err(|err| {
    anyhow!(
      "invalid timezone \
       '{trimmed}': {err}"
    )
  })
}

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    shift_month(year, month, 1);
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// Moves a (year, month) pair by
/// `step` months, rolling the year over
/// in both directions.
#[must_use]
pub fn shift_month(
  year: i32,
  month: u32,
  step: i32
) -> (i32, u32) {
  let index = year as i64 * 12
    + (month as i64 - 1)
    + step as i64;
  let year = index.div_euclid(12) as i32;
  let month =
    index.rem_euclid(12) as u32 + 1;
  (year, month)
}

#[must_use]
pub fn month_name(
  month: u32
) -> &'static str {
  MONTH_NAMES
    .get(month.wrapping_sub(1) as usize)
    .copied()
    .unwrap_or("")
}

#[must_use]
pub fn month_title(
  year: i32,
  month: u32
) -> String {
  format!("{} {year}", month_name(month))
}

pub fn parse_booking_date(
  raw: &str
) -> anyhow::Result<NaiveDate> {
  NaiveDate::parse_from_str(
    raw.trim(),
    "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "invalid date '{raw}', expected \
       YYYY-MM-DD"
    )
  })
}

pub fn parse_year_month(
  raw: &str
) -> anyhow::Result<(i32, u32)> {
  let month_re = Regex::new(
    r"^(?P<year>\d{4})-(?P<month>\d{1,2})$"
  )?;
  let captures = month_re
    .captures(raw.trim())
    .ok_or_else(|| {
      anyhow!(
        "invalid month '{raw}', \
         expected YYYY-MM"
      )
    })?;

  let year = captures["year"]
    .parse::<i32>()
    .context("invalid year")?;
  let month = captures["month"]
    .parse::<u32>()
    .context("invalid month")?;
  if !(1..=12).contains(&month) {
    return Err(anyhow!(
      "month out of range: {month}"
    ));
  }

  Ok((year, month))
}

/// Parses an `HH:MM` clock time;
/// trailing seconds are tolerated.
#[must_use]
pub fn parse_clock_time(
  token: &str
) -> Option<NaiveTime> {
  let trimmed = token.trim();
  NaiveTime::parse_from_str(
    trimmed, "%H:%M"
  )
  .or_else(|_| {
    NaiveTime::parse_from_str(
      trimmed, "%H:%M:%S"
    )
  })
  .ok()
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    days_in_month,
    last_day_of_month,
    month_title,
    parse_clock_time,
    parse_year_month,
    shift_month
  };

  #[test]
  fn shifts_months_across_years() {
    assert_eq!(
      shift_month(2025, 12, 1),
      (2026, 1)
    );
    assert_eq!(
      shift_month(2025, 1, -1),
      (2024, 12)
    );
    assert_eq!(
      shift_month(2025, 6, -18),
      (2023, 12)
    );
    assert_eq!(
      shift_month(2025, 6, 0),
      (2025, 6)
    );
  }

  #[test]
  fn counts_days_including_leap_years()
  {
    assert_eq!(days_in_month(2024, 2), 29);
    assert_eq!(days_in_month(2025, 2), 28);
    assert_eq!(days_in_month(1900, 2), 28);
    assert_eq!(days_in_month(2000, 2), 29);
    assert_eq!(days_in_month(2025, 4), 30);
    assert_eq!(
      last_day_of_month(2025, 12),
      NaiveDate::from_ymd_opt(
        2025, 12, 31
      )
      .expect("valid date")
    );
  }

  #[test]
  fn parses_year_month() {
    assert_eq!(
      parse_year_month("2025-06")
        .expect("parse month"),
      (2025, 6)
    );
    assert!(
      parse_year_month("2025-13").is_err()
    );
    assert!(
      parse_year_month("june").is_err()
    );
  }

  #[test]
  fn parses_clock_times() {
    assert_eq!(
      parse_clock_time("09:30")
        .map(|t| t.to_string()),
      Some("09:30:00".to_string())
    );
    assert!(
      parse_clock_time("18:00:00")
        .is_some()
    );
    assert!(
      parse_clock_time("25:00").is_none()
    );
  }

  #[test]
  fn titles_months() {
    assert_eq!(
      month_title(2025, 6),
      "June 2025"
    );
  }
}

/// `HH:MM` wire format for booking
/// times.
pub mod clock_serde {
  use chrono::NaiveTime;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    time: &NaiveTime,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &time.format("%H:%M").to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveTime, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::parse_clock_time(&raw)
      .ok_or_else(|| {
        serde::de::Error::custom(format!(
          "invalid clock time: {raw}"
        ))
      })
  }
}
