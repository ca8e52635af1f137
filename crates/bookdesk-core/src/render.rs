use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::booking::Booking;
use crate::config::Config;
use crate::datetime::WEEKDAY_LABELS;
use crate::selection::DayAction;
use crate::shift::ShiftClass;
use crate::upcoming::Upcoming;
use crate::users::User;
use crate::view::{CalendarCell, MonthView};

const MIN_CELL_WIDTH: usize = 10;
const MAX_CELL_WIDTH: usize = 18;

const DETAIL_EXTRAS: [(&str, &str); 4] = [
    ("phone_number", "phone"),
    ("email", "email"),
    ("menu_type", "menu"),
    ("no_of_packs", "packs"),
];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color()? && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, view), fields(year = view.year, month = view.month))]
    pub fn print_month(&self, view: &MonthView) -> anyhow::Result<()> {
        self.write_month(io::stdout().lock(), view)
    }

    pub fn write_month<W: Write>(&self, mut out: W, view: &MonthView) -> anyhow::Result<()> {
        match &view.secondary_title {
            Some(secondary) => writeln!(out, "{} ({secondary})", view.title)?,
            None => writeln!(out, "{}", view.title)?,
        }

        let blocks: Vec<Vec<String>> = view.cells.iter().map(cell_lines).collect();
        let width = blocks
            .iter()
            .flatten()
            .map(|line| UnicodeWidthStr::width(line.as_str()))
            .chain(std::iter::once(MIN_CELL_WIDTH))
            .max()
            .unwrap_or(MIN_CELL_WIDTH)
            .min(MAX_CELL_WIDTH);

        for label in WEEKDAY_LABELS {
            write!(out, "{label:<width$} ")?;
        }
        writeln!(out)?;
        for _ in WEEKDAY_LABELS {
            write!(out, "{:-<width$} ", "")?;
        }
        writeln!(out)?;

        for (week_cells, week_blocks) in view.cells.chunks(7).zip(blocks.chunks(7)) {
            let height = week_blocks.iter().map(Vec::len).max().unwrap_or(0);
            for row in 0..height {
                for (cell, block) in week_cells.iter().zip(week_blocks) {
                    let text = block
                        .get(row)
                        .map(|line| truncate_to_width(line, width))
                        .unwrap_or_default();
                    let padding = width.saturating_sub(UnicodeWidthStr::width(text.as_str()));
                    let text = if row == 0 {
                        self.paint(&text, day_style(cell))
                    } else {
                        text
                    };
                    write!(out, "{text}{} ", " ".repeat(padding))?;
                }
                writeln!(out)?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, list))]
    pub fn print_upcoming(&self, list: &Upcoming<'_>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Upcoming bookings: {}", list.total)?;
        if list.bookings.is_empty() {
            writeln!(out, "No upcoming bookings")?;
            return Ok(());
        }
        self.write_booking_table(&mut out, &list.bookings)
    }

    #[tracing::instrument(skip(self, bookings, action))]
    pub fn print_day(
        &self,
        date: NaiveDate,
        secondary_label: &str,
        bookings: &[&Booking],
        action: &DayAction,
        can_add: bool,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let heading = date.format("%b %-d, %Y");
        if secondary_label.is_empty() {
            writeln!(out, "{heading} - {} Bookings", bookings.len())?;
        } else {
            writeln!(out, "{heading} ({secondary_label}) - {} Bookings", bookings.len())?;
        }

        match action {
            DayAction::Add { .. } => writeln!(out, "No bookings; free to book.")?,
            DayAction::View { id } => {
                if let Some(booking) = bookings.iter().find(|b| b.id == *id) {
                    self.write_booking_detail(&mut out, booking)?;
                }
            }
            DayAction::List { .. } => self.write_booking_table(&mut out, bookings)?,
        }

        if !can_add {
            writeln!(out, "Day is fully booked.")?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, users), fields(count = users.len()))]
    pub fn print_users(&self, users: &[User]) -> anyhow::Result<()> {
        self.write_users(io::stdout().lock(), users)
    }

    /// User table. The filter column is the `--creator` value that shows only
    /// that user's bookings.
    pub fn write_users<W: Write>(&self, mut out: W, users: &[User]) -> anyhow::Result<()> {
        if users.is_empty() {
            writeln!(out, "No users registered yet")?;
            return Ok(());
        }

        let headers = ["ID", "Name", "Email", "Created By", "Created", "Filter"]
            .map(str::to_string)
            .to_vec();
        let rows = users
            .iter()
            .map(|user| {
                vec![
                    self.paint(&user.id.to_string(), "33"),
                    user.full_name.clone(),
                    user.login_email.clone(),
                    user.creator_label().to_string(),
                    user.created_at
                        .as_deref()
                        .map(short_timestamp)
                        .unwrap_or_else(|| "N/A".to_string()),
                    user.creator_filter().to_string(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
        Ok(())
    }

    fn write_booking_table<W: Write>(&self, out: W, bookings: &[&Booking]) -> anyhow::Result<()> {
        let headers = ["ID", "Date", "Time", "Shift", "Client", "Event", "Advance", "Created By"]
            .map(str::to_string)
            .to_vec();

        let rows = bookings
            .iter()
            .map(|booking| {
                vec![
                    self.paint(&booking.id.to_string(), "33"),
                    booking.booking_date.format("%Y-%m-%d").to_string(),
                    booking.time_range(),
                    booking.shift_type.label().to_string(),
                    booking.client_name.clone(),
                    booking.event_label().to_string(),
                    format!("Rs. {}", booking.advance_given),
                    booking.created_by.clone(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    fn write_booking_detail<W: Write>(&self, mut out: W, booking: &Booking) -> anyhow::Result<()> {
        writeln!(out, "id        {}", booking.id)?;
        writeln!(out, "client    {}", booking.client_name)?;
        writeln!(out, "time      {} {}", booking.time_range(), booking.shift_type.label())?;
        writeln!(out, "event     {}", booking.event_label())?;
        for (key, label) in DETAIL_EXTRAS {
            let value = booking.extra_text(key);
            if !value.is_empty() {
                writeln!(out, "{label:<9} {value}")?;
            }
        }
        writeln!(out, "advance   Rs. {}", booking.advance_given)?;
        writeln!(out, "creator   {}", booking.created_by)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || code.is_empty() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn short_timestamp(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|at| at.format("%b %-d, %Y %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn cell_lines(cell: &CalendarCell) -> Vec<String> {
    let mut lines = Vec::with_capacity(4);
    let marker = if cell.is_today { " *" } else { "" };
    lines.push(format!("{:>2}{marker}", cell.day_number));
    lines.push(cell.secondary_label.clone());
    for summary in &cell.summaries {
        lines.push(summary.client_name.clone());
    }
    if let Some(more) = cell.overflow_label() {
        lines.push(more);
    }
    lines
}

fn day_style(cell: &CalendarCell) -> &'static str {
    if !cell.in_current_month {
        return "2";
    }
    match cell.shift {
        ShiftClass::Fullday => "35",
        ShiftClass::Mixed => "36",
        ShiftClass::Morning => "33",
        ShiftClass::Evening => "34",
        ShiftClass::None if cell.is_today => "1",
        ShiftClass::None => "",
    }
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
