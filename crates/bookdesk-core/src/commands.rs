use anyhow::{Context, anyhow};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::api::{CreatorFilter, Source, block_on};
use crate::booking::Booking;
use crate::cli::{Invocation, known_command_names};
use crate::config::Config;
use crate::datetime::{parse_booking_date, parse_year_month, shift_month};
use crate::form::BookingDraft;
use crate::index::bookings_on;
use crate::render::Renderer;
use crate::secondary::SecondaryCalendar;
use crate::selection::{DayAction, MAX_BOOKINGS_PER_DAY, can_add_on, can_reschedule, resolve_day};
use crate::upcoming::upcoming;
use crate::users::{RegistrationDraft, UserEditDraft};
use crate::view::render_month;

/// Per-run state threaded through every command.
#[derive(Debug)]
pub struct Session<'a> {
    pub cfg: &'a Config,
    pub source: &'a Source,
    pub renderer: &'a Renderer,
    pub creator: Option<CreatorFilter>,
    pub today: NaiveDate,
    pub json: bool,
}

#[instrument(skip(session, inv), fields(command = %inv.command))]
pub fn dispatch(session: &Session<'_>, inv: Invocation) -> anyhow::Result<()> {
    debug!(args = ?inv.command_args, "dispatching command");

    let args = inv.command_args.as_slice();
    match inv.command.as_str() {
        "month" => cmd_month(session, args),
        "upcoming" => cmd_upcoming(session, args),
        "day" => cmd_day(session, args),
        "add" => cmd_add(session, args),
        "edit" => cmd_edit(session, args),
        "delete" => cmd_delete(session, args),
        "users" => cmd_users(session, args),
        "register" => cmd_register(session, args),
        "unregister" => cmd_unregister(session, args),
        "show" => cmd_show(session.cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// Resolves the month argument: `YYYY-MM`, a relative offset such as `+1`
/// or `-2`, or nothing for the month containing `today`.
pub fn resolve_month_arg(arg: Option<&str>, today: NaiveDate) -> anyhow::Result<(i32, u32)> {
    let Some(raw) = arg.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok((today.year(), today.month()));
    };

    if raw.starts_with('+') || raw.starts_with('-') {
        let step = raw
            .parse::<i32>()
            .with_context(|| format!("invalid month offset: {raw}"))?;
        return Ok(shift_month(today.year(), today.month(), step));
    }

    parse_year_month(raw)
}

#[instrument(skip(session, args))]
fn cmd_month(session: &Session<'_>, args: &[String]) -> anyhow::Result<()> {
    let (year, month) = resolve_month_arg(args.first().map(String::as_str), session.today)?;
    let bookings = session.source.load_bookings(session.creator)?;
    let secondary = load_secondary(session, year, month);

    let view = render_month(year, month, &bookings, secondary.as_ref(), session.today);
    info!(year, month, bookings = bookings.len(), "rendered month");

    if session.json {
        session.renderer.print_json(&view)
    } else {
        session.renderer.print_month(&view)
    }
}

#[instrument(skip(session, args))]
fn cmd_upcoming(session: &Session<'_>, args: &[String]) -> anyhow::Result<()> {
    let limit = match args.first() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid upcoming limit: {raw}"))?,
        None => session.cfg.upcoming_limit()?,
    };

    let bookings = session.source.load_bookings(session.creator)?;
    let list = upcoming(&bookings, session.today, limit);

    if session.json {
        session.renderer.print_json(&list)
    } else {
        session.renderer.print_upcoming(&list)
    }
}

#[derive(Debug, Serialize)]
struct DayReport<'a> {
    date: NaiveDate,
    secondary_label: String,
    can_add: bool,
    action: &'a DayAction,
    bookings: &'a [&'a Booking],
}

#[instrument(skip(session, args))]
fn cmd_day(session: &Session<'_>, args: &[String]) -> anyhow::Result<()> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("day: expected a date (YYYY-MM-DD)"))?;
    let date = parse_booking_date(raw)?;

    let bookings = session.source.load_bookings(session.creator)?;
    let secondary_label = load_secondary(session, date.year(), date.month())
        .map(|calendar| calendar.label(date))
        .unwrap_or_default();

    let day = bookings_on(&bookings, date);
    let action = resolve_day(&bookings, date);
    let can_add = can_add_on(&bookings, date);

    if session.json {
        return session.renderer.print_json(&DayReport {
            date,
            secondary_label,
            can_add,
            action: &action,
            bookings: &day,
        });
    }

    session
        .renderer
        .print_day(date, &secondary_label, &day, &action, can_add)
}

#[instrument(skip(session, args))]
fn cmd_add(session: &Session<'_>, args: &[String]) -> anyhow::Result<()> {
    let api = session.source.api()?;

    let mut draft = BookingDraft::default();
    apply_fields(&mut draft, args)?;
    let payload = draft.validate()?;

    let existing = block_on(api.list_bookings(None))??;
    if !can_add_on(&existing, payload.booking_date) {
        return Err(anyhow!(
            "Maximum {MAX_BOOKINGS_PER_DAY} bookings per day ({} is full)",
            payload.booking_date
        ));
    }

    block_on(api.create_booking(&payload))??;
    println!("Booking created successfully!");
    Ok(())
}

#[instrument(skip(session, args))]
fn cmd_edit(session: &Session<'_>, args: &[String]) -> anyhow::Result<()> {
    let api = session.source.api()?;
    let (id, fields) = split_id(args, "edit")?;

    let existing = block_on(api.list_bookings(None))??;
    let current = existing
        .iter()
        .find(|booking| booking.id == id)
        .ok_or_else(|| anyhow!("booking not found: {id}"))?;

    let mut draft = BookingDraft::from_booking(current);
    apply_fields(&mut draft, fields)?;
    let payload = draft.validate()?;

    if !can_reschedule(&existing, id, payload.booking_date) {
        return Err(anyhow!(
            "Maximum {MAX_BOOKINGS_PER_DAY} bookings per day on the new date"
        ));
    }

    block_on(api.update_booking(id, &payload))??;
    println!("Booking updated successfully!");
    Ok(())
}

#[instrument(skip(session, args))]
fn cmd_delete(session: &Session<'_>, args: &[String]) -> anyhow::Result<()> {
    let api = session.source.api()?;
    let (id, rest) = split_id(args, "delete")?;
    if !rest.is_empty() {
        warn!(extra = ?rest, "delete: ignoring extra arguments");
    }

    block_on(api.delete_booking(id))??;
    println!("Booking deleted successfully");
    Ok(())
}

#[instrument(skip(session, args))]
fn cmd_users(session: &Session<'_>, args: &[String]) -> anyhow::Result<()> {
    let api = session.source.api()?;

    match args.split_first() {
        None => {
            let users = block_on(api.list_users())??;
            if session.json {
                session.renderer.print_json(&users)
            } else {
                session.renderer.print_users(&users)
            }
        }
        Some((sub, rest)) if sub == "edit" => {
            let (id, fields) = split_id(rest, "users edit")?;
            let users = block_on(api.list_users())??;
            let current = users
                .iter()
                .find(|user| user.id == id)
                .ok_or_else(|| anyhow!("user not found: {id}"))?;

            let mut draft = UserEditDraft::from_user(current);
            apply_user_fields(fields, |key, value| draft.set_field(key, value))?;
            let payload = draft.validate()?;

            block_on(api.update_user(id, &payload))??;
            println!("User updated successfully!");
            Ok(())
        }
        Some((sub, _)) => Err(anyhow!("users: unknown subcommand: {sub} (expected edit)")),
    }
}

#[instrument(skip(session, args))]
fn cmd_register(session: &Session<'_>, args: &[String]) -> anyhow::Result<()> {
    let api = session.source.api()?;

    let mut draft = RegistrationDraft::default();
    apply_user_fields(args, |key, value| draft.set_field(key, value))?;
    let payload = draft.validate()?;

    block_on(api.register_user(&payload))??;
    println!("User registered successfully!");
    Ok(())
}

#[instrument(skip(session, args))]
fn cmd_unregister(session: &Session<'_>, args: &[String]) -> anyhow::Result<()> {
    let api = session.source.api()?;
    let (id, rest) = split_id(args, "unregister")?;
    if !rest.is_empty() {
        warn!(extra = ?rest, "unregister: ignoring extra arguments");
    }

    block_on(api.delete_user(id))??;
    println!("User deleted successfully");
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for file in &cfg.loaded_files {
        println!("# {}", file.display());
    }
    for (key, value) in cfg.iter() {
        println!("{key}={value}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("bookdesk [options] <command> [args]");
    println!();
    println!("Commands (unique prefixes work):");
    for name in known_command_names() {
        let usage = match name {
            "month" => "month [YYYY-MM | +N | -N]   month grid",
            "upcoming" => "upcoming [N]                bookings from today on",
            "day" => "day YYYY-MM-DD              bookings on one date",
            "add" => "add field:value...          create a booking",
            "edit" => "edit <id> field:value...    update a booking",
            "delete" => "delete <id>                 remove a booking",
            "users" => "users [edit <id> field:value...]  list or update staff users",
            "register" => "register field:value...     add a staff user",
            "unregister" => "unregister <id>             remove a staff user",
            "show" => "show                        effective configuration",
            "help" => "help                        this text",
            _ => "version                     print version",
        };
        println!("  {usage}");
    }
    println!();
    println!("Booking fields: client date start end phone email event menu packs advance");
    println!("User fields: name email password confirm");
    println!();
    println!("Global options may also follow the command (month --json).");
    Ok(())
}

fn apply_fields(draft: &mut BookingDraft, args: &[String]) -> anyhow::Result<()> {
    for arg in args {
        let (key, value) = arg
            .split_once(':')
            .ok_or_else(|| anyhow!("expected field:value, got: {arg}"))?;
        if !draft.set_field(key, value) {
            return Err(anyhow!("unknown booking field: {key}"));
        }
    }
    Ok(())
}

fn apply_user_fields(
    args: &[String],
    mut set: impl FnMut(&str, &str) -> bool,
) -> anyhow::Result<()> {
    for arg in args {
        let (key, value) = arg
            .split_once(':')
            .ok_or_else(|| anyhow!("expected field:value, got: {arg}"))?;
        if !set(key, value) {
            return Err(anyhow!("unknown user field: {key}"));
        }
    }
    Ok(())
}

fn split_id<'a>(args: &'a [String], command: &str) -> anyhow::Result<(u64, &'a [String])> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("{command}: expected a booking id"))?;
    let id = first
        .parse::<u64>()
        .with_context(|| format!("{command}: invalid booking id: {first}"))?;
    Ok((id, rest))
}

fn load_secondary(session: &Session<'_>, year: i32, month: u32) -> Option<SecondaryCalendar> {
    match session.source.load_calendar(year, month) {
        Ok(calendar) => Some(calendar),
        Err(err) => {
            let message = format!("{err:#}");
            warn!(error = %message, "failed to load calendar data; secondary labels disabled");
            None
        }
    }
}
