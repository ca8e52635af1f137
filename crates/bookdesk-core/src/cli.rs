use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "bookdesk",
    version,
    about = "Bookdesk: venue booking calendar in the terminal",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "bookdeskrc")]
    pub bookdeskrc: Option<PathBuf>,

    /// Read bookings from a JSON snapshot instead of the API.
    #[arg(long = "bookings")]
    pub bookings: Option<PathBuf>,

    /// Calendar metadata snapshot used with --bookings.
    #[arg(long = "calendar", requires = "bookings")]
    pub calendar: Option<PathBuf>,

    /// Only show bookings by one creator (user_<id> or custom_<id>).
    #[arg(long = "creator")]
    pub creator: Option<String>,

    /// Print view models as JSON.
    #[arg(long = "json")]
    pub json: bool,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` tokens out of argv so
/// clap never sees them. The binary name is always kept.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let Some((bin, args)) = raw.split_first() else {
        return Ok(PreprocessedArgs {
            cleaned_args: vec![],
            rc_overrides: vec![],
        });
    };

    let mut pre = PreprocessedArgs {
        cleaned_args: vec![bin.clone()],
        rc_overrides: vec![],
    };
    let mut kept = Vec::with_capacity(args.len());
    for arg in args {
        match positional_override(&arg.to_string_lossy()) {
            Some((key, value)) => {
                debug!(%key, %value, "rc override from argv");
                pre.rc_overrides.push((key, value));
            }
            None => kept.push(arg.clone()),
        }
    }
    pre.cleaned_args.extend(hoist_global_flags(kept));

    Ok(pre)
}

const VALUE_FLAGS: [&str; 5] = ["--rc", "--bookdeskrc", "--bookings", "--calendar", "--creator"];

fn is_global_switch(token: &str) -> bool {
    let repeated = |flag: char| {
        token
            .strip_prefix('-')
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c == flag))
    };
    matches!(token, "--json" | "--verbose" | "--quiet") || repeated('v') || repeated('q')
}

fn is_inline_value_flag(token: &str) -> bool {
    VALUE_FLAGS.iter().any(|flag| {
        token
            .strip_prefix(flag)
            .is_some_and(|rest| rest.starts_with('='))
    })
}

/// clap hands everything after the command word to `rest`, so global flags
/// written after it (`month --json`) are moved in front of the command.
/// A `--` stops the scan.
fn hoist_global_flags(args: Vec<OsString>) -> Vec<OsString> {
    let mut flags = Vec::new();
    let mut tail = Vec::new();
    let mut seen_command = false;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let token = arg.to_string_lossy().into_owned();

        if VALUE_FLAGS.contains(&token.as_str()) {
            flags.push(arg);
            flags.extend(iter.next());
            continue;
        }
        if !seen_command {
            if token.starts_with('-') {
                flags.push(arg);
            } else {
                seen_command = true;
                tail.push(arg);
            }
            continue;
        }
        if token == "--" {
            tail.push(arg);
            tail.extend(iter.by_ref());
            break;
        }
        if is_global_switch(&token) || is_inline_value_flag(&token) {
            debug!(flag = %token, "moving global flag ahead of the command");
            flags.push(arg);
        } else {
            tail.push(arg);
        }
    }

    flags.extend(tail);
    flags
}

fn positional_override(token: &str) -> Option<(String, String)> {
    let body = token.strip_prefix("rc.")?;
    let at = body.find(['=', ':'])?;
    let (key, value) = (&body[..at], &body[at + 1..]);
    (!key.is_empty()).then(|| (format!("rc.{key}"), value.to_string()))
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "month",
        "upcoming",
        "day",
        "add",
        "edit",
        "delete",
        "users",
        "register",
        "unregister",
        "show",
        "help",
        "version",
    ]
}

/// Resolves an exact name or a unique prefix.
pub fn expand_command_abbrev<'a>(token: &str, known: &[&'a str]) -> Option<&'a str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let mut tokens = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string());

        let Some(first) = tokens.next() else {
            let cmd = cfg
                .get("default.command")
                .unwrap_or_else(|| "month".to_string());
            debug!(command = %cmd, "no explicit command, using default");
            return Ok(Self {
                command: cmd,
                command_args: vec![],
            });
        };

        let command = expand_command_abbrev(&first, &known_command_names())
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first}"))?;
        debug!(token = %first, expanded = %command, "resolved command token");

        Ok(Self {
            command: command.to_string(),
            command_args: tokens.collect(),
        })
    }
}
