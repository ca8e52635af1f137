pub mod api;
pub mod booking;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod form;
pub mod grid;
pub mod index;
pub mod render;
pub mod secondary;
pub mod selection;
pub mod shift;
pub mod upcoming;
pub mod users;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting bookdesk"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.bookdeskrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let source = match cli.bookings {
    | Some(bookings) => {
      api::Source::Files {
        bookings,
        calendar: cli.calendar
      }
    }
    | None => {
      let url = cfg.api_url();
      api::Source::Api(
        api::ApiClient::new(&url)
          .with_context(|| {
            format!(
              "failed to set up API \
               client for {url}"
            )
          })?
      )
    }
  };

  let creator = match cli.creator {
    | Some(raw) => Some(raw.parse()?),
    | None => cfg.creator_filter()?
  };
  let today = datetime::today_in(
    cfg.timezone()?
  );
  let renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  let session = commands::Session {
    cfg: &cfg,
    source: &source,
    renderer: &renderer,
    creator,
    today,
    json: cli.json
  };
  commands::dispatch(&session, inv)?;

  info!("done");
  Ok(())
}
