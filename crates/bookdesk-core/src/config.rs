use std::collections::BTreeMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::api::CreatorFilter;
use crate::datetime::parse_timezone;
use crate::upcoming::DEFAULT_UPCOMING_LIMIT;

const RC_ENV_VAR: &str = "BOOKDESKRC";
const RC_FILE_NAME: &str = ".bookdeskrc";
const DEFAULT_API_URL: &str =
  "http://127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct Config {
  map: BTreeMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = BTreeMap::new();
    map.insert(
      "api.url".to_string(),
      DEFAULT_API_URL.to_string()
    );
    map.insert(
      "default.command".to_string(),
      "month".to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    map.insert(
      "upcoming.limit".to_string(),
      DEFAULT_UPCOMING_LIMIT.to_string()
    );
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading bookdeskrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no bookdeskrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// `color` takes on/off style
  /// switches; other values are rejected.
  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    let raw = self
      .map
      .get("color")
      .map(|v| v.trim().to_ascii_lowercase())
      .unwrap_or_else(|| "on".to_string());
    match raw.as_str() {
      | "on" | "yes" | "true" | "1" => {
        Ok(true)
      }
      | "off" | "no" | "false" | "0" => {
        Ok(false)
      }
      | other => {
        Err(anyhow!(
          "invalid color setting: \
           {other}"
        ))
      }
    }
  }

  pub fn get_usize(
    &self,
    key: &str
  ) -> anyhow::Result<Option<usize>> {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim().parse::<usize>().with_context(
          || {
            format!(
              "{key} must be a \
               non-negative integer, \
               got: {v}"
            )
          }
        )
      })
      .transpose()
  }

  pub fn api_url(&self) -> String {
    self
      .get("api.url")
      .unwrap_or_else(|| {
        DEFAULT_API_URL.to_string()
      })
  }

  pub fn upcoming_limit(
    &self
  ) -> anyhow::Result<usize> {
    Ok(
      self
        .get_usize("upcoming.limit")?
        .unwrap_or(DEFAULT_UPCOMING_LIMIT)
    )
  }

  /// Timezone that decides "today";
  /// unset means the local clock.
  pub fn timezone(
    &self
  ) -> anyhow::Result<Option<Tz>> {
    self
      .map
      .get("timezone")
      .filter(|v| !v.trim().is_empty())
      .map(|v| parse_timezone(v))
      .transpose()
  }

  pub fn creator_filter(
    &self
  ) -> anyhow::Result<Option<CreatorFilter>>
  {
    self
      .map
      .get("filter.creator")
      .filter(|v| !v.trim().is_empty())
      .map(|v| v.parse::<CreatorFilter>())
      .transpose()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = home_relative(path);
    let text = fs::read_to_string(
      &path
    )
    .with_context(|| {
      format!(
        "cannot read rc file {}",
        path.display()
      )
    })?;
    self.loaded_files.push(path.clone());

    let dir = path
      .parent()
      .map_or_else(
        || PathBuf::from("."),
        Path::to_path_buf
      );

    for (idx, raw) in
      text.lines().enumerate()
    {
      let lineno = idx + 1;
      match RcLine::parse(raw) {
        | Some(RcLine::Blank) => {}
        | Some(RcLine::Include(target)) => {
          self.include(
            &dir, target, &path, lineno
          )?;
        }
        | Some(RcLine::Setting(
          key,
          value
        )) => {
          trace!(key, value, "rc setting");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
        | None => {
          return Err(anyhow!(
            "{}:{lineno}: expected \
             key=value, got: {raw}",
            path.display()
          ));
        }
      }
    }

    Ok(())
  }

  fn include(
    &mut self,
    dir: &Path,
    target: &str,
    from: &Path,
    lineno: usize
  ) -> anyhow::Result<()> {
    if target.is_empty() {
      return Err(anyhow!(
        "{}:{lineno}: include needs a \
         path",
        from.display()
      ));
    }

    let target =
      home_relative(Path::new(target));
    let target = if target.is_absolute() {
      target
    } else {
      dir.join(target)
    };

    if self.loaded_files.contains(&target)
    {
      warn!(include = %target.display(), "rc include already loaded; skipping");
      return Ok(());
    }
    if !target.exists() {
      warn!(include = %target.display(), "rc include not found; skipping");
      return Ok(());
    }

    debug!(
      from = %from.display(),
      include = %target.display(),
      line = lineno,
      "following rc include"
    );
    self.load_file(&target)
  }
}

/// One logical line of an rc file,
/// with `#` comments already removed.
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting(&'a str, &'a str)
}

impl<'a> RcLine<'a> {
  fn parse(raw: &'a str) -> Option<Self> {
    let line = match raw.find('#') {
      | Some(at) => &raw[..at],
      | None => raw
    }
    .trim();

    if line.is_empty() {
      return Some(Self::Blank);
    }
    if let Some(target) =
      line.strip_prefix("include ")
    {
      return Some(Self::Include(
        target.trim()
      ));
    }
    line.split_once('=').map(|(k, v)| {
      Self::Setting(k.trim(), v.trim())
    })
  }
}

/// `--bookdeskrc` wins, then
/// `$BOOKDESKRC` (`/dev/null` turns rc
/// loading off), then `~/.bookdeskrc`
/// when it exists.
#[tracing::instrument(skip(explicit))]
fn resolve_rc_path(
  explicit: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = explicit {
    return Ok(Some(path.to_owned()));
  }

  match std::env::var(RC_ENV_VAR) {
    | Ok(value) if value == "/dev/null" => {
      return Ok(None);
    }
    | Ok(value) => {
      return Ok(Some(PathBuf::from(
        value
      )));
    }
    | Err(_) => {}
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "no home directory; running \
       without a bookdeskrc"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  Ok(candidate.exists().then_some(candidate))
}

fn home_relative(path: &Path) -> PathBuf {
  match (
    path.strip_prefix("~"),
    dirs::home_dir()
  ) {
    | (Ok(rest), Some(home)) => {
      home.join(rest)
    }
    | _ => path.to_path_buf()
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::Config;
  use crate::api::CreatorFilter;

  #[test]
  fn loads_file_with_comments_and_includes()
  {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let extra = dir.path().join("extra.rc");
    fs::write(
      &extra,
      "filter.creator = custom_3\n"
    )
    .expect("write include");

    let main = dir.path().join("main.rc");
    fs::write(
      &main,
      "# venue settings\napi.url = \
       http://venue.local:9000 # lan\n\
       upcoming.limit=5\ninclude \
       extra.rc\ninclude missing.rc\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(&main))
      .expect("load config");
    assert_eq!(
      cfg.api_url(),
      "http://venue.local:9000"
    );
    assert_eq!(
      cfg.upcoming_limit()
        .expect("limit"),
      5
    );
    assert_eq!(
      cfg.creator_filter()
        .expect("filter"),
      Some(CreatorFilter::Custom(3))
    );
    assert_eq!(cfg.loaded_files.len(), 2);
    assert_eq!(
      cfg.get("default.command")
        .as_deref(),
      Some("month")
    );
  }

  #[test]
  fn rejects_lines_without_equals() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let main = dir.path().join("bad.rc");
    fs::write(&main, "color on\n")
      .expect("write rc");
    assert!(
      Config::load(Some(&main)).is_err()
    );
  }

  #[test]
  fn overrides_and_typed_getters() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "rc.color".to_string(),
        "off".to_string()
      ),
      (
        "timezone".to_string(),
        "Asia/Kathmandu".to_string()
      ),
      (
        "upcoming.limit".to_string(),
        "many".to_string()
      )
    ]);
    assert!(
      !cfg.color().expect("color")
    );
    assert_eq!(
      cfg.timezone()
        .expect("timezone")
        .map(|tz| tz.name().to_string()),
      Some("Asia/Kathmandu".to_string())
    );
    assert!(cfg.upcoming_limit().is_err());
  }
}
