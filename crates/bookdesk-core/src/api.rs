use std::fmt;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use serde::Serialize;
use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::booking::{
  Booking,
  BookingsEnvelope
};
use crate::form::BookingPayload;
use crate::secondary::{
  CalendarMonthEnvelope,
  SecondaryCalendar
};
use crate::users::{
  RegistrationPayload,
  User,
  UserUpdatePayload,
  UsersEnvelope
};

/// Narrows the booking list to one
/// creator. Admin accounts and staff
/// accounts live in separate tables,
/// hence the two id spaces.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum CreatorFilter {
  Admin(u64),
  Custom(u64)
}

impl fmt::Display for CreatorFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | CreatorFilter::Admin(id) => {
        write!(f, "user_{id}")
      }
      | CreatorFilter::Custom(id) => {
        write!(f, "custom_{id}")
      }
    }
  }
}

impl FromStr for CreatorFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let raw = s.trim();
    let parse_id = |id: &str| {
      id.parse::<u64>().with_context(
        || {
          format!(
            "invalid creator id in \
             '{raw}'"
          )
        }
      )
    };

    if let Some(id) =
      raw.strip_prefix("user_")
    {
      return Ok(CreatorFilter::Admin(
        parse_id(id)?
      ));
    }
    if let Some(id) =
      raw.strip_prefix("custom_")
    {
      return Ok(CreatorFilter::Custom(
        parse_id(id)?
      ));
    }

    Err(anyhow!(
      "creator filter must look like \
       user_<id> or custom_<id>, got: \
       {raw}"
    ))
  }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
  base_url: String,
  client:   reqwest::Client
}

impl ApiClient {
  pub fn new(
    base_url: &str
  ) -> anyhow::Result<Self> {
    let trimmed =
      base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
      anyhow::bail!(
        "api.url is empty"
      );
    }

    let client =
      reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context(
          "failed building HTTP client"
        )?;

    Ok(Self {
      base_url: trimmed.to_string(),
      client
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  #[must_use]
  pub fn bookings_url(
    &self,
    filter: Option<CreatorFilter>
  ) -> String {
    match filter {
      | Some(filter) => {
        format!(
          "{}/api/bookings/?created_by={filter}",
          self.base_url
        )
      }
      | None => {
        format!(
          "{}/api/bookings/",
          self.base_url
        )
      }
    }
  }

  #[must_use]
  pub fn calendar_url(
    &self,
    year: i32,
    month: u32
  ) -> String {
    format!(
      "{}/api/calendar-data/?year={year}&month={month}",
      self.base_url
    )
  }

  #[instrument(skip(self))]
  pub async fn list_bookings(
    &self,
    filter: Option<CreatorFilter>
  ) -> anyhow::Result<Vec<Booking>> {
    let url = self.bookings_url(filter);
    let body = self
      .send(
        self
          .client
          .get(url.as_str())
          .header(
            reqwest::header::ACCEPT,
            "application/json"
          ),
        "Failed to load bookings"
      )
      .await?;
    let envelope: BookingsEnvelope =
      serde_json::from_str(&body)
        .context(
          "failed decoding bookings \
           response"
        )?;
    info!(
      count = envelope.bookings.len(),
      "loaded bookings"
    );
    Ok(envelope.bookings)
  }

  #[instrument(skip(self))]
  pub async fn calendar_month(
    &self,
    year: i32,
    month: u32
  ) -> anyhow::Result<SecondaryCalendar>
  {
    let url =
      self.calendar_url(year, month);
    let body = self
      .send(
        self
          .client
          .get(url.as_str())
          .header(
            reqwest::header::ACCEPT,
            "application/json"
          ),
        "Failed to load calendar data"
      )
      .await?;
    let envelope: CalendarMonthEnvelope =
      serde_json::from_str(&body)
        .context(
          "failed decoding calendar \
           response"
        )?;
    Ok(SecondaryCalendar::from_envelope(
      envelope
    ))
  }

  #[instrument(skip(self, payload))]
  pub async fn create_booking(
    &self,
    payload: &BookingPayload
  ) -> anyhow::Result<()> {
    let url = format!(
      "{}/api/bookings/create/",
      self.base_url
    );
    self
      .send(
        self.json_request(
          self.client.post(url.as_str()),
          payload
        )?,
        "Failed to create booking"
      )
      .await?;
    info!("booking created");
    Ok(())
  }

  #[instrument(skip(self, payload))]
  pub async fn update_booking(
    &self,
    id: u64,
    payload: &BookingPayload
  ) -> anyhow::Result<()> {
    let url = format!(
      "{}/api/bookings/{id}/update/",
      self.base_url
    );
    self
      .send(
        self.json_request(
          self.client.put(url.as_str()),
          payload
        )?,
        "Failed to update booking"
      )
      .await?;
    info!("booking updated");
    Ok(())
  }

  #[instrument(skip(self))]
  pub async fn delete_booking(
    &self,
    id: u64
  ) -> anyhow::Result<()> {
    let url = format!(
      "{}/api/bookings/{id}/delete/",
      self.base_url
    );
    self
      .send(
        self.client.delete(url.as_str()),
        "Failed to delete booking"
      )
      .await?;
    info!("booking deleted");
    Ok(())
  }

  #[must_use]
  pub fn users_url(&self) -> String {
    format!(
      "{}/auth/api/users/",
      self.base_url
    )
  }

  #[instrument(skip(self))]
  pub async fn list_users(
    &self
  ) -> anyhow::Result<Vec<User>> {
    let url = self.users_url();
    let body = self
      .send(
        self
          .client
          .get(url.as_str())
          .header(
            reqwest::header::ACCEPT,
            "application/json"
          ),
        "Failed to load users"
      )
      .await?;
    let users = parse_users(&body)
      .context(
        "failed decoding users response"
      )?;
    info!(
      count = users.len(),
      "loaded users"
    );
    Ok(users)
  }

  #[instrument(skip(self, payload))]
  pub async fn register_user(
    &self,
    payload: &RegistrationPayload
  ) -> anyhow::Result<()> {
    let url = format!(
      "{}/auth/register/",
      self.base_url
    );
    self
      .send(
        self.json_request(
          self.client.post(url.as_str()),
          payload
        )?,
        "Registration failed. Please \
         try again."
      )
      .await?;
    info!("user registered");
    Ok(())
  }

  #[instrument(skip(self, payload))]
  pub async fn update_user(
    &self,
    id: u64,
    payload: &UserUpdatePayload
  ) -> anyhow::Result<()> {
    let url =
      format!("{}{id}/", self.users_url());
    self
      .send(
        self.json_request(
          self.client.put(url.as_str()),
          payload
        )?,
        "Update failed. Please try \
         again."
      )
      .await?;
    info!("user updated");
    Ok(())
  }

  #[instrument(skip(self))]
  pub async fn delete_user(
    &self,
    id: u64
  ) -> anyhow::Result<()> {
    let url =
      format!("{}{id}/", self.users_url());
    self
      .send(
        self.client.delete(url.as_str()),
        "Failed to delete user"
      )
      .await?;
    info!("user deleted");
    Ok(())
  }

  fn json_request<T: Serialize>(
    &self,
    request: reqwest::RequestBuilder,
    payload: &T
  ) -> anyhow::Result<reqwest::RequestBuilder>
  {
    let body =
      serde_json::to_string(payload)
        .context(
          "failed encoding request \
           payload"
        )?;
    Ok(
      request
        .header(
          reqwest::header::CONTENT_TYPE,
          "application/json"
        )
        .body(body)
    )
  }

  async fn send(
    &self,
    request: reqwest::RequestBuilder,
    failure: &str
  ) -> anyhow::Result<String> {
    let response =
      request.send().await.with_context(
        || {
          format!(
            "{failure}: request to {} \
             failed",
            self.base_url
          )
        }
      )?;

    let status = response.status();
    let body =
      response.text().await.with_context(
        || {
          format!(
            "{failure}: failed reading \
             response body"
          )
        }
      )?;

    if status.is_success() {
      debug!(
        status = %status,
        bytes = body.len(),
        "api request succeeded"
      );
      return Ok(body);
    }

    let message =
      rejection_message(&body, failure);
    warn!(
      status = %status,
      error = %message,
      "api request rejected"
    );
    Err(anyhow!(
      "{message} (HTTP {status})"
    ))
  }
}

/// Message for a rejected request. Field
/// errors come first (the registration
/// endpoints key them by field, possibly
/// as lists), then `error`, then
/// `detail`; anything else falls back to
/// `failure`.
#[must_use]
pub fn rejection_message(
  body: &str,
  failure: &str
) -> String {
  const KEYS: [&str; 6] = [
    "full_name",
    "login_email",
    "password",
    "confirm_password",
    "error",
    "detail"
  ];

  let Ok(serde_json::Value::Object(map)) =
    serde_json::from_str(body)
  else {
    return failure.to_string();
  };

  KEYS
    .iter()
    .filter_map(|key| map.get(*key))
    .find_map(|value| match value {
      | serde_json::Value::String(text)
        if !text.is_empty() =>
      {
        Some(text.clone())
      }
      | serde_json::Value::Array(items) => {
        items
          .first()
          .and_then(|first| first.as_str())
          .map(str::to_string)
      }
      | _ => None
    })
    .unwrap_or_else(|| failure.to_string())
}

/// The users endpoint answers with
/// `{"users": [...]}`; a bare array is
/// accepted too.
pub fn parse_users(
  body: &str
) -> serde_json::Result<Vec<User>> {
  if body.trim_start().starts_with('[') {
    serde_json::from_str(body)
  } else {
    serde_json::from_str::<UsersEnvelope>(
      body
    )
    .map(|envelope| envelope.users)
  }
}

/// Where bookings and calendar
/// metadata come from.
#[derive(Debug, Clone)]
pub enum Source {
  Api(ApiClient),
  Files {
    bookings: PathBuf,
    calendar: Option<PathBuf>
  }
}

impl Source {
  #[instrument(skip(self))]
  pub fn load_bookings(
    &self,
    filter: Option<CreatorFilter>
  ) -> anyhow::Result<Vec<Booking>> {
    match self {
      | Source::Api(client) => {
        block_on(
          client.list_bookings(filter)
        )?
      }
      | Source::Files {
        bookings,
        ..
      } => {
        if filter.is_some() {
          warn!(
            "creator filter ignored \
             for snapshot files"
          );
        }
        load_bookings_file(bookings)
      }
    }
  }

  #[instrument(skip(self))]
  pub fn load_calendar(
    &self,
    year: i32,
    month: u32
  ) -> anyhow::Result<SecondaryCalendar>
  {
    match self {
      | Source::Api(client) => {
        block_on(
          client
            .calendar_month(year, month)
        )?
      }
      | Source::Files {
        calendar: Some(path),
        ..
      } => load_calendar_file(path),
      | Source::Files {
        calendar: None,
        ..
      } => {
        debug!(
          "no calendar snapshot; \
           secondary labels disabled"
        );
        Ok(SecondaryCalendar::default())
      }
    }
  }

  pub fn api(
    &self
  ) -> anyhow::Result<&ApiClient> {
    match self {
      | Source::Api(client) => {
        Ok(client)
      }
      | Source::Files {
        ..
      } => {
        Err(anyhow!(
          "this command needs the API; \
           drop --bookings to use \
           api.url"
        ))
      }
    }
  }
}

/// Drives one API future to
/// completion on a fresh
/// current-thread runtime.
pub fn block_on<F>(
  future: F
) -> anyhow::Result<F::Output>
where
  F: Future
{
  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed building async runtime"
      )?;
  Ok(runtime.block_on(future))
}

#[instrument]
pub fn load_bookings_file(
  path: &Path
) -> anyhow::Result<Vec<Booking>> {
  let text = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read {}",
        path.display()
      )
    })?;

  // Accept either the endpoint body
  // or a bare array.
  let bookings = if text
    .trim_start()
    .starts_with('[')
  {
    serde_json::from_str::<Vec<Booking>>(
      &text
    )
  } else {
    serde_json::from_str::<
      BookingsEnvelope
    >(&text)
    .map(|envelope| envelope.bookings)
  }
  .with_context(|| {
    format!(
      "failed to parse bookings in {}",
      path.display()
    )
  })?;

  info!(
    file = %path.display(),
    count = bookings.len(),
    "loaded booking snapshot"
  );
  Ok(bookings)
}

#[instrument]
pub fn load_calendar_file(
  path: &Path
) -> anyhow::Result<SecondaryCalendar> {
  let text = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read {}",
        path.display()
      )
    })?;
  let envelope: CalendarMonthEnvelope =
    serde_json::from_str(&text)
      .with_context(|| {
        format!(
          "failed to parse calendar \
           data in {}",
          path.display()
        )
      })?;
  Ok(SecondaryCalendar::from_envelope(
    envelope
  ))
}

#[cfg(test)]
mod tests {
  use super::{
    ApiClient,
    CreatorFilter,
    parse_users,
    rejection_message
  };

  #[test]
  fn parses_creator_filters() {
    assert_eq!(
      "user_4"
        .parse::<CreatorFilter>()
        .expect("admin filter"),
      CreatorFilter::Admin(4)
    );
    assert_eq!(
      "custom_12"
        .parse::<CreatorFilter>()
        .expect("custom filter"),
      CreatorFilter::Custom(12)
    );
    assert!(
      "staff_1"
        .parse::<CreatorFilter>()
        .is_err()
    );
    assert!(
      "user_x"
        .parse::<CreatorFilter>()
        .is_err()
    );
    assert_eq!(
      CreatorFilter::Custom(3)
        .to_string(),
      "custom_3"
    );
  }

  #[test]
  fn builds_endpoint_urls() {
    let client = ApiClient::new(
      "http://localhost:8000/"
    )
    .expect("client");
    assert_eq!(
      client.bookings_url(None),
      "http://localhost:8000/api/bookings/"
    );
    assert_eq!(
      client.bookings_url(Some(
        CreatorFilter::Admin(2)
      )),
      "http://localhost:8000/api/bookings/?created_by=user_2"
    );
    assert_eq!(
      client.calendar_url(2025, 6),
      "http://localhost:8000/api/calendar-data/?year=2025&month=6"
    );
    assert!(ApiClient::new("  ").is_err());
  }

  #[test]
  fn rejection_uses_error_field() {
    assert_eq!(
      rejection_message(
        r#"{"error": "Maximum 2 bookings per day"}"#,
        "Failed to create booking"
      ),
      "Maximum 2 bookings per day"
    );
  }

  #[test]
  fn rejection_falls_back_on_non_json() {
    assert_eq!(
      rejection_message(
        "<html>502 Bad Gateway</html>",
        "Failed to create booking"
      ),
      "Failed to create booking"
    );
    assert_eq!(
      rejection_message(
        r#"{"success": false}"#,
        "Failed to delete user"
      ),
      "Failed to delete user"
    );
  }

  #[test]
  fn rejection_prefers_field_errors() {
    assert_eq!(
      rejection_message(
        r#"{"password": ["Password must be at least 6 characters"],
            "error": "generic"}"#,
        "Registration failed"
      ),
      "Password must be at least 6 characters"
    );
    assert_eq!(
      rejection_message(
        r#"{"login_email": "Email already registered"}"#,
        "Registration failed"
      ),
      "Email already registered"
    );
    assert_eq!(
      rejection_message(
        r#"{"detail": "Not found."}"#,
        "Failed"
      ),
      "Not found."
    );
  }

  #[test]
  fn parses_user_lists() {
    let users = parse_users(
      r#"{"users": [{"id": 2, "full_name": "Gita",
          "login_email": "g@x", "created_at": null}], "count": 1}"#
    )
    .expect("envelope");
    assert_eq!(users[0].id, 2);

    let users = parse_users(
      r#"[{"id": 5, "full_name": "Hari"}]"#
    )
    .expect("bare array");
    assert_eq!(users[0].full_name, "Hari");

    let client = ApiClient::new(
      "http://localhost:8000"
    )
    .expect("client");
    assert_eq!(
      client.users_url(),
      "http://localhost:8000/auth/api/users/"
    );
  }
}
