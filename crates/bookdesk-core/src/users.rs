//! Staff accounts that can create bookings. Their ids are what the
//! `custom_<id>` creator filter refers to.

use serde::{Deserialize, Serialize};

use crate::api::CreatorFilter;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("All fields are required")]
    MissingFields(Vec<&'static str>),
    #[error("Full name and email are required")]
    MissingIdentity,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub full_name: String,
    #[serde(default)]
    pub login_email: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl User {
    /// Filter value that narrows the booking list to this user's bookings.
    pub fn creator_filter(&self) -> CreatorFilter {
        CreatorFilter::Custom(self.id)
    }

    pub fn creator_label(&self) -> &str {
        self.created_by
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("System")
    }
}

/// Body of the "list users" endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersEnvelope {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub full_name: String,
    pub login_email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationPayload {
    pub full_name: String,
    pub login_email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationDraft {
    pub fn set_field(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "name" | "full_name" => &mut self.full_name,
            "email" | "login_email" => &mut self.login_email,
            "password" => &mut self.password,
            "confirm" | "confirm_password" => &mut self.confirm_password,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }

    /// Same order as the registration screen: presence, length, match.
    pub fn validate(&self) -> Result<RegistrationPayload, RegistrationError> {
        let full_name = self.full_name.trim();
        let login_email = self.login_email.trim();
        let password = self.password.trim();
        let confirm_password = self.confirm_password.trim();

        let missing: Vec<&'static str> = [
            ("full_name", full_name),
            ("login_email", login_email),
            ("password", password),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(RegistrationError::MissingFields(missing));
        }

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(RegistrationError::PasswordTooShort);
        }
        if password != confirm_password {
            return Err(RegistrationError::PasswordMismatch);
        }

        Ok(RegistrationPayload {
            full_name: full_name.to_string(),
            login_email: login_email.to_string(),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        })
    }
}

/// Edit form for an existing user. A blank password keeps the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserEditDraft {
    pub full_name: String,
    pub login_email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserUpdatePayload {
    pub full_name: String,
    pub login_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserEditDraft {
    pub fn from_user(user: &User) -> Self {
        Self {
            full_name: user.full_name.clone(),
            login_email: user.login_email.clone(),
            password: String::new(),
        }
    }

    pub fn set_field(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "name" | "full_name" => &mut self.full_name,
            "email" | "login_email" => &mut self.login_email,
            "password" => &mut self.password,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }

    pub fn validate(&self) -> Result<UserUpdatePayload, RegistrationError> {
        let full_name = self.full_name.trim();
        let login_email = self.login_email.trim();
        if full_name.is_empty() || login_email.is_empty() {
            return Err(RegistrationError::MissingIdentity);
        }

        let password = self.password.trim();
        if !password.is_empty() && password.chars().count() < MIN_PASSWORD_LEN {
            return Err(RegistrationError::PasswordTooShort);
        }

        Ok(UserUpdatePayload {
            full_name: full_name.to_string(),
            login_email: login_email.to_string(),
            password: (!password.is_empty()).then(|| password.to_string()),
        })
    }
}
