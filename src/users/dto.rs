use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::repo_types::User;

/// Rejects empty (or whitespace-only) strings with the `required` rule.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct TokenRequest {
    #[validate(custom(function = "not_blank"), email(code = "email"))]
    pub email: String,
    #[validate(custom(function = "not_blank"), length(min = 8, code = "min"))]
    pub password: String,
}

impl TokenRequest {
    pub const FIELDS: &'static [&'static str] = &["email", "password"];

    /// Emails are compared case-insensitively and without surrounding blanks.
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

/// Body of both create and update: every field is replaced.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UserRequest {
    #[validate(custom(function = "not_blank"), email(code = "email"))]
    pub email: String,
    #[validate(custom(function = "not_blank"), length(min = 8, code = "min"))]
    pub password: String,
    #[validate(custom(function = "not_blank"))]
    pub lastname: String,
    #[validate(custom(function = "not_blank"))]
    pub firstname: String,
}

impl UserRequest {
    pub const FIELDS: &'static [&'static str] = &["email", "password", "lastname", "firstname"];

    /// Passwords are kept byte for byte; everything else is trimmed.
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self.lastname = self.lastname.trim().to_string();
        self.firstname = self.firstname.trim().to_string();
        self
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub p: Option<String>,
    pub l: Option<String>,
    pub s: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_token_expires_at: OffsetDateTime,
}

/// Public view of a user; the password hash never leaves the service.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub lastname: String,
    pub firstname: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            lastname: u.lastname,
            firstname: u.firstname,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsersList {
    pub data: Vec<UserResponse>,
    pub total: i64,
}
