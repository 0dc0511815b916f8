use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub firstname: String,
    pub lastname: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing)]
    pub deleted_at: Option<OffsetDateTime>, // soft-delete marker
}

impl User {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Full replacement of the mutable columns of a user.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub email: String,
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub updated_at: OffsetDateTime,
}

/// Columns a listing may be ordered by.
pub const SORTABLE_COLUMNS: &[&str] = &[
    "id",
    "email",
    "firstname",
    "lastname",
    "created_at",
    "updated_at",
];
