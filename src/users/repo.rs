use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::pagination::PageRequest;
use super::repo_types::{User, UserChanges};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Other(anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// User persistence. Every read, update and delete ignores soft-deleted rows.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new user. A duplicate email is a storage error.
    async fn create(&self, user: &User) -> RepoResult<()>;

    async fn get_by_id(&self, id: Uuid) -> RepoResult<User>;

    /// Includes the password hash, for credential checks.
    async fn get_by_email(&self, email: &str) -> RepoResult<User>;

    /// One page of active users, ordered by the page's sortable columns.
    async fn list(&self, page: &PageRequest) -> RepoResult<Vec<User>>;

    /// Number of active users, under the same filter as `list`.
    async fn count_active(&self) -> RepoResult<i64>;

    /// A page plus the active total, read from one snapshot so a concurrent
    /// write cannot make the two disagree. The default reads them separately.
    async fn list_with_total(&self, page: &PageRequest) -> RepoResult<(Vec<User>, i64)> {
        let users = self.list(page).await?;
        let total = self.count_active().await?;
        Ok((users, total))
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> RepoResult<()>;

    /// Marks the user deleted. Deleting an already deleted user is `NotFound`.
    async fn soft_delete(&self, id: Uuid, at: OffsetDateTime) -> RepoResult<()>;
}
