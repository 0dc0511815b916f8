use std::sync::Arc;

use anyhow::Context;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::dto::{ListQuery, TokenRequest, TokenResponse, UserRequest, UserResponse, UsersList};
use super::pagination::PageRequest;
use super::repo::{RepoError, UserRepository};
use super::repo_types::{User, UserChanges};
use crate::auth::jwt::TokenService;
use crate::auth::password::{burn_verify, hash_password, verify_password};
use crate::error::{AppError, AppResult, FieldViolation};

/// User use cases. Owns validation, normalisation and hashing; storage is
/// behind [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    max_page_limit: i64,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, max_page_limit: i64) -> Self {
        Self {
            repo,
            max_page_limit,
        }
    }

    /// Exchanges credentials for a bearer token. Unknown email and wrong
    /// password both answer 401.
    pub async fn authenticate(
        &self,
        req: TokenRequest,
        tokens: &TokenService,
    ) -> AppResult<TokenResponse> {
        let req = req.normalized();
        validate(&req, TokenRequest::FIELDS)?;
        let email = req.email;

        let user = match self.repo.get_by_email(&email).await {
            Ok(u) => u,
            Err(RepoError::NotFound) => {
                let password = req.password;
                spawn_hashing(move || burn_verify(&password)).await?;
                warn!(email = %email, "login for unknown email");
                return Err(AppError::Unauthorized);
            }
            Err(e) => return Err(e.into()),
        };

        let password = req.password;
        let hash = user.password_hash.clone();
        let ok = spawn_hashing(move || verify_password(&password, &hash)).await?;
        if !ok {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(AppError::Unauthorized);
        }

        let issued = tokens.issue(user.id)?;
        info!(user_id = %user.id, "token issued");
        Ok(TokenResponse {
            access_token: issued.token,
            access_token_expires_at: issued.expires_at,
        })
    }

    /// Creates a user. A taken email fails in storage (500); there is no
    /// pre-check.
    pub async fn register(&self, req: UserRequest) -> AppResult<UserResponse> {
        let req = req.normalized();
        validate(&req, UserRequest::FIELDS)?;

        let password = req.password;
        let password_hash = spawn_hashing(move || hash_password(&password)).await??;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: req.email,
            password_hash,
            firstname: req.firstname,
            lastname: req.lastname,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.repo.create(&user).await?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user.into())
    }

    pub async fn get_by_id(&self, raw_id: &str) -> AppResult<UserResponse> {
        let id = parse_id(raw_id)?;
        let user = self.repo.get_by_id(id).await?;
        Ok(user.into())
    }

    /// One page plus the total; both calls share the active-user filter.
    pub async fn list(&self, query: &ListQuery) -> AppResult<UsersList> {
        let page = PageRequest::from_query(
            query.p.as_deref().unwrap_or_default(),
            query.l.as_deref().unwrap_or_default(),
            query.s.as_deref().unwrap_or_default(),
            self.max_page_limit,
        );
        debug!(offset = page.offset, limit = page.limit, sorts = page.sorts.len(), "listing users");

        let (users, total) = self.repo.list_with_total(&page).await?;
        Ok(UsersList {
            data: users.into_iter().map(UserResponse::from).collect(),
            total,
        })
    }

    /// Replaces every mutable field, then reads the row back.
    pub async fn update(&self, raw_id: &str, req: UserRequest) -> AppResult<UserResponse> {
        let id = parse_id(raw_id)?;
        let req = req.normalized();
        validate(&req, UserRequest::FIELDS)?;

        let password = req.password;
        let password_hash = spawn_hashing(move || hash_password(&password)).await??;
        let changes = UserChanges {
            email: req.email,
            password_hash,
            firstname: req.firstname,
            lastname: req.lastname,
            updated_at: OffsetDateTime::now_utc(),
        };
        self.repo.update(id, &changes).await?;

        info!(user_id = %id, "user updated");
        self.get_by_id(raw_id).await
    }

    pub async fn delete(&self, raw_id: &str) -> AppResult<()> {
        let id = parse_id(raw_id)?;
        self.repo.soft_delete(id, OffsetDateTime::now_utc()).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

fn validate<T: Validate>(req: &T, fields: &[&str]) -> AppResult<()> {
    req.validate()
        .map_err(|errors| AppError::from_validation(&errors, fields))
}

fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(vec![FieldViolation::new("ID", "uuid", "")]))
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn spawn_hashing<F, R>(f: F) -> AppResult<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let out = tokio::task::spawn_blocking(f)
        .await
        .context("password hashing task failed")?;
    Ok(out)
}
