use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::claims::Claims;
use crate::error::AppError;

/// Id of the caller, taken from the claims the bearer middleware verified.
/// Only usable behind that middleware; elsewhere it rejects with 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .map(|claims| AuthUser(claims.sub))
            .ok_or(AppError::Unauthorized)
    }
}
