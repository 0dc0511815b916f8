use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::ValidationErrors;

use crate::auth::jwt::TokenError;
use crate::users::repo::RepoError;

/// One failed validation rule, reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub rule: String,
    pub value: String,
}

impl FieldViolation {
    pub fn new(field: &str, rule: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            rule: rule.to_string(),
            value: value.to_string(),
        }
    }
}

/// Uniform error body: `code` mirrors the HTTP status line.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request data ({} violations)", .0.len())]
    Validation(Vec<FieldViolation>),

    #[error("malformed request body: {0}")]
    BadBody(#[from] JsonRejection),

    #[error("unauthorized")]
    Unauthorized,

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadBody(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds a validation error with field details ordered as `fields`.
    pub fn from_validation(errors: &ValidationErrors, fields: &[&str]) -> Self {
        AppError::Validation(ordered_violations(errors, fields))
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => AppError::NotFound,
            RepoError::Storage(e) => AppError::Internal(e.into()),
            RepoError::Other(e) => AppError::Internal(e),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid(_) => AppError::Unauthorized,
            other => AppError::Internal(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, details) = match self {
            AppError::Validation(violations) => {
                info!(violations = violations.len(), "request validation failed");
                let details = (!violations.is_empty()).then_some(violations);
                ("Invalid body", details)
            }
            AppError::BadBody(e) => {
                warn!(error = %e, "request body rejected");
                ("Error decoding body", None)
            }
            AppError::Unauthorized => ("Unauthorized", None),
            AppError::NotFound => ("User not found", None),
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                ("Internal server error", None)
            }
        };

        let body = ErrorBody {
            code: status.as_u16(),
            message: message.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

/// Flattens `validator` output into declaration order, one entry per field. `validator` keys its errors by field in a hash
/// map, so the order has to come from the caller.
pub fn ordered_violations(errors: &ValidationErrors, fields: &[&str]) -> Vec<FieldViolation> {
    let by_field = errors.field_errors();
    let mut out = Vec::new();
    for field in fields {
        let Some(list) = by_field.get(*field) else {
            continue;
        };
        // `required` outranks whatever else an empty value tripped
        let first = list
            .iter()
            .find(|e| e.code == "required")
            .or_else(|| list.first());
        if let Some(err) = first {
            let rule = err.code.as_ref();
            out.push(FieldViolation {
                field: capitalize(field),
                rule: rule.to_string(),
                value: match err.params.get(rule) {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(serde_json::Value::Null) | None => String::new(),
                    Some(v) => v.to_string(),
                },
            });
        }
    }
    out
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
