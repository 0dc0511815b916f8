use axum::BoxError;
use tower::timeout::error::Elapsed;

use crate::error::AppError;

/// Error handler for the `tower` timeout stack. A request that ran out of
/// time answers with the regular 500 body, logged inside the request span.
pub async fn handle_timeout(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::Internal(anyhow::anyhow!("request timed out"))
    } else {
        AppError::Internal(anyhow::anyhow!("unhandled middleware error: {err}"))
    }
}
