use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

pub fn router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/health", get(health))
}

/// Liveness only; does not touch the database.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
