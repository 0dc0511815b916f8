use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::instrument;

use crate::state::AppState;

pub fn doc_routes() -> Router<AppState> {
    Router::new().route("/doc/api-v1", get(api_doc))
}

pub fn debug_routes() -> Router<AppState> {
    Router::new().route("/debug/status", get(debug_status))
}

/// Machine-readable summary of the v1 API.
#[instrument]
pub async fn api_doc() -> Json<Value> {
    let user_body = json!({
        "email": "string (email)",
        "password": "string (min 8)",
        "lastname": "string",
        "firstname": "string"
    });
    Json(json!({
        "version": "v1",
        "base_path": "/api/v1",
        "auth": "Authorization: Bearer <access_token>",
        "endpoints": [
            {
                "method": "POST", "path": "/token", "auth": false,
                "body": { "email": "string (email)", "password": "string (min 8)" },
                "response": { "access_token": "string", "access_token_expires_at": "RFC3339" }
            },
            { "method": "POST", "path": "/users", "auth": true, "body": user_body.clone() },
            {
                "method": "GET", "path": "/users", "auth": true,
                "query": { "p": "page, from 1", "l": "page size", "s": "sort, e.g. +lastname,-created_at" },
                "response": { "data": "[user]", "total": "integer" }
            },
            { "method": "GET", "path": "/users/{id}", "auth": true },
            { "method": "PUT", "path": "/users/{id}", "auth": true, "body": user_body },
            { "method": "DELETE", "path": "/users/{id}", "auth": true, "status": 204 }
        ]
    }))
}

#[derive(Debug, Serialize)]
pub struct DebugStatus {
    pub version: &'static str,
    pub uptime_secs: u64,
    pub jwt_algorithm: String,
    pub token_lifetime_hours: i64,
    pub access_log: bool,
    pub max_page_limit: i64,
}

#[instrument(skip(state))]
pub async fn debug_status(State(state): State<AppState>) -> Json<DebugStatus> {
    Json(DebugStatus {
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        jwt_algorithm: format!("{:?}", state.tokens.algorithm()),
        token_lifetime_hours: state.tokens.lifetime_hours(),
        access_log: state.config.access_log,
        max_page_limit: state.config.max_page_limit,
    })
}
