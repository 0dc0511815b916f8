use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{ListQuery, TokenRequest, TokenResponse, UserRequest, UserResponse, UsersList};
use crate::{auth::extractors::AuthUser, error::AppResult, extract::ApiJson, state::AppState};

pub fn token_routes() -> Router<AppState> {
    Router::new().route("/token", post(issue_token))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, body))]
pub async fn issue_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let res = state.users.authenticate(body, &state.tokens).await?;
    Ok(Json(res))
}

#[instrument(skip(state, caller_id, body), fields(caller = %caller_id))]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(caller_id): AuthUser,
    ApiJson(body): ApiJson<UserRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state.users.register(body).await?;
    Ok(Json(user))
}

#[instrument(skip(state, caller_id), fields(caller = %caller_id))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller_id): AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<UsersList>> {
    let list = state.users.list(&query).await?;
    Ok(Json(list))
}

#[instrument(skip(state, caller_id), fields(caller = %caller_id))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = state.users.get_by_id(&id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, caller_id, body), fields(caller = %caller_id))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller_id): AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UserRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state.users.update(&id, body).await?;
    Ok(Json(user))
}

#[instrument(skip(state, caller_id), fields(caller = %caller_id))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.users.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
