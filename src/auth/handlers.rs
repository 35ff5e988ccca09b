use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{AuthResponse, LoginRequest, ProfileResponse, RefreshRequest, RegisterRequest},
    extractors::AuthUser,
    jwt::JwtKeys,
    services::{authenticate, issue_tokens, register_member},
};
use crate::{error::ApiError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/refresh", post(refresh))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/users/profile", get(get_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(payload) = payload?;
    let account = register_member(state.store.as_ref(), payload).await?;
    let keys = JwtKeys::from_ref(&state);
    Ok((StatusCode::CREATED, Json(issue_tokens(&keys, account)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload?;
    let account = authenticate(state.store.as_ref(), &payload.email, &payload.password).await?;
    info!(user_id = %account.id, email = %account.email, "user logged in");
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(issue_tokens(&keys, account)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    // Role is reloaded so a promotion or demotion takes effect on refresh.
    let account = state
        .store
        .find_by_id(claims.sub)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    Ok(Json(issue_tokens(&keys, account)?))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let account = state
        .store
        .find_by_id(user.id)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    Ok(Json(ProfileResponse { user: account }))
}
