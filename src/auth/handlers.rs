use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::auth::dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest};
use crate::auth::jwt::{CurrentUser, JwtKeys};
use crate::auth::repo::User;
use crate::auth::services::{self, is_valid_email};
use crate::error::ApiError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn token_pair(keys: &JwtKeys, user: &User) -> Result<AuthResponse, ApiError> {
    let access_token = keys.sign_access(user.id, user.role)?;
    let refresh_token = keys.sign_refresh(user.id, user.role)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        },
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.username = payload.username.trim().to_lowercase();

    if !is_valid_email(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err(ApiError::Validation("Username must be a valid email".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation("Password is required".into()));
    }

    let user = services::register(&state.db, &payload.username, &payload.password, payload.role)
        .await?;

    let keys = JwtKeys::from_ref(&state);
    Ok((StatusCode::CREATED, Json(token_pair(&keys, &user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.username = payload.username.trim().to_lowercase();

    let user = services::login(&state.db, &payload.username, &payload.password).await?;

    let keys = JwtKeys::from_ref(&state);
    Ok(Json(token_pair(&keys, &user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthenticated(e.to_string()))?;

    // Re-read the user so the new pair carries the current role.
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("User no longer exists".into()))?;

    Ok(Json(token_pair(&keys, &user)?))
}

/// Tokens are stateless; logout acknowledges and the client discards its pair.
#[instrument(skip(_caller))]
pub async fn logout(_caller: CurrentUser) -> Json<Value> {
    Json(json!({ "message": "Logged out successfully" }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, caller.id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("User no longer exists".into()))?;

    Ok(Json(PublicUser {
        id: user.id,
        username: user.username,
        role: user.role,
    }))
}
