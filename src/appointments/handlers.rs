use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::appointments::dto::{AppointmentRequest, AppointmentResponse};
use crate::appointments::services;
use crate::auth::jwt::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments))
        .route("/appointments/:id", get(get_appointment))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(create_appointment))
        .route(
            "/appointments/:id",
            put(update_appointment).delete(cancel_appointment),
        )
        .route("/appointments/:id/complete", post(complete_appointment))
}

#[instrument(skip(state, payload))]
pub async fn create_appointment(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(payload): Json<AppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let view = services::create_appointment(&state.db, &payload, caller).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
pub async fn list_appointments(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<Vec<AppointmentResponse>>, ApiError> {
    let views = services::get_appointments(&state.db, caller).await?;
    Ok(Json(views))
}

#[instrument(skip(state))]
pub async fn get_appointment(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let view = services::get_appointment_by_id(&state.db, id, caller).await?;
    Ok(Json(view))
}

#[instrument(skip(state, payload))]
pub async fn update_appointment(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AppointmentRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let view = services::update_appointment(&state.db, id, &payload, caller).await?;
    Ok(Json(view))
}

#[instrument(skip(state))]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let view = services::cancel_appointment(&state.db, id, caller).await?;
    Ok(Json(view))
}

#[instrument(skip(state))]
pub async fn complete_appointment(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let view = services::complete_appointment(&state.db, id, caller).await?;
    Ok(Json(view))
}
