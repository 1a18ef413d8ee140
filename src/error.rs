use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Every failure the service layer can surface. Each kind maps to one HTTP
/// status; nothing is retried or recovered internally.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("username already exists: {0}")]
    DuplicateUsername(String),
    #[error("user not found")]
    UserNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidReference(String),
    #[error("appointment time must be in the future")]
    InvalidTime,
    #[error("{0}")]
    SchedulingConflict(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("appointment not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::DuplicateUsername(_) => "DUPLICATE_USERNAME",
            ApiError::UserNotFound => "USER_NOT_FOUND",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::InvalidReference(_) => "INVALID_REFERENCE",
            ApiError::InvalidTime => "INVALID_TIME",
            ApiError::SchedulingConflict(_) => "SCHEDULING_CONFLICT",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_FAILED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::DuplicateUsername(_) => StatusCode::CONFLICT,
            ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidReference(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidTime => StatusCode::BAD_REQUEST,
            ApiError::SchedulingConflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidState(_) => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_unauthorized() {
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Unauthenticated("no token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn conflict_and_state_failures_are_client_errors() {
        for e in [
            ApiError::SchedulingConflict("busy".into()),
            ApiError::InvalidState("cancelled".into()),
            ApiError::DuplicateUsername("a@x.com".into()),
        ] {
            assert!(e.status().is_client_error());
        }
    }

    #[test]
    fn kinds_are_distinct_for_every_variant() {
        let kinds = [
            ApiError::DuplicateUsername("u".into()).kind(),
            ApiError::UserNotFound.kind(),
            ApiError::InvalidCredentials.kind(),
            ApiError::Unauthenticated("m".into()).kind(),
            ApiError::Forbidden("m".into()).kind(),
            ApiError::InvalidReference("m".into()).kind(),
            ApiError::InvalidTime.kind(),
            ApiError::SchedulingConflict("m".into()).kind(),
            ApiError::InvalidState("m".into()).kind(),
            ApiError::NotFound.kind(),
        ];
        let mut unique: Vec<&str> = kinds.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), kinds.len());
    }
}
