use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::errors::{CoreError, CoreErrorKind};

/// JSON error response wrapping a [`CoreError`].
#[derive(Debug)]
pub struct ApiError(pub CoreError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

pub fn status_for(kind: CoreErrorKind) -> StatusCode {
    match kind {
        CoreErrorKind::NotFound => StatusCode::NOT_FOUND,
        CoreErrorKind::InvalidState | CoreErrorKind::ConstraintViolation => StatusCode::CONFLICT,
        CoreErrorKind::Validation => StatusCode::BAD_REQUEST,
        CoreErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn kind_code(kind: CoreErrorKind) -> &'static str {
    match kind {
        CoreErrorKind::NotFound => "not_found",
        CoreErrorKind::InvalidState => "invalid_state",
        CoreErrorKind::Validation => "validation_failed",
        CoreErrorKind::ConstraintViolation => "constraint_violation",
        CoreErrorKind::Internal => "internal_error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let body = json!({
            "error": self.0.message(),
            "kind": kind_code(kind),
            "fields": self.0.fields(),
        });

        (status, Json(body)).into_response()
    }
}
