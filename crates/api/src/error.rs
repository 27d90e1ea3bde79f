use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use notehub_core::{CoreError, StoreError};
use serde_json::json;

/// API error type rendered as `{"error": {type, message, statusCode}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    SelfShare(String),

    #[error("{0}")]
    OwnerProtected(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(_) | CoreError::InvalidEmail(_) => {
                ApiError::BadRequest(err.to_string())
            }
            CoreError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            CoreError::Forbidden(reason) => ApiError::Forbidden(reason.to_string()),
            CoreError::SelfShare => ApiError::SelfShare(err.to_string()),
            CoreError::OwnerProtected => ApiError::OwnerProtected(err.to_string()),
            CoreError::InvalidCredential(_) => ApiError::Unauthorized,
            CoreError::Store(StoreError::Conflict(msg)) => ApiError::Conflict(msg),
            CoreError::Store(other) => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::SelfShare(msg) => (StatusCode::BAD_REQUEST, "selfShare", msg.clone()),
            ApiError::OwnerProtected(msg) => {
                (StatusCode::FORBIDDEN, "ownerProtected", msg.clone())
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
