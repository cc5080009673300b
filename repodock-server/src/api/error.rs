//! API error handling
//!
//! Validation rejections become `400` with the message shown to the
//! operator; everything else is logged and reported as `500`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use repodock_core::{Error, ValidationError};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(ValidationError),
    Internal(Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(e) => ApiError::BadRequest(e),
            other => ApiError::Internal(other),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
