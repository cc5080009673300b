//! Request body extraction for the admin form posts
//!
//! Admin forms post either JSON or urlencoded bodies. Both are accepted, an
//! empty body reads as an empty form, and a malformed body is reported as
//! `400` like any other invalid input.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use repodock_core::ValidationError;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

/// Form fields read from a JSON or urlencoded body
#[derive(Debug)]
pub struct AdminForm<T>(pub T);

impl<T, S> FromRequest<S> for AdminForm<T>
where
    T: DeserializeOwned + Default + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| invalid_body(e.body_text()))?;
            return Ok(Self(fields));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| invalid_body(e.body_text()))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }

        let Json(fields) = Json::<T>::from_bytes(&body).map_err(|e| invalid_body(e.body_text()))?;
        Ok(Self(fields))
    }
}

fn invalid_body(detail: String) -> ApiError {
    ApiError::BadRequest(ValidationError::InvalidInput(format!(
        "Invalid request body: {}",
        detail
    )))
}
