//! Error responses in the `{statusCode, error, message}` shape HTTP clients
//! of this service expect.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("child \"{0}\" fails because [{0} is required]")]
    MissingHeader(&'static str),

    #[error("invalid request payload: {0}")]
    InvalidPayload(String),

    #[error("unknown log level: {0}")]
    InvalidLogLevel(String),

    #[error("log level could not be applied: {0}")]
    LogControl(String),

    #[error("Not Found")]
    NotFound,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingHeader(_) | Self::InvalidPayload(_) | Self::InvalidLogLevel(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::LogControl(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidPayload(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or_default();
        let body = match self {
            Self::NotFound => json!({ "statusCode": status.as_u16(), "error": reason }),
            other => json!({
                "statusCode": status.as_u16(),
                "error": reason,
                "message": other.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}
