//! JSON error bodies for the control plane.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sentinel_core::SentinelError;
use serde_json::json;

/// A [`SentinelError`] leaving through HTTP as `{"error": ..., "code": ...}`.
#[derive(Debug)]
pub struct ApiError(pub SentinelError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            SentinelError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SentinelError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SentinelError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SentinelError::UnknownTenant(_) => StatusCode::NOT_FOUND,
            SentinelError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<SentinelError> for ApiError {
    fn from(e: SentinelError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({"error": self.0.to_string(), "code": self.0.code()});
        (self.status(), Json(body)).into_response()
    }
}
