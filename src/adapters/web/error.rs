//! HTTP error responses for the web adapter.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::domain::error::TickerError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &TickerError) -> StatusCode {
    match err {
        TickerError::NotFound { .. } => StatusCode::NOT_FOUND,
        TickerError::InsufficientOverlap { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TickerError::InvalidRange { .. } | TickerError::InvalidSymbol { .. } => {
            StatusCode::BAD_REQUEST
        }
        TickerError::Database { .. }
        | TickerError::DatabaseQuery { .. }
        | TickerError::ConfigParse { .. }
        | TickerError::ConfigMissing { .. }
        | TickerError::ConfigInvalid { .. }
        | TickerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<TickerError> for WebError {
    fn from(err: TickerError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            error!(error = %err, "request failed");
            // infrastructure details stay in the log
            return Self::internal("internal server error");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}
