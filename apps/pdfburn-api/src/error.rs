//! Error types for the burn service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfburn_core::BurnError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Burn(#[from] BurnError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// Clients only ever see a 500 with the message; the variant is for logs.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = match &self {
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Burn(_) => "burn",
            ApiError::Internal(_) => "internal",
        };
        let message = self.to_string();
        error!(kind, error = %message, "request failed");

        let body = ErrorResponse { error: message };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
