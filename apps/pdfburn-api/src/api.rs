//! API handlers for the burn service

use axum::{
    extract::{multipart::MultipartRejection, Multipart},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use pdfburn_core::burn;
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::request::read_burn_request;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Handler: GET /api/health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Handler: POST /api/burn
///
/// Returns the edited PDF as an attachment. The PDF work runs on the
/// blocking pool.
pub async fn handle_burn(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let request = read_burn_request(multipart).await?;

    let output = tokio::task::spawn_blocking(move || burn(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("Burn task failed: {}", e)))??;

    let metrics = serde_json::to_value(&output.metrics).unwrap_or_default();
    info!(%metrics, "burned document");

    let disposition = format!("attachment; filename=\"{}\"", output.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.bytes,
    )
        .into_response())
}
