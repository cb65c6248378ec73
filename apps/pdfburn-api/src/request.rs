//! Multipart request parsing
//!
//! Turns a `multipart/form-data` body into a [`BurnRequest`]:
//! - `pdf`: the base document, exactly once
//! - `overlays`: any number of `overlay_<index>.png` files
//! - `keep`: optional JSON array of page indices

use axum::extract::Multipart;
use pdfburn_core::{BurnRequest, KeepSet, OverlaySet};
use tracing::debug;

use crate::error::ApiError;

pub const PDF_FIELD: &str = "pdf";
pub const OVERLAYS_FIELD: &str = "overlays";
pub const KEEP_FIELD: &str = "keep";

pub async fn read_burn_request(mut multipart: Multipart) -> Result<BurnRequest, ApiError> {
    let mut pdf: Option<Vec<u8>> = None;
    let mut keep: Option<String> = None;
    let mut overlays = OverlaySet::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            PDF_FIELD => {
                let bytes = field.bytes().await.map_err(malformed)?;
                if pdf.replace(bytes.to_vec()).is_some() {
                    return Err(ApiError::InvalidRequest(
                        "Expected a single 'pdf' part".to_string(),
                    ));
                }
            }
            OVERLAYS_FIELD => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                if !overlays.insert_named(&filename, bytes.to_vec()) {
                    debug!(filename, "ignoring overlay with unrecognized filename");
                }
            }
            KEEP_FIELD => {
                keep = Some(field.text().await.map_err(malformed)?);
            }
            other => {
                debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let pdf = pdf.ok_or_else(|| ApiError::InvalidRequest("Missing 'pdf' part".to_string()))?;
    let keep = KeepSet::parse_optional(keep.as_deref())?;

    debug!(
        pdf_bytes = pdf.len(),
        keep = ?keep,
        overlays = ?overlays.indices().collect::<Vec<_>>(),
        "parsed burn request"
    );

    Ok(BurnRequest {
        pdf,
        keep,
        overlays,
    })
}

fn malformed(err: impl std::fmt::Display) -> ApiError {
    ApiError::InvalidRequest(format!("Malformed multipart body: {}", err))
}
