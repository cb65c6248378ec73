//! PDF page pruning and overlay burning
//!
//! Takes an uploaded PDF, drops the pages the caller did not keep, paints
//! full-page raster overlays onto the survivors and re-encodes the result.
//!
//! The pipeline is strictly linear: parse, prune, composite, serialize.
//! Overlay ordinals refer to the document *after* pruning.

pub mod composite;
pub mod document;
pub mod error;
pub mod image;
pub mod keep;
pub mod overlay;
pub mod prune;
pub mod serialize;

#[cfg(test)]
mod test_support;

use serde::Serialize;
use std::time::Instant;
use tracing::debug;

pub use composite::composite_overlays;
pub use document::{BurnDocument, PageBox};
pub use error::BurnError;
pub use keep::KeepSet;
pub use overlay::{overlay_index, OverlaySet};
pub use prune::prune_pages;
pub use serialize::{save_document, OUTPUT_FILENAME};

/// Everything needed for one burn
#[derive(Debug, Clone, Default)]
pub struct BurnRequest {
    pub pdf: Vec<u8>,
    /// `None` keeps every page
    pub keep: Option<KeepSet>,
    pub overlays: OverlaySet,
}

#[derive(Debug, Clone)]
pub struct BurnOutput {
    pub bytes: Vec<u8>,
    pub filename: &'static str,
    pub metrics: BurnMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct BurnMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub input_page_count: u32,
    pub output_page_count: u32,
    pub overlays_received: usize,
    pub overlays_applied: usize,
    pub processing_time_ms: u64,
}

/// Run the whole pipeline; any stage failure aborts the rest
pub fn burn(request: &BurnRequest) -> Result<BurnOutput, BurnError> {
    let started = Instant::now();

    let mut doc = BurnDocument::load(&request.pdf)?;
    let input_page_count = doc.page_count();

    prune_pages(&mut doc, request.keep.as_ref());
    let overlays_applied = composite_overlays(&mut doc, &request.overlays)?;
    let output_page_count = doc.page_count();

    let bytes = save_document(doc)?;

    let metrics = BurnMetrics {
        input_size_bytes: request.pdf.len(),
        output_size_bytes: bytes.len(),
        input_page_count,
        output_page_count,
        overlays_received: request.overlays.len(),
        overlays_applied,
        processing_time_ms: started.elapsed().as_millis() as u64,
    };
    debug!(?metrics, "burn complete");

    Ok(BurnOutput {
        bytes,
        filename: OUTPUT_FILENAME,
        metrics,
    })
}
