//! Document validation: byte-size and page-count limits.
//!
//! Validation is independent of the converter run and may execute
//! concurrently with it — the pipeline joins both before anything leaves
//! the working directory, so an invalid document never reaches storage.
//!
//! Page counting parses the PDF with `lopdf` rather than asking the
//! converter, so a corrupt document fails validation even if the converter
//! happens to cope with it.

use crate::config::RasterizerConfig;
use crate::error::PipelineError;
use std::sync::Arc;
use tracing::debug;

/// Validate `document` against the configured size and page-count limits.
///
/// The lopdf parse is CPU-bound on large documents, so it runs on the
/// blocking pool.
pub async fn validate_document(
    document: Arc<Vec<u8>>,
    config: &RasterizerConfig,
) -> Result<(), PipelineError> {
    let size = document.len() as u64;
    if size > config.max_document_bytes {
        return Err(PipelineError::DocumentTooLarge {
            size_mb: size as f64 / (1024.0 * 1024.0),
            limit_mb: config.max_document_bytes / (1024 * 1024),
        });
    }

    let max_pages = config.max_pages;
    let pages = tokio::task::spawn_blocking(move || count_pages(&document))
        .await
        .map_err(|e| PipelineError::Internal(format!("validation task panicked: {e}")))??;

    debug!("document validated: {} bytes, {} pages", size, pages);

    if pages > max_pages {
        return Err(PipelineError::DocumentTooLong {
            pages,
            limit: max_pages,
        });
    }

    Ok(())
}

fn count_pages(document: &[u8]) -> Result<usize, PipelineError> {
    let doc = lopdf::Document::load_mem(document).map_err(|e| PipelineError::InvalidDocument {
        detail: e.to_string(),
    })?;
    Ok(doc.get_pages().len())
}
