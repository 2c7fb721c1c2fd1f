//! Page-image resize: uniform target height, proportional width.
//!
//! Source documents arrive in wildly mixed page sizes; resizing every page
//! to one fixed height gives the stored image set uniform geometry. Decoding
//! and resampling are CPU-bound, so each page runs on the blocking pool and
//! the batch joins before returning.
//!
//! The batch is atomic: one failing page fails the whole batch. Dropping a
//! single page instead would leave a partial image set in storage with a
//! hole in the page numbering.

use crate::error::PipelineError;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Resize every page to `target_height` px, preserving aspect ratio.
///
/// Pages are processed concurrently; output order matches input order.
pub async fn resize_pages(
    pages: Vec<Vec<u8>>,
    target_height: u32,
) -> Result<Vec<Vec<u8>>, PipelineError> {
    let tasks: Vec<_> = pages
        .into_iter()
        .enumerate()
        .map(|(i, bytes)| {
            tokio::task::spawn_blocking(move || resize_page(i + 1, &bytes, target_height))
        })
        .collect();

    // try_join_all preserves input order in its output.
    let joined = futures::future::try_join_all(tasks)
        .await
        .map_err(|e| PipelineError::Internal(format!("resize task panicked: {e}")))?;

    joined.into_iter().collect()
}

/// Resize one page and re-encode it as JPEG.
fn resize_page(page: usize, bytes: &[u8], target_height: u32) -> Result<Vec<u8>, PipelineError> {
    let img = image::load_from_memory(bytes).map_err(|e| PipelineError::PageProcessingFailed {
        page,
        detail: format!("decode: {e}"),
    })?;

    let scale = target_height as f64 / img.height() as f64;
    let new_width = ((img.width() as f64 * scale).round() as u32).max(1);
    let resized = img.resize_exact(new_width, target_height, FilterType::Lanczos3);

    debug!(
        "page {} resized {}x{} -> {}x{}",
        page,
        img.width(),
        img.height(),
        new_width,
        target_height
    );

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .map_err(|e| PipelineError::PageProcessingFailed {
            page,
            detail: format!("encode: {e}"),
        })?;

    Ok(buf)
}
