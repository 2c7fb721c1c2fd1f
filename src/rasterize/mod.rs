//! The ingest pipeline: uploaded PDF → ordered, resized page images.
//!
//! ## Data Flow
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Workdir   scoped temp directory, removed on every exit path
//!  ├─ 2. Convert   poppler writes one PNG per page   ┐ joined — both must
//!  ├─ 3. Validate  size + page-count limits (lopdf)  ┘ pass before step 4
//!  ├─ 4. Order     numeric sort on the filename page token
//!  ├─ 5. Resize    every page to the target height, batch-atomic
//!  └─ 6. Store     ordered upload, URI i ↔ page i+1   (ingest only)
//! ```
//!
//! ## Why a numeric sort?
//!
//! The converter does not zero-pad page numbers, so a lexical directory sort
//! puts `page-10.png` before `page-2.png`. The page token is extracted from
//! each filename and compared numerically; order here is the authoritative
//! page order for everything downstream.

pub mod convert;
pub mod resize;
pub mod validate;

use crate::config::RasterizerConfig;
use crate::error::PipelineError;
use crate::storage::ObjectStorage;
use convert::{PageConverter, PAGE_FILE_EXT, PAGE_FILE_PREFIX};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

static PAGE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// The ingest pipeline. One instance is shared across requests; each
/// `rasterize`/`ingest` call owns its working directory exclusively.
pub struct DocumentRasterizer {
    converter: Arc<dyn PageConverter>,
    storage: Arc<dyn ObjectStorage>,
    config: RasterizerConfig,
}

impl DocumentRasterizer {
    pub fn new(
        converter: Arc<dyn PageConverter>,
        storage: Arc<dyn ObjectStorage>,
        config: RasterizerConfig,
    ) -> Self {
        Self {
            converter,
            storage,
            config,
        }
    }

    /// Rasterize, resize, and upload; returns one URI per page, in page order.
    ///
    /// Nothing is uploaded unless every page rasterized and resized — a
    /// failure anywhere leaves storage untouched.
    pub async fn ingest(&self, document: Vec<u8>) -> Result<Vec<String>, PipelineError> {
        let pages = self.rasterize(document).await?;
        let urls = self.storage.store_pages(&pages, "image/jpeg").await?;
        info!("ingested document: {} page images stored", urls.len());
        Ok(urls)
    }

    /// Rasterize a PDF into resized page images, in page order.
    ///
    /// Element *i* of the output corresponds to page *i + 1* of the source.
    pub async fn rasterize(&self, document: Vec<u8>) -> Result<Vec<Vec<u8>>, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdf-img-");
        let workdir = match &self.config.workdir_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| PipelineError::Internal(format!("temp dir: {e}")))?;

        info!("temporary directory created: {}", workdir.path().display());

        let result = self.rasterize_in(workdir.path(), document).await;

        // Cleanup is unconditional. A cleanup failure is logged, never
        // propagated — it must not mask the pipeline's own result.
        let dir = workdir.path().to_path_buf();
        match workdir.close() {
            Ok(()) => debug!("temporary directory deleted: {}", dir.display()),
            Err(e) => warn!("failed to clean up temp dir {}: {}", dir.display(), e),
        }

        result
    }

    async fn rasterize_in(
        &self,
        workdir: &Path,
        document: Vec<u8>,
    ) -> Result<Vec<Vec<u8>>, PipelineError> {
        let document = Arc::new(document);
        let pdf_path = workdir.join("input.pdf");
        tokio::fs::write(&pdf_path, document.as_slice())
            .await
            .map_err(|e| PipelineError::Internal(format!("write temp pdf: {e}")))?;

        // Validation is independent of the converter run; both must pass.
        tokio::try_join!(
            self.converter.convert_pages(&pdf_path, workdir, self.config.dpi),
            validate::validate_document(Arc::clone(&document), &self.config),
        )?;

        let page_files = collect_page_files(workdir).await?;
        if page_files.is_empty() {
            return Err(PipelineError::NoPagesProduced);
        }
        info!("converter produced {} page images", page_files.len());

        let mut raw_pages = Vec::with_capacity(page_files.len());
        for (_, path) in &page_files {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| PipelineError::Internal(format!("read page image: {e}")))?;
            raw_pages.push(bytes);
        }

        resize::resize_pages(raw_pages, self.config.target_page_height).await
    }
}

/// Enumerate produced page files and sort them numerically by page token.
async fn collect_page_files(dir: &Path) -> Result<Vec<(u32, PathBuf)>, PipelineError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| PipelineError::Internal(format!("read temp dir: {e}")))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::Internal(format!("read temp dir entry: {e}")))?
    {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(PAGE_FILE_PREFIX) && name.ends_with(&format!(".{PAGE_FILE_EXT}")) {
            let page = page_token(&name).ok_or_else(|| PipelineError::UnnumberedPageFile {
                file: entry.path(),
            })?;
            files.push((page, entry.path()));
        }
    }

    files.sort_unstable_by_key(|(page, _)| *page);
    Ok(files)
}

/// First digit run in the filename, parsed as the 1-based page number.
fn page_token(name: &str) -> Option<u32> {
    PAGE_TOKEN.find(name)?.as_str().parse().ok()
}
