//! The external page-converter adapter.
//!
//! Rasterisation is delegated to poppler's `pdftocairo`: file in, one PNG
//! per page out, with the page number embedded in each output filename. The
//! trait exists so tests can substitute a fake that writes files directly,
//! and so a different converter binary can be dropped in without touching
//! the pipeline.
//!
//! The invocation is wrapped in an explicit timeout. The converter is
//! deterministic, so a timeout is reported as a render failure and never
//! retried here.

use crate::config::RasterizerConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Filename stem the converter writes page images under.
pub const PAGE_FILE_PREFIX: &str = "page";
/// Extension of the produced page images.
pub const PAGE_FILE_EXT: &str = "png";

/// File-in, files-out page rasterisation.
#[async_trait]
pub trait PageConverter: Send + Sync {
    /// Render every page of `document` as an image file in `out_dir`.
    ///
    /// Produced filenames must start with [`PAGE_FILE_PREFIX`], end with
    /// [`PAGE_FILE_EXT`], and carry the 1-based page number as the first
    /// digit run in the name (`page-1.png`, `page-2.png`, …, unpadded).
    async fn convert_pages(
        &self,
        document: &Path,
        out_dir: &Path,
        dpi: u32,
    ) -> Result<(), PipelineError>;
}

/// [`PageConverter`] backed by poppler's `pdftocairo`.
pub struct PopplerConverter {
    executable: PathBuf,
    timeout: Duration,
}

impl PopplerConverter {
    pub fn new(config: &RasterizerConfig) -> Self {
        Self {
            executable: config
                .converter_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("pdftocairo")),
            timeout: Duration::from_secs(config.converter_timeout_secs),
        }
    }
}

#[async_trait]
impl PageConverter for PopplerConverter {
    async fn convert_pages(
        &self,
        document: &Path,
        out_dir: &Path,
        dpi: u32,
    ) -> Result<(), PipelineError> {
        // pdftocairo -png -r <dpi> <pdf> <out_dir>/page  →  page-1.png …
        let prefix = out_dir.join(PAGE_FILE_PREFIX);
        debug!(
            "running {} -png -r {} {} {}",
            self.executable.display(),
            dpi,
            document.display(),
            prefix.display()
        );

        let child = Command::new(&self.executable)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(document)
            .arg(&prefix)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| PipelineError::ConverterTimeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| PipelineError::ConverterFailed {
                detail: format!("failed to spawn {}: {}", self.executable.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("converter exited {}: {}", output.status, stderr.trim());
            return Err(PipelineError::ConverterFailed {
                detail: format!("exit {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_executable_is_a_converter_failure() {
        let config = RasterizerConfig::builder()
            .converter_path("/nonexistent/pdftocairo")
            .build()
            .unwrap();
        let converter = PopplerConverter::new(&config);
        let dir = tempfile::tempdir().unwrap();

        let err = converter
            .convert_pages(&dir.path().join("in.pdf"), dir.path(), 150)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ConverterFailed { .. }));
    }
}
