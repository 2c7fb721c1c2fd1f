//! Configuration for the two document pipelines.
//!
//! Each pipeline gets its own config struct built via a builder, so callers
//! set only what they care about and rely on documented defaults for the
//! rest. Both structs are cheap to clone and safe to share across requests.

use crate::error::PipelineError;
use std::path::PathBuf;

/// Configuration for [`crate::rasterize::DocumentRasterizer`].
///
/// # Example
/// ```rust
/// use receipt_pipeline::RasterizerConfig;
///
/// let config = RasterizerConfig::builder()
///     .dpi(150)
///     .max_pages(150)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct RasterizerConfig {
    /// Maximum accepted document size in bytes. Default: 50 MiB.
    ///
    /// Oversized uploads fail validation before any page image is produced
    /// or uploaded.
    pub max_document_bytes: u64,

    /// Maximum accepted page count. Default: 150.
    pub max_pages: usize,

    /// Resolution passed to the page converter, in DPI on both axes.
    /// Range: 72–400. Default: 150.
    ///
    /// 150 DPI keeps receipt scans readable while the per-page PNGs stay
    /// small enough to resize and upload quickly.
    pub dpi: u32,

    /// Height every page image is resized to, in pixels. Default: 1122.
    ///
    /// Width scales proportionally, so mixed-size source documents come out
    /// with uniform page geometry.
    pub target_page_height: u32,

    /// Timeout around one converter invocation, in seconds. Default: 120.
    ///
    /// The converter is an external process; without a bound here a hung
    /// binary would block the request indefinitely.
    pub converter_timeout_secs: u64,

    /// Path to the converter executable. Default: `pdftocairo` on `$PATH`.
    pub converter_path: Option<PathBuf>,

    /// Directory the scoped working directories are created under.
    /// Default: the system temp directory.
    pub workdir_root: Option<PathBuf>,
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: 50 * 1024 * 1024,
            max_pages: 150,
            dpi: 150,
            target_page_height: 1122,
            converter_timeout_secs: 120,
            converter_path: None,
            workdir_root: None,
        }
    }
}

impl RasterizerConfig {
    /// Create a new builder for `RasterizerConfig`.
    pub fn builder() -> RasterizerConfigBuilder {
        RasterizerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RasterizerConfig`].
#[derive(Debug)]
pub struct RasterizerConfigBuilder {
    config: RasterizerConfig,
}

impl RasterizerConfigBuilder {
    pub fn max_document_bytes(mut self, bytes: u64) -> Self {
        self.config.max_document_bytes = bytes;
        self
    }

    pub fn max_pages(mut self, pages: usize) -> Self {
        self.config.max_pages = pages.max(1);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn target_page_height(mut self, px: u32) -> Self {
        self.config.target_page_height = px.max(1);
        self
    }

    pub fn converter_timeout_secs(mut self, secs: u64) -> Self {
        self.config.converter_timeout_secs = secs;
        self
    }

    pub fn converter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.converter_path = Some(path.into());
        self
    }

    pub fn workdir_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.workdir_root = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RasterizerConfig, PipelineError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(PipelineError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.max_document_bytes == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_document_bytes must be ≥ 1".into(),
            ));
        }
        if c.converter_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "converter_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for [`crate::report::ReportComposer`].
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Timeout around the browser page-load wait, in seconds. Default: 30.
    ///
    /// The report embeds remote image URLs; the renderer waits for those
    /// fetches to settle before printing, and this bounds that wait.
    pub page_load_timeout_secs: u64,

    /// Launch the browser without its OS sandbox. Default: true.
    ///
    /// Required in most container images where the Chromium sandbox cannot
    /// create user namespaces.
    pub no_sandbox: bool,

    /// Path to a Chromium/Chrome executable. Default: auto-detected.
    pub browser_path: Option<PathBuf>,
}

/// ISO A4 paper width in inches, as the print target expects it.
pub const A4_WIDTH_IN: f64 = 8.27;
/// ISO A4 paper height in inches.
pub const A4_HEIGHT_IN: f64 = 11.69;

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            page_load_timeout_secs: 30,
            no_sandbox: true,
            browser_path: None,
        }
    }
}

impl ComposerConfig {
    /// Create a new builder for `ComposerConfig`.
    pub fn builder() -> ComposerConfigBuilder {
        ComposerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ComposerConfig`].
#[derive(Debug)]
pub struct ComposerConfigBuilder {
    config: ComposerConfig,
}

impl ComposerConfigBuilder {
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_load_timeout_secs = secs;
        self
    }

    pub fn no_sandbox(mut self, v: bool) -> Self {
        self.config.no_sandbox = v;
        self
    }

    pub fn browser_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.browser_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ComposerConfig, PipelineError> {
        if self.config.page_load_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "page_load_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
