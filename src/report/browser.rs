//! The headless-browser adapter: HTML in, A4 PDF bytes out.
//!
//! ## Why spawn_blocking?
//!
//! `headless_chrome` drives the browser over a synchronous DevTools
//! connection. `tokio::task::spawn_blocking` keeps that off the async
//! worker threads, the same way the CPU-bound image work is handled.
//!
//! ## Lifecycle
//!
//! Each call launches a fresh browser instance, owned by the call and
//! dropped before it returns — `Browser`'s `Drop` kills the child process,
//! so the engine cannot leak across requests even when PDF emission fails.
//! The page-load wait is bounded by the configured timeout; the load event
//! only fires once the document's subresources (the embedded remote page
//! images) have resolved, which is what lets the print see every image.

use crate::config::{ComposerConfig, A4_HEIGHT_IN, A4_WIDTH_IN};
use crate::error::PipelineError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use std::time::Duration;
use tracing::{debug, info};

/// HTML-in, PDF-out rendering.
#[async_trait]
pub trait HtmlRenderer: Send + Sync {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, PipelineError>;
}

/// [`HtmlRenderer`] backed by a headless Chromium instance per call.
pub struct ChromiumRenderer {
    config: ComposerConfig,
}

impl ChromiumRenderer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl HtmlRenderer for ChromiumRenderer {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, PipelineError> {
        let html = html.to_string();
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || render_blocking(&html, &config))
            .await
            .map_err(|e| PipelineError::Internal(format!("render task panicked: {e}")))?
    }
}

/// Blocking implementation of report rendering.
fn render_blocking(html: &str, config: &ComposerConfig) -> Result<Vec<u8>, PipelineError> {
    let render_err =
        |detail: String| PipelineError::ReportRenderFailed { detail };

    let mut builder = LaunchOptions::default_builder();
    builder
        .headless(true)
        .sandbox(!config.no_sandbox)
        .idle_browser_timeout(Duration::from_secs(config.page_load_timeout_secs * 2));
    if let Some(path) = &config.browser_path {
        builder.path(Some(path.clone()));
    }
    let options = builder
        .build()
        .map_err(|e| render_err(format!("launch options: {e}")))?;

    info!("launching headless browser");
    let browser = Browser::new(options).map_err(|e| render_err(format!("launch: {e:#}")))?;

    let tab = browser
        .new_tab()
        .map_err(|e| render_err(format!("new tab: {e:#}")))?;
    tab.set_default_timeout(Duration::from_secs(config.page_load_timeout_secs));

    // Data URL keeps the document self-contained; only the embedded remote
    // image URLs hit the network.
    let url = format!("data:text/html;base64,{}", STANDARD.encode(html));
    tab.navigate_to(&url)
        .map_err(|e| render_err(format!("navigate: {e:#}")))?;
    tab.wait_until_navigated()
        .map_err(|e| render_err(format!("page load: {e:#}")))?;

    debug!("page loaded, printing to PDF");
    let pdf = tab
        .print_to_pdf(Some(PrintToPdfOptions {
            paper_width: Some(A4_WIDTH_IN),
            paper_height: Some(A4_HEIGHT_IN),
            print_background: Some(true),
            ..Default::default()
        }))
        .map_err(|e| render_err(format!("print: {e:#}")))?;

    info!("report PDF rendered: {} bytes", pdf.len());
    // `browser` drops here, killing the child process on every path.
    Ok(pdf)
}
