//! # receipt-pipeline
//!
//! Document pipelines for an expense-receipt backend.
//!
//! Two pipelines share one purpose — converting between a multi-page
//! document and an ordered set of page images — and run in opposite
//! directions:
//!
//! ```text
//! Ingest   PDF ─▶ validate ─▶ rasterize (poppler) ─▶ resize ─▶ store
//!                                                              (ordered URIs)
//! Report   receipt id ─▶ relational snapshot ─▶ HTML template
//!                                          ─▶ headless browser ─▶ A4 PDF
//! ```
//!
//! * [`rasterize::DocumentRasterizer`] accepts an uploaded PDF, validates it
//!   against size and page-count limits, rasterizes each page via an
//!   external converter, resizes every page to a uniform height, and uploads
//!   the set in page order. Element *i* of the stored set is page *i + 1* of
//!   the source — that ordering is the one invariant everything downstream
//!   depends on.
//! * [`report::ReportComposer`] fetches a receipt and its relations, renders
//!   a typed HTML template, and drives a headless browser to an A4 PDF.
//!
//! External collaborators — the relational store, object storage, the
//! converter binary, the browser — sit behind injected traits
//! ([`store::ReceiptStore`], [`storage::ObjectStorage`],
//! [`rasterize::convert::PageConverter`], [`report::browser::HtmlRenderer`])
//! so tests run against in-memory fakes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use receipt_pipeline::{
//!     DocumentRasterizer, PopplerConverter, RasterizerConfig, S3Storage,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RasterizerConfig::default();
//!     let converter = Arc::new(PopplerConverter::new(&config));
//!     let storage = Arc::new(S3Storage::from_env("receipts").await);
//!
//!     let rasterizer = DocumentRasterizer::new(converter, storage, config);
//!     let bytes = std::fs::read("upload.pdf")?;
//!     let urls = rasterizer.ingest(bytes).await?;
//!     println!("stored {} pages", urls.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Every error carries a [`ErrorKind`] class: `Validation` (bad input,
//! client-visible), `Render` (an external tool produced nothing usable),
//! `Processing` (image work failed; the batch aborts atomically),
//! `NotFound` (missing receipt). Nothing is retried here and nothing is
//! partially persisted — retry policy belongs to the calling layer.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod model;
pub mod rasterize;
pub mod report;
pub mod storage;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ComposerConfig, RasterizerConfig, A4_HEIGHT_IN, A4_WIDTH_IN};
pub use error::{ErrorKind, PipelineError};
pub use model::{
    ChargedCompany, Company, PageImage, Receipt, ReportDocument, ReportSnapshot,
    RepresentedPerson, User,
};
pub use rasterize::convert::{PageConverter, PopplerConverter};
pub use rasterize::DocumentRasterizer;
pub use report::browser::{ChromiumRenderer, HtmlRenderer};
pub use report::ReportComposer;
pub use storage::{ObjectStorage, S3Storage};
pub use store::ReceiptStore;
