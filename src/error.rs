//! Error types for the receipt-pipeline library.
//!
//! Every fallible operation returns [`PipelineError`]. Variants are grouped by
//! the stage that produces them, and [`PipelineError::kind`] collapses them
//! into the four caller-facing classes:
//!
//! * [`ErrorKind::Validation`] — the uploaded document itself is unacceptable
//!   (too large, too many pages, not parseable). Reported to the client,
//!   never retried.
//! * [`ErrorKind::Render`] — an external tool (poppler, the headless browser)
//!   produced no usable output. Not retried: the tools are deterministic, so
//!   the same bytes will fail the same way.
//! * [`ErrorKind::Processing`] — a page image could not be decoded or
//!   resized. The whole batch aborts; nothing is partially persisted.
//! * [`ErrorKind::NotFound`] — the requested receipt does not exist. A
//!   client-visible 404, not a server fault.
//!
//! Retry policy, if any, belongs to the calling layer — this crate never
//! retries on its own.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the receipt-pipeline library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The uploaded document exceeds the configured byte limit.
    #[error("document too large: {size_mb:.1} MB (limit {limit_mb} MB)")]
    DocumentTooLarge { size_mb: f64, limit_mb: u64 },

    /// The uploaded document exceeds the configured page-count limit.
    #[error("document has too many pages: {pages} (limit {limit})")]
    DocumentTooLong { pages: usize, limit: usize },

    /// The bytes could not be parsed as a PDF at all.
    #[error("document is not a readable PDF: {detail}")]
    InvalidDocument { detail: String },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The page converter ran but produced no page images.
    #[error("converter produced no page images from the document")]
    NoPagesProduced,

    /// The page converter wrote a file whose name carries no page number.
    ///
    /// Skipping such a file would silently shift every later page, so the
    /// whole run fails instead.
    #[error("converter output file '{file}' has no page-number token")]
    UnnumberedPageFile { file: PathBuf },

    /// The external converter exited non-zero or could not be spawned.
    #[error("page converter failed: {detail}")]
    ConverterFailed { detail: String },

    /// The external converter exceeded its configured timeout.
    #[error("page converter timed out after {secs}s")]
    ConverterTimeout { secs: u64 },

    /// The headless browser could not turn the report HTML into a PDF.
    #[error("report rendering failed: {detail}")]
    ReportRenderFailed { detail: String },

    // ── Processing errors ─────────────────────────────────────────────────
    /// A page image failed to decode, resize, or re-encode.
    #[error("page {page}: image processing failed: {detail}")]
    PageProcessingFailed { page: usize, detail: String },

    // ── Lookup errors ─────────────────────────────────────────────────────
    /// The receipt does not exist.
    #[error("receipt {receipt_id} not found")]
    ReceiptNotFound { receipt_id: i64 },

    // ── Adapter errors ────────────────────────────────────────────────────
    /// The relational data-store adapter failed.
    #[error("data store error: {detail}")]
    Store { detail: String },

    /// The object-storage adapter failed; no URI set was produced.
    #[error("object storage error: {detail}")]
    Storage { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task join, temp-file plumbing).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Caller-facing classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Render,
    Processing,
    NotFound,
    Store,
    Storage,
    Config,
    Internal,
}

impl PipelineError {
    /// Classify this error for the caller's error mapping (HTTP status,
    /// client message, logging severity).
    pub fn kind(&self) -> ErrorKind {
        use PipelineError::*;
        match self {
            DocumentTooLarge { .. } | DocumentTooLong { .. } | InvalidDocument { .. } => {
                ErrorKind::Validation
            }
            NoPagesProduced
            | UnnumberedPageFile { .. }
            | ConverterFailed { .. }
            | ConverterTimeout { .. }
            | ReportRenderFailed { .. } => ErrorKind::Render,
            PageProcessingFailed { .. } => ErrorKind::Processing,
            ReceiptNotFound { .. } => ErrorKind::NotFound,
            Store { .. } => ErrorKind::Store,
            Storage { .. } => ErrorKind::Storage,
            InvalidConfig(_) => ErrorKind::Config,
            Internal(_) => ErrorKind::Internal,
        }
    }
}
