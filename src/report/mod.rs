//! The report pipeline: receipt id → styled A4 PDF.
//!
//! ## Data Flow
//!
//! ```text
//! receipt id
//!  │
//!  ├─ 1. Receipt    point fetch; missing → NotFound, nothing else runs
//!  ├─ 2. Relations  represented / submitter / charges / images, fetched
//!  │                concurrently and joined before assembly
//!  ├─ 3. Company    submitter's company; charged companies in one batched
//!  │                lookup (never per-id)
//!  ├─ 4. Note       attached when a note row exists, omitted otherwise
//!  ├─ 5. Template   typed snapshot → HTML
//!  └─ 6. Render     fresh headless browser per call → PDF bytes
//! ```
//!
//! The snapshot is rebuilt from current relational state on every call and
//! never cached.

pub mod browser;
pub mod template;

use crate::error::PipelineError;
use crate::model::{ReportDocument, ReportSnapshot};
use crate::store::ReceiptStore;
use browser::HtmlRenderer;
use std::sync::Arc;
use tracing::{debug, info};

/// The report pipeline. Shared across requests; each compose call gets a
/// fresh browser instance from the renderer.
pub struct ReportComposer {
    store: Arc<dyn ReceiptStore>,
    renderer: Arc<dyn HtmlRenderer>,
}

impl ReportComposer {
    pub fn new(store: Arc<dyn ReceiptStore>, renderer: Arc<dyn HtmlRenderer>) -> Self {
        Self { store, renderer }
    }

    /// Compose the report PDF for one receipt.
    ///
    /// # Errors
    /// [`PipelineError::ReceiptNotFound`] when the receipt does not exist —
    /// returned before any further query or renderer launch.
    /// [`PipelineError::ReportRenderFailed`] when the browser step fails.
    pub async fn compose(&self, receipt_id: i64) -> Result<ReportDocument, PipelineError> {
        info!("report requested for receipt {}", receipt_id);

        let receipt = self
            .store
            .receipt_by_id(receipt_id)
            .await?
            .ok_or(PipelineError::ReceiptNotFound { receipt_id })?;

        // Independent relations, fetched concurrently and joined.
        let (represented, submitter, charged, mut images, note) = tokio::try_join!(
            self.store.represented_for_receipt(receipt_id),
            async {
                self.store
                    .user_by_id(receipt.user_id)
                    .await?
                    .ok_or_else(|| PipelineError::Store {
                        detail: format!(
                            "user {} referenced by receipt {} is missing",
                            receipt.user_id, receipt_id
                        ),
                    })
            },
            self.store.charged_for_receipt(receipt_id),
            self.store.images_for_receipt(receipt_id),
            self.store.note_for_receipt(receipt_id),
        )?;

        let company = self
            .store
            .company_by_id(submitter.company_id)
            .await?
            .ok_or_else(|| PipelineError::Store {
                detail: format!(
                    "company {} referenced by user {} is missing",
                    submitter.company_id, submitter.user_id
                ),
            })?;

        // One batched lookup for all charged companies; skipped entirely
        // when the receipt charges none.
        let charged_companies = if charged.is_empty() {
            Vec::new()
        } else {
            let ids: Vec<i64> = charged.iter().map(|c| c.company_id).collect();
            self.store.companies_by_ids(&ids).await?
        };

        images.sort_unstable_by_key(|img| img.page_number);

        debug!(
            "snapshot for receipt {}: {} represented, {} charged, {} images, note: {}",
            receipt_id,
            represented.len(),
            charged_companies.len(),
            images.len(),
            note.is_some()
        );

        let snapshot = ReportSnapshot {
            receipt,
            submitter,
            company,
            represented,
            charged_companies,
            images,
            note,
        };

        let html = template::render(&snapshot);
        let pdf = self.renderer.render_pdf(&html).await?;

        info!(
            "report composed for receipt {}: {} bytes",
            receipt_id,
            pdf.len()
        );
        Ok(ReportDocument { html, pdf })
    }
}
