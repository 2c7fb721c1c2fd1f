//! The relational data-store seam the report pipeline reads through.
//!
//! The database itself is an external collaborator; this trait is the whole
//! contract the composer needs from it. Injecting it as `Arc<dyn
//! ReceiptStore>` lets tests substitute an in-memory fake and keeps the
//! pipeline free of any SQL or pool handling.

use crate::error::PipelineError;
use crate::model::{ChargedCompany, Company, PageImage, Receipt, RepresentedPerson, User};
use async_trait::async_trait;

/// Point and batched reads over the receipt schema.
///
/// All methods map a missing row to `Ok(None)` / an empty `Vec`; `Err` is
/// reserved for adapter failures (connection loss, malformed rows).
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn receipt_by_id(&self, receipt_id: i64) -> Result<Option<Receipt>, PipelineError>;

    async fn user_by_id(&self, user_id: i64) -> Result<Option<User>, PipelineError>;

    async fn company_by_id(&self, company_id: i64) -> Result<Option<Company>, PipelineError>;

    /// Batched `WHERE company_id = ANY($ids)` lookup.
    ///
    /// One round-trip regardless of how many companies a receipt charges;
    /// resolving them one by one would reintroduce the N+1 pattern.
    async fn companies_by_ids(&self, company_ids: &[i64]) -> Result<Vec<Company>, PipelineError>;

    async fn represented_for_receipt(
        &self,
        receipt_id: i64,
    ) -> Result<Vec<RepresentedPerson>, PipelineError>;

    async fn charged_for_receipt(
        &self,
        receipt_id: i64,
    ) -> Result<Vec<ChargedCompany>, PipelineError>;

    async fn images_for_receipt(&self, receipt_id: i64) -> Result<Vec<PageImage>, PipelineError>;

    /// Free-text note for the receipt, if a note row exists.
    async fn note_for_receipt(&self, receipt_id: i64) -> Result<Option<String>, PipelineError>;
}
