//! Typed rows for the receipt domain, plus the transient report snapshot.
//!
//! These mirror the relational schema one-to-one. Monetary amounts are plain
//! `f64` net/tax pairs with the total derived, never stored — keeping the two
//! source amounts authoritative means the total can never drift out of sync.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One expense receipt row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_id: i64,
    /// Date the receipt was registered in the system.
    pub creation_date: NaiveDate,
    /// Date of the underlying transaction.
    pub receipt_date: NaiveDate,
    /// The submitting user.
    pub user_id: i64,
    /// True when paid with a company card, false for a personal expense.
    pub company_card: bool,
    /// Net amount.
    pub net: f64,
    /// Tax amount. May be negative for credit receipts.
    pub tax: f64,
    pub description: String,
}

impl Receipt {
    /// Derived total amount. Always `net + tax`, computed on demand.
    pub fn total(&self) -> f64 {
        self.net + self.tax
    }
}

/// One stored page image belonging to a receipt.
///
/// `page_number` is 1-based and defines display order; it matches the
/// position of the image in the set at the time the set was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    pub receipt_id: i64,
    /// Object-storage URI of the page image.
    pub link: String,
    pub page_number: u32,
}

/// A denormalised "represented person" name attached to a receipt.
///
/// There is no identity beyond (receipt, name) and duplicates are permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentedPerson {
    pub receipt_id: i64,
    pub name: String,
}

/// Association marking a company as billed for (part of) a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargedCompany {
    pub receipt_id: i64,
    pub company_id: i64,
}

/// One company row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub company_id: i64,
    pub company_name: String,
}

/// One user row, reduced to the fields the report needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    pub email: String,
    pub company_id: i64,
}

/// Everything the report template needs, fetched fresh per compose call.
///
/// Never cached: the report always reflects current relational state.
#[derive(Debug, Clone)]
pub struct ReportSnapshot {
    pub receipt: Receipt,
    pub submitter: User,
    pub company: Company,
    pub represented: Vec<RepresentedPerson>,
    /// Resolved charged companies; empty when no associations exist.
    pub charged_companies: Vec<Company>,
    /// Page images sorted by `page_number`.
    pub images: Vec<PageImage>,
    /// Free-text note, if a note row exists for the receipt.
    pub note: Option<String>,
}

/// The transient rendering artifact produced by a compose call.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    /// The HTML handed to the headless renderer.
    pub html: String,
    /// The A4 PDF bytes the renderer produced.
    pub pdf: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(net: f64, tax: f64) -> Receipt {
        Receipt {
            receipt_id: 1,
            creation_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            receipt_date: NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            user_id: 7,
            company_card: false,
            net,
            tax,
            description: "Taxi".into(),
        }
    }

    #[test]
    fn total_is_net_plus_tax() {
        assert_eq!(receipt(100.0, 25.0).total(), 125.0);
        assert_eq!(receipt(0.0, 0.0).total(), 0.0);
    }

    #[test]
    fn total_handles_negative_tax() {
        // Credit receipts carry a negative tax amount.
        assert_eq!(receipt(100.0, -25.0).total(), 75.0);
        assert_eq!(receipt(-50.0, -12.5).total(), -62.5);
    }

    #[test]
    fn receipt_roundtrips_through_json() {
        let r = receipt(99.9, 24.98);
        let json = serde_json::to_string(&r).unwrap();
        let back: Receipt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
