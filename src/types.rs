//! Core types and data structures for the purchasing subsystem

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Monotonic voucher number allocated by the store
pub type VoucherNo = u64;
/// Identifier of a vendor in the external people directory
pub type VendorId = u64;
/// Identifier of a product in the external catalog
pub type ProductId = u64;
/// Numeric general-ledger account identifier
pub type LedgerId = u64;
/// Identifier of the acting user
pub type ActorId = u64;

/// Transaction envelope types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherType {
    /// Vendor-side purchases and purchase orders
    Purchase,
    /// Customer-side sales invoices
    Sales,
    /// Payments against open bills or invoices
    Payment,
}

/// Creation and last-modification audit fields shared by every persisted row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub created_at: NaiveDateTime,
    pub created_by: ActorId,
    pub updated_at: NaiveDateTime,
    pub updated_by: ActorId,
}

impl AuditStamp {
    /// Stamp a freshly created row
    pub fn new(now: NaiveDateTime, actor: ActorId) -> Self {
        Self {
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        }
    }

    /// Record a modification, preserving the creation fields
    pub fn touch(&mut self, now: NaiveDateTime, actor: ActorId) {
        self.updated_at = now;
        self.updated_by = actor;
    }
}

/// Numbered envelope identifying one accounting transaction
///
/// A voucher's `editable` flag flips to false exactly once, when a contra
/// voucher is created against it; it never flips back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherNo,
    pub voucher_type: VoucherType,
    pub editable: bool,
    pub audit: AuditStamp,
}

/// Lifecycle status of a purchase bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseStatus {
    /// Recorded but not yet a financial commitment
    Draft,
    /// Posted to the sub-ledger and general ledger
    Posted,
    /// Retired by voiding; a reporting marker, not a reversal
    Void,
    /// Superseded by a contra entry; frozen for direct editing
    Closed,
}

/// Purchase bill header, one per voucher of type `Purchase`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseBill {
    /// Voucher number, 1:1 with the owning [`Voucher`]
    pub voucher_no: VoucherNo,
    pub vendor_id: VendorId,
    /// Vendor name snapshot taken when the bill was written
    pub vendor_name: String,
    pub trn_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Bill total, never negative
    pub amount: BigDecimal,
    /// External reference (vendor invoice number, PO number, ...)
    pub ref_no: Option<String>,
    pub status: PurchaseStatus,
    /// Purchase orders are not yet postable bills
    pub purchase_order: bool,
    /// File references attached to the bill
    pub attachments: Vec<String>,
    /// Free-text memo
    pub particulars: String,
    pub audit: AuditStamp,
}

impl PurchaseBill {
    /// Whether this bill carries sub-ledger and general-ledger postings.
    /// Orders and drafts are not financial commitments and never post.
    pub fn posts_to_ledger(&self) -> bool {
        !self.purchase_order && self.status != PurchaseStatus::Draft
    }
}

/// One product line on a purchase bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLineItem {
    /// Voucher number of the owning bill
    pub trn_no: VoucherNo,
    pub product_id: ProductId,
    pub qty: BigDecimal,
    pub unit_price: BigDecimal,
    /// Line total, always recomputed as `qty * unit_price` on write
    pub amount: BigDecimal,
    pub audit: AuditStamp,
}

/// Accounts-payable sub-ledger entry tied to one purchase bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApEntry {
    /// Voucher number of the bill this entry settles against
    pub purchase_no: VoucherNo,
    /// Voucher number of the transaction that wrote the entry
    pub trn_no: VoucherNo,
    pub trn_date: NaiveDate,
    pub particulars: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub audit: AuditStamp,
}

/// One debit/credit record against a general-ledger account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerPosting {
    pub ledger_id: LedgerId,
    pub trn_no: VoucherNo,
    pub particulars: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub trn_date: NaiveDate,
    pub audit: AuditStamp,
}

/// Full purchase record returned to callers: header, voucher editability,
/// line items, and the outstanding due aggregated from the sub-ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseView {
    pub bill: PurchaseBill,
    pub editable: bool,
    pub line_items: Vec<PurchaseLineItem>,
    /// `credit - debit` summed over the bill's sub-ledger entries
    pub total_due: BigDecimal,
}

/// Caller input for one purchase line; the line total is never trusted
/// from the caller and is recomputed from these multiplicands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemInput {
    pub product_id: ProductId,
    pub qty: BigDecimal,
    pub unit_price: BigDecimal,
}

impl LineItemInput {
    /// The recomputed line total
    pub fn line_total(&self) -> BigDecimal {
        &self.qty * &self.unit_price
    }
}

/// Caller input for creating or updating a purchase bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseInput {
    pub vendor_id: VendorId,
    /// Transaction date, defaults to today when omitted
    pub trn_date: Option<NaiveDate>,
    /// Payment due date, defaults to today when omitted
    pub due_date: Option<NaiveDate>,
    /// Explicit bill total; wins over the sum of line totals when supplied
    pub amount: Option<BigDecimal>,
    pub ref_no: Option<String>,
    /// Only `Draft` and `Posted` are accepted at the boundary
    pub status: PurchaseStatus,
    pub purchase_order: bool,
    pub attachments: Vec<String>,
    pub particulars: String,
    pub line_items: Vec<LineItemInput>,
}

impl PurchaseInput {
    /// The bill amount: the explicit amount if supplied, otherwise the sum
    /// of recomputed line totals
    pub fn bill_amount(&self) -> BigDecimal {
        match &self.amount {
            Some(amount) => amount.clone(),
            None => self.line_items.iter().map(|item| item.line_total()).sum(),
        }
    }
}

/// Sort key for purchase listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderBy {
    VoucherNo,
    TrnDate,
    DueDate,
    Amount,
}

/// Sort direction for purchase listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Pagination and ordering for listing queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub order_by: OrderBy,
    pub direction: OrderDirection,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            order_by: OrderBy::VoucherNo,
            direction: OrderDirection::Desc,
        }
    }
}

/// Filter for purchase listings; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseFilter {
    pub vendor_id: Option<VendorId>,
    pub status: Option<PurchaseStatus>,
    pub purchase_order: Option<bool>,
}

impl PurchaseFilter {
    /// Whether a bill matches every set field
    pub fn matches(&self, bill: &PurchaseBill) -> bool {
        self.vendor_id.is_none_or(|v| bill.vendor_id == v)
            && self.status.is_none_or(|s| bill.status == s)
            && self.purchase_order.is_none_or(|o| bill.purchase_order == o)
    }
}

/// Errors that can occur in the purchasing engine
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Purchase not found: voucher #{0}")]
    NotFound(VoucherNo),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Concurrency conflict: {0}")]
    Conflict(String),
}

/// Result type for purchasing operations
pub type PurchaseResult<T> = Result<T, PurchaseError>;
