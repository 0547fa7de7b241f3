//! Traits for storage abstraction and external collaborators

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for the purchasing subsystem
///
/// This trait allows the engine to work with any storage backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.). Reads outside a
/// transaction observe a committed snapshot; point-in-time consistency
/// across the bill header and its sub-ledger aggregate is not guaranteed
/// between separate calls.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Open a transaction. Every write the engine performs goes through
    /// the returned handle and becomes visible only on commit.
    async fn begin(&self) -> PurchaseResult<Box<dyn StoreTx>>;

    /// Get a voucher by number
    async fn get_voucher(&self, id: VoucherNo) -> PurchaseResult<Option<Voucher>>;

    /// Get a purchase bill header by voucher number
    async fn get_purchase(&self, voucher_no: VoucherNo) -> PurchaseResult<Option<PurchaseBill>>;

    /// List the line items of a bill
    async fn get_line_items(&self, trn_no: VoucherNo) -> PurchaseResult<Vec<PurchaseLineItem>>;

    /// List the accounts-payable entries recorded against a bill
    async fn get_ap_entries(&self, purchase_no: VoucherNo) -> PurchaseResult<Vec<ApEntry>>;

    /// List the general-ledger postings of a transaction
    async fn get_postings(&self, trn_no: VoucherNo) -> PurchaseResult<Vec<LedgerPosting>>;

    /// List purchase bills matching a filter, ordered and paginated
    async fn list_purchases(
        &self,
        filter: &PurchaseFilter,
        page: &Pagination,
    ) -> PurchaseResult<Vec<PurchaseBill>>;

    /// Count purchase bills matching a filter
    async fn count_purchases(&self, filter: &PurchaseFilter) -> PurchaseResult<usize>;
}

/// One atomic unit of work against a [`PurchaseStore`]
///
/// Writes are buffered until [`commit`](StoreTx::commit); reads through the
/// handle observe the transaction's own writes. Dropping the handle without
/// committing discards everything, as does [`rollback`](StoreTx::rollback).
/// Commit fails with [`PurchaseError::Conflict`] when a concurrent
/// transaction committed first against the same state.
#[async_trait]
pub trait StoreTx: Send {
    /// Allocate the next voucher number and insert the voucher row
    async fn insert_voucher(
        &mut self,
        voucher_type: VoucherType,
        editable: bool,
        stamp: &AuditStamp,
    ) -> PurchaseResult<VoucherNo>;

    /// Flip a voucher's `editable` flag
    async fn set_voucher_editable(&mut self, id: VoucherNo, editable: bool) -> PurchaseResult<()>;

    /// Get a voucher, observing in-transaction writes
    async fn get_voucher(&mut self, id: VoucherNo) -> PurchaseResult<Option<Voucher>>;

    /// Get a bill header, observing in-transaction writes
    async fn get_purchase(&mut self, voucher_no: VoucherNo)
        -> PurchaseResult<Option<PurchaseBill>>;

    /// List a bill's line items, observing in-transaction writes
    async fn get_line_items(&mut self, trn_no: VoucherNo) -> PurchaseResult<Vec<PurchaseLineItem>>;

    /// Insert a new bill header
    async fn insert_purchase(&mut self, bill: &PurchaseBill) -> PurchaseResult<()>;

    /// Overwrite an existing bill header
    async fn update_purchase(&mut self, bill: &PurchaseBill) -> PurchaseResult<()>;

    /// Set the status of one or more bills
    async fn set_purchase_status(
        &mut self,
        voucher_nos: &[VoucherNo],
        status: PurchaseStatus,
        now: NaiveDateTime,
        actor: ActorId,
    ) -> PurchaseResult<()>;

    /// Replace a bill's line items wholesale. The caller's new line count
    /// may differ from the stored count, so the previous rows are deleted
    /// and the new rows inserted; there is no positional update.
    async fn replace_line_items(
        &mut self,
        trn_no: VoucherNo,
        items: &[PurchaseLineItem],
    ) -> PurchaseResult<()>;

    /// Insert an accounts-payable entry
    async fn insert_ap_entry(&mut self, entry: &ApEntry) -> PurchaseResult<()>;

    /// Correct the bill's sub-ledger entry in place: set its debit side and
    /// re-point it at the contra transaction. The entry is corrected, never
    /// duplicated.
    async fn settle_ap_entry(
        &mut self,
        purchase_no: VoucherNo,
        contra_trn_no: VoucherNo,
        debit: BigDecimal,
        trn_date: NaiveDate,
        particulars: &str,
        now: NaiveDateTime,
        actor: ActorId,
    ) -> PurchaseResult<()>;

    /// Delete every accounts-payable entry of a bill
    async fn delete_ap_entries(&mut self, purchase_no: VoucherNo) -> PurchaseResult<()>;

    /// Insert a general-ledger posting
    async fn insert_posting(&mut self, posting: &LedgerPosting) -> PurchaseResult<()>;

    /// Apply the contra credit to the transaction's existing posting row.
    /// Ledger history is append-only apart from this single correction;
    /// a fresh posting is never written here.
    async fn apply_posting_credit(
        &mut self,
        trn_no: VoucherNo,
        credit: BigDecimal,
        particulars: &str,
        now: NaiveDateTime,
        actor: ActorId,
    ) -> PurchaseResult<()>;

    /// Duplicate a bill row under a new voucher number with contra
    /// particulars, preserving every other field of the original
    async fn clone_bill_as_contra(
        &mut self,
        original: VoucherNo,
        contra_voucher: VoucherNo,
        particulars: &str,
        stamp: &AuditStamp,
    ) -> PurchaseResult<()>;

    /// Publish every buffered write atomically
    async fn commit(self: Box<Self>) -> PurchaseResult<()>;

    /// Discard every buffered write
    async fn rollback(self: Box<Self>);
}

/// Vendor identity resolved from the external people directory
#[derive(Debug, Clone, PartialEq)]
pub struct VendorProfile {
    pub first_name: String,
    pub last_name: String,
}

impl VendorProfile {
    /// Display name snapshotted onto bills
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// External people directory lookup
#[async_trait]
pub trait VendorDirectory: Send + Sync {
    /// Resolve a vendor id to its profile, `None` when unknown
    async fn resolve_vendor(&self, vendor_id: VendorId) -> PurchaseResult<Option<VendorProfile>>;
}

/// Domain events emitted after a transaction commits
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseEvent {
    /// A purchase bill or order was recorded. External subscribers hook
    /// here (e.g. inventory stock decrement).
    Created {
        event_id: Uuid,
        voucher_no: VoucherNo,
        vendor_id: VendorId,
        amount: BigDecimal,
        purchase_order: bool,
    },
    /// An order or draft was corrected in place
    Corrected {
        event_id: Uuid,
        voucher_no: VoucherNo,
    },
    /// A posted bill was superseded through the contra path
    Superseded {
        event_id: Uuid,
        original_no: VoucherNo,
        contra_no: VoucherNo,
        replacement_no: VoucherNo,
    },
    /// A bill was voided
    Voided {
        event_id: Uuid,
        voucher_no: VoucherNo,
    },
}

/// Fire-and-forget notification bus. Invoked only after commit; an
/// implementation must not block the calling operation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PurchaseEvent);
}

/// Sink that drops every event
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: &PurchaseEvent) {}
}

/// Time source for audit stamps and date defaults
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall-clock time in UTC
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }
}

/// Current-actor provider for `created_by` / `updated_by` fields
pub trait ActorProvider: Send + Sync {
    fn current_actor(&self) -> ActorId;
}

/// Provider that always reports the same actor
pub struct FixedActor(pub ActorId);

impl ActorProvider for FixedActor {
    fn current_actor(&self) -> ActorId {
        self.0
    }
}
