//! In-memory storage and collaborators for testing and development

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::traits::*;
use crate::types::*;

/// The logical tables: vouchers, bills, line items, AP entries, postings
#[derive(Debug, Clone, Default)]
struct StoreInner {
    version: u64,
    next_voucher_no: VoucherNo,
    vouchers: HashMap<VoucherNo, Voucher>,
    purchases: HashMap<VoucherNo, PurchaseBill>,
    line_items: HashMap<VoucherNo, Vec<PurchaseLineItem>>,
    ap_entries: HashMap<VoucherNo, Vec<ApEntry>>,
    postings: Vec<LedgerPosting>,
}

fn list_filtered(inner: &StoreInner, filter: &PurchaseFilter) -> Vec<PurchaseBill> {
    inner
        .purchases
        .values()
        .filter(|bill| filter.matches(bill))
        .cloned()
        .collect()
}

/// Order and slice a result set the way a SQL backend would apply
/// ORDER BY / LIMIT / OFFSET
pub(crate) fn order_and_page(mut bills: Vec<PurchaseBill>, page: &Pagination) -> Vec<PurchaseBill> {
    bills.sort_by(|a, b| {
        let ordering = match page.order_by {
            OrderBy::VoucherNo => a.voucher_no.cmp(&b.voucher_no),
            OrderBy::TrnDate => a.trn_date.cmp(&b.trn_date),
            OrderBy::DueDate => a.due_date.cmp(&b.due_date),
            OrderBy::Amount => a.amount.cmp(&b.amount),
        };
        match page.direction {
            OrderDirection::Asc => ordering,
            OrderDirection::Desc => ordering.reverse(),
        }
    });
    bills.into_iter().skip(page.offset).take(page.limit).collect()
}

/// In-memory [`PurchaseStore`] implementation
///
/// Transactions clone the whole store, mutate the clone, and publish it
/// back on commit iff no other transaction committed in between; the
/// loser fails with [`PurchaseError::Conflict`] and can be retried.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all data (useful for testing)
    pub fn clear(&self) {
        *self.inner.write().unwrap() = StoreInner::default();
    }
}

#[async_trait]
impl PurchaseStore for MemoryStore {
    async fn begin(&self) -> PurchaseResult<Box<dyn StoreTx>> {
        let snapshot = self.inner.read().unwrap().clone();
        let base_version = snapshot.version;
        Ok(Box::new(MemoryTx {
            shared: Arc::clone(&self.inner),
            working: snapshot,
            base_version,
        }))
    }

    async fn get_voucher(&self, id: VoucherNo) -> PurchaseResult<Option<Voucher>> {
        Ok(self.inner.read().unwrap().vouchers.get(&id).cloned())
    }

    async fn get_purchase(&self, voucher_no: VoucherNo) -> PurchaseResult<Option<PurchaseBill>> {
        Ok(self.inner.read().unwrap().purchases.get(&voucher_no).cloned())
    }

    async fn get_line_items(&self, trn_no: VoucherNo) -> PurchaseResult<Vec<PurchaseLineItem>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .line_items
            .get(&trn_no)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_ap_entries(&self, purchase_no: VoucherNo) -> PurchaseResult<Vec<ApEntry>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .ap_entries
            .get(&purchase_no)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_postings(&self, trn_no: VoucherNo) -> PurchaseResult<Vec<LedgerPosting>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .postings
            .iter()
            .filter(|posting| posting.trn_no == trn_no)
            .cloned()
            .collect())
    }

    async fn list_purchases(
        &self,
        filter: &PurchaseFilter,
        page: &Pagination,
    ) -> PurchaseResult<Vec<PurchaseBill>> {
        let bills = list_filtered(&self.inner.read().unwrap(), filter);
        Ok(order_and_page(bills, page))
    }

    async fn count_purchases(&self, filter: &PurchaseFilter) -> PurchaseResult<usize> {
        Ok(list_filtered(&self.inner.read().unwrap(), filter).len())
    }
}

/// Snapshot transaction over a [`MemoryStore`]
pub struct MemoryTx {
    shared: Arc<RwLock<StoreInner>>,
    working: StoreInner,
    base_version: u64,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_voucher(
        &mut self,
        voucher_type: VoucherType,
        editable: bool,
        stamp: &AuditStamp,
    ) -> PurchaseResult<VoucherNo> {
        self.working.next_voucher_no += 1;
        let id = self.working.next_voucher_no;
        self.working.vouchers.insert(
            id,
            Voucher {
                id,
                voucher_type,
                editable,
                audit: stamp.clone(),
            },
        );
        Ok(id)
    }

    async fn set_voucher_editable(&mut self, id: VoucherNo, editable: bool) -> PurchaseResult<()> {
        let voucher = self
            .working
            .vouchers
            .get_mut(&id)
            .ok_or(PurchaseError::NotFound(id))?;
        voucher.editable = editable;
        Ok(())
    }

    async fn get_voucher(&mut self, id: VoucherNo) -> PurchaseResult<Option<Voucher>> {
        Ok(self.working.vouchers.get(&id).cloned())
    }

    async fn get_purchase(
        &mut self,
        voucher_no: VoucherNo,
    ) -> PurchaseResult<Option<PurchaseBill>> {
        Ok(self.working.purchases.get(&voucher_no).cloned())
    }

    async fn get_line_items(&mut self, trn_no: VoucherNo) -> PurchaseResult<Vec<PurchaseLineItem>> {
        Ok(self
            .working
            .line_items
            .get(&trn_no)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_purchase(&mut self, bill: &PurchaseBill) -> PurchaseResult<()> {
        if self.working.purchases.contains_key(&bill.voucher_no) {
            return Err(PurchaseError::Storage(format!(
                "bill already exists for voucher #{}",
                bill.voucher_no
            )));
        }
        self.working.purchases.insert(bill.voucher_no, bill.clone());
        Ok(())
    }

    async fn update_purchase(&mut self, bill: &PurchaseBill) -> PurchaseResult<()> {
        if !self.working.purchases.contains_key(&bill.voucher_no) {
            return Err(PurchaseError::NotFound(bill.voucher_no));
        }
        self.working.purchases.insert(bill.voucher_no, bill.clone());
        Ok(())
    }

    async fn set_purchase_status(
        &mut self,
        voucher_nos: &[VoucherNo],
        status: PurchaseStatus,
        now: NaiveDateTime,
        actor: ActorId,
    ) -> PurchaseResult<()> {
        for voucher_no in voucher_nos {
            let bill = self
                .working
                .purchases
                .get_mut(voucher_no)
                .ok_or(PurchaseError::NotFound(*voucher_no))?;
            bill.status = status;
            bill.audit.touch(now, actor);
        }
        Ok(())
    }

    async fn replace_line_items(
        &mut self,
        trn_no: VoucherNo,
        items: &[PurchaseLineItem],
    ) -> PurchaseResult<()> {
        self.working.line_items.insert(trn_no, items.to_vec());
        Ok(())
    }

    async fn insert_ap_entry(&mut self, entry: &ApEntry) -> PurchaseResult<()> {
        self.working
            .ap_entries
            .entry(entry.purchase_no)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn settle_ap_entry(
        &mut self,
        purchase_no: VoucherNo,
        contra_trn_no: VoucherNo,
        debit: BigDecimal,
        trn_date: NaiveDate,
        particulars: &str,
        now: NaiveDateTime,
        actor: ActorId,
    ) -> PurchaseResult<()> {
        let entry = self
            .working
            .ap_entries
            .get_mut(&purchase_no)
            .and_then(|entries| entries.first_mut())
            .ok_or_else(|| {
                PurchaseError::Storage(format!(
                    "no sub-ledger entry to settle for voucher #{purchase_no}"
                ))
            })?;
        entry.trn_no = contra_trn_no;
        entry.trn_date = trn_date;
        entry.particulars = particulars.to_string();
        entry.debit = debit;
        entry.audit.touch(now, actor);
        Ok(())
    }

    async fn delete_ap_entries(&mut self, purchase_no: VoucherNo) -> PurchaseResult<()> {
        self.working.ap_entries.remove(&purchase_no);
        Ok(())
    }

    async fn insert_posting(&mut self, posting: &LedgerPosting) -> PurchaseResult<()> {
        self.working.postings.push(posting.clone());
        Ok(())
    }

    async fn apply_posting_credit(
        &mut self,
        trn_no: VoucherNo,
        credit: BigDecimal,
        particulars: &str,
        now: NaiveDateTime,
        actor: ActorId,
    ) -> PurchaseResult<()> {
        let posting = self
            .working
            .postings
            .iter_mut()
            .find(|posting| posting.trn_no == trn_no)
            .ok_or_else(|| {
                PurchaseError::Storage(format!("no ledger posting for voucher #{trn_no}"))
            })?;
        posting.credit = credit;
        posting.particulars = particulars.to_string();
        posting.audit.touch(now, actor);
        Ok(())
    }

    async fn clone_bill_as_contra(
        &mut self,
        original: VoucherNo,
        contra_voucher: VoucherNo,
        particulars: &str,
        stamp: &AuditStamp,
    ) -> PurchaseResult<()> {
        let mut contra = self
            .working
            .purchases
            .get(&original)
            .cloned()
            .ok_or(PurchaseError::NotFound(original))?;
        contra.voucher_no = contra_voucher;
        contra.particulars = particulars.to_string();
        contra.audit = stamp.clone();
        self.working.purchases.insert(contra_voucher, contra);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> PurchaseResult<()> {
        let MemoryTx {
            shared,
            mut working,
            base_version,
        } = *self;

        let mut guard = shared.write().unwrap();
        if guard.version != base_version {
            return Err(PurchaseError::Conflict(format!(
                "store changed underneath transaction (base v{}, now v{})",
                base_version, guard.version
            )));
        }
        working.version = base_version + 1;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) {
        // dropping the working snapshot discards every buffered write
    }
}

/// In-memory vendor directory
#[derive(Debug, Clone, Default)]
pub struct MemoryVendorDirectory {
    vendors: Arc<RwLock<HashMap<VendorId, VendorProfile>>>,
}

impl MemoryVendorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, vendor_id: VendorId, first_name: &str, last_name: &str) {
        self.vendors.write().unwrap().insert(
            vendor_id,
            VendorProfile {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            },
        );
    }
}

#[async_trait]
impl VendorDirectory for MemoryVendorDirectory {
    async fn resolve_vendor(&self, vendor_id: VendorId) -> PurchaseResult<Option<VendorProfile>> {
        Ok(self.vendors.read().unwrap().get(&vendor_id).cloned())
    }
}

/// Event sink that records everything it receives
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<PurchaseEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PurchaseEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &PurchaseEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> AuditStamp {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        AuditStamp::new(now, 1)
    }

    #[tokio::test]
    async fn test_commit_publishes_and_conflict_detected() {
        let store = MemoryStore::new();

        let mut tx1 = store.begin().await.unwrap();
        let mut tx2 = store.begin().await.unwrap();

        let id1 = tx1
            .insert_voucher(VoucherType::Purchase, true, &stamp())
            .await
            .unwrap();
        tx1.commit().await.unwrap();

        assert!(store.get_voucher(id1).await.unwrap().is_some());

        // tx2 started from the pre-commit snapshot; its commit must lose
        tx2.insert_voucher(VoucherType::Purchase, true, &stamp())
            .await
            .unwrap();
        let err = tx2.commit().await.unwrap_err();
        assert!(matches!(err, PurchaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let id = tx
            .insert_voucher(VoucherType::Purchase, true, &stamp())
            .await
            .unwrap();
        tx.rollback().await;

        assert!(store.get_voucher(id).await.unwrap().is_none());
    }
}
