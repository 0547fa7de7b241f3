//! Purchase workflow engine: create, update, void, and delete operations
//! over the purchase record store, with double-entry ledger posting

use bigdecimal::BigDecimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::purchase::dues::AgingQuery;
use crate::purchase::ledger_map::{LedgerMap, PURCHASE_SLUG};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation;

/// Orchestrates purchase operations against the store, the ledger map,
/// and the external collaborators. Every write operation runs as one
/// atomic transaction; domain events fire only after commit.
pub struct PurchaseEngine<S: PurchaseStore + Clone> {
    store: S,
    dues: AgingQuery<S>,
    ledger_map: Arc<LedgerMap>,
    vendors: Arc<dyn VendorDirectory>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    actor: Arc<dyn ActorProvider>,
}

enum UpdateOutcome {
    Corrected(VoucherNo),
    Superseded {
        original: VoucherNo,
        contra: VoucherNo,
        replacement: VoucherNo,
    },
}

impl<S: PurchaseStore + Clone> PurchaseEngine<S> {
    /// Create an engine with the standard ledger map and default
    /// collaborators (system clock, fixed actor 0, no event sink)
    pub fn new(store: S, vendors: Arc<dyn VendorDirectory>) -> Self {
        Self::with_collaborators(
            store,
            vendors,
            Arc::new(LedgerMap::standard()),
            Arc::new(NullEventSink),
            Arc::new(SystemClock),
            Arc::new(FixedActor(0)),
        )
    }

    /// Create an engine with explicit collaborators
    pub fn with_collaborators(
        store: S,
        vendors: Arc<dyn VendorDirectory>,
        ledger_map: Arc<LedgerMap>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        actor: Arc<dyn ActorProvider>,
    ) -> Self {
        Self {
            dues: AgingQuery::new(store.clone()),
            store,
            ledger_map,
            vendors,
            events,
            clock,
            actor,
        }
    }

    /// Record a new purchase bill or order
    ///
    /// Validates the input, allocates a voucher, persists the bill and its
    /// line items, and, unless the bill is an order or draft, posts one
    /// accounts-payable credit and one general-ledger debit for the bill
    /// amount. All writes commit atomically or not at all.
    pub async fn create_purchase(&self, input: PurchaseInput) -> PurchaseResult<PurchaseView> {
        validation::validate_purchase_input(&input)?;
        let vendor_name = self.resolve_vendor_name(input.vendor_id).await?;

        let mut tx = self.store.begin().await?;
        let voucher_no = match self
            .insert_purchase_tx(tx.as_mut(), &input, &vendor_name)
            .await
        {
            Ok(voucher_no) => voucher_no,
            Err(err) => {
                tx.rollback().await;
                return Err(err);
            }
        };
        tx.commit().await?;

        let view = self.fetch_view(voucher_no).await?;
        self.events.emit(&PurchaseEvent::Created {
            event_id: Uuid::new_v4(),
            voucher_no,
            vendor_id: view.bill.vendor_id,
            amount: view.bill.amount.clone(),
            purchase_order: view.bill.purchase_order,
        });
        tracing::info!(
            voucher_no,
            amount = %view.bill.amount,
            posted = view.bill.posts_to_ledger(),
            "purchase recorded"
        );
        Ok(view)
    }

    /// Update a purchase bill
    ///
    /// Orders and drafts are corrected in place: header fields are
    /// rewritten and the line items replaced wholesale; nothing was posted,
    /// so there is nothing to reverse. A posted bill is financially closed
    /// for direct editing: the original voucher is frozen, a contra voucher
    /// duplicates the bill for the audit trail, the sub-ledger entry and
    /// ledger posting are balanced out, and the caller's new data is
    /// recorded as a fresh bill, all inside one transaction.
    pub async fn update_purchase(
        &self,
        voucher_no: VoucherNo,
        input: PurchaseInput,
    ) -> PurchaseResult<PurchaseView> {
        validation::validate_purchase_input(&input)?;
        let vendor_name = self.resolve_vendor_name(input.vendor_id).await?;

        let mut tx = self.store.begin().await?;
        let outcome = match self
            .update_purchase_tx(tx.as_mut(), voucher_no, &input, &vendor_name)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                tx.rollback().await;
                return Err(err);
            }
        };
        tx.commit().await?;

        match outcome {
            UpdateOutcome::Corrected(voucher_no) => {
                self.events.emit(&PurchaseEvent::Corrected {
                    event_id: Uuid::new_v4(),
                    voucher_no,
                });
                tracing::info!(voucher_no, "purchase corrected in place");
                self.fetch_view(voucher_no).await
            }
            UpdateOutcome::Superseded {
                original,
                contra,
                replacement,
            } => {
                self.events.emit(&PurchaseEvent::Superseded {
                    event_id: Uuid::new_v4(),
                    original_no: original,
                    contra_no: contra,
                    replacement_no: replacement,
                });
                tracing::info!(
                    original,
                    contra,
                    replacement,
                    "posted purchase superseded by contra entry"
                );
                self.fetch_view(replacement).await
            }
        }
    }

    /// Mark a bill void. A status marker for reporting, not a reversal;
    /// voiding twice yields the same terminal state.
    pub async fn void_purchase(&self, voucher_no: VoucherNo) -> PurchaseResult<()> {
        let mut tx = self.store.begin().await?;

        let bill = match tx.get_purchase(voucher_no).await {
            Ok(Some(bill)) => bill,
            Ok(None) => {
                tx.rollback().await;
                return Err(PurchaseError::NotFound(voucher_no));
            }
            Err(err) => {
                tx.rollback().await;
                return Err(err);
            }
        };

        if bill.status == PurchaseStatus::Void {
            tx.rollback().await;
            return Ok(());
        }

        let now = self.clock.now();
        let actor = self.actor.current_actor();
        if let Err(err) = tx
            .set_purchase_status(&[voucher_no], PurchaseStatus::Void, now, actor)
            .await
        {
            tx.rollback().await;
            return Err(err);
        }
        tx.commit().await?;

        self.events.emit(&PurchaseEvent::Voided {
            event_id: Uuid::new_v4(),
            voucher_no,
        });
        tracing::info!(voucher_no, "purchase voided");
        Ok(())
    }

    /// Remove the bill's accounts-payable entries. An administrative
    /// correction of sub-ledger noise: the bill, its line items, and the
    /// general-ledger history stay untouched, and deleting a bill with no
    /// entries succeeds as a no-op.
    pub async fn delete_purchase(&self, voucher_no: VoucherNo) -> PurchaseResult<()> {
        let mut tx = self.store.begin().await?;
        if let Err(err) = tx.delete_ap_entries(voucher_no).await {
            tx.rollback().await;
            return Err(err);
        }
        tx.commit().await?;

        tracing::debug!(voucher_no, "sub-ledger entries deleted");
        Ok(())
    }

    /// Fetch one purchase with its line items and outstanding due
    pub async fn get_purchase(&self, voucher_no: VoucherNo) -> PurchaseResult<PurchaseView> {
        self.fetch_view(voucher_no).await
    }

    /// List purchase bills matching a filter
    pub async fn list_purchases(
        &self,
        filter: &PurchaseFilter,
        page: &Pagination,
    ) -> PurchaseResult<Vec<PurchaseBill>> {
        self.store.list_purchases(filter, page).await
    }

    /// Count purchase bills matching a filter
    pub async fn count_purchases(&self, filter: &PurchaseFilter) -> PurchaseResult<usize> {
        self.store.count_purchases(filter).await
    }

    /// Outstanding due of one bill
    pub async fn get_due(&self, voucher_no: VoucherNo) -> PurchaseResult<BigDecimal> {
        self.dues.get_due(voucher_no).await
    }

    /// Bills of a vendor with outstanding dues
    pub async fn list_dues_by_vendor(
        &self,
        vendor_id: VendorId,
        page: &Pagination,
    ) -> PurchaseResult<Vec<PurchaseBill>> {
        self.dues.dues_by_vendor(vendor_id, page).await
    }

    async fn resolve_vendor_name(&self, vendor_id: VendorId) -> PurchaseResult<String> {
        match self.vendors.resolve_vendor(vendor_id).await? {
            Some(profile) => Ok(profile.full_name()),
            None => Err(PurchaseError::Validation(format!(
                "Vendor {vendor_id} could not be resolved"
            ))),
        }
    }

    /// The create path, shared with the contra branch of update
    async fn insert_purchase_tx(
        &self,
        tx: &mut dyn StoreTx,
        input: &PurchaseInput,
        vendor_name: &str,
    ) -> PurchaseResult<VoucherNo> {
        let now = self.clock.now();
        let actor = self.actor.current_actor();
        let stamp = AuditStamp::new(now, actor);

        let voucher_no = tx
            .insert_voucher(VoucherType::Purchase, true, &stamp)
            .await?;
        let amount = input.bill_amount();

        let bill = PurchaseBill {
            voucher_no,
            vendor_id: input.vendor_id,
            vendor_name: vendor_name.to_string(),
            trn_date: input.trn_date.unwrap_or_else(|| now.date()),
            due_date: input.due_date.unwrap_or_else(|| now.date()),
            amount: amount.clone(),
            ref_no: input.ref_no.clone(),
            status: input.status,
            purchase_order: input.purchase_order,
            attachments: input.attachments.clone(),
            particulars: input.particulars.clone(),
            audit: stamp.clone(),
        };
        tx.insert_purchase(&bill).await?;

        let items = build_line_items(voucher_no, &input.line_items, &stamp);
        tx.replace_line_items(voucher_no, &items).await?;

        // orders and drafts are not financial commitments yet
        if !bill.posts_to_ledger() {
            return Ok(voucher_no);
        }

        tx.insert_ap_entry(&ApEntry {
            purchase_no: voucher_no,
            trn_no: voucher_no,
            trn_date: bill.trn_date,
            particulars: bill.particulars.clone(),
            debit: BigDecimal::from(0),
            credit: amount.clone(),
            audit: stamp.clone(),
        })
        .await?;

        let ledger_id = self.ledger_map.require(PURCHASE_SLUG)?;
        tx.insert_posting(&LedgerPosting {
            ledger_id,
            trn_no: voucher_no,
            particulars: bill.particulars.clone(),
            debit: amount,
            credit: BigDecimal::from(0),
            trn_date: bill.trn_date,
            audit: stamp,
        })
        .await?;

        Ok(voucher_no)
    }

    async fn update_purchase_tx(
        &self,
        tx: &mut dyn StoreTx,
        voucher_no: VoucherNo,
        input: &PurchaseInput,
        vendor_name: &str,
    ) -> PurchaseResult<UpdateOutcome> {
        let existing = tx
            .get_purchase(voucher_no)
            .await?
            .ok_or(PurchaseError::NotFound(voucher_no))?;
        let voucher = tx
            .get_voucher(voucher_no)
            .await?
            .ok_or(PurchaseError::NotFound(voucher_no))?;

        if !voucher.editable {
            return Err(PurchaseError::Validation(format!(
                "Voucher #{voucher_no} was superseded by a contra entry and is no longer editable"
            )));
        }

        let now = self.clock.now();
        let actor = self.actor.current_actor();

        if !existing.posts_to_ledger() {
            let mut stamp = existing.audit.clone();
            stamp.touch(now, actor);

            let bill = PurchaseBill {
                voucher_no,
                vendor_id: input.vendor_id,
                vendor_name: vendor_name.to_string(),
                trn_date: input.trn_date.unwrap_or(existing.trn_date),
                due_date: input.due_date.unwrap_or(existing.due_date),
                amount: input.bill_amount(),
                ref_no: input.ref_no.clone(),
                status: input.status,
                purchase_order: input.purchase_order,
                attachments: input.attachments.clone(),
                particulars: input.particulars.clone(),
                audit: stamp.clone(),
            };
            tx.update_purchase(&bill).await?;

            let items = build_line_items(voucher_no, &input.line_items, &stamp);
            tx.replace_line_items(voucher_no, &items).await?;

            return Ok(UpdateOutcome::Corrected(voucher_no));
        }

        // void old, fully create new: the posted bill is frozen behind a
        // contra duplicate and the caller's data becomes a fresh bill
        let stamp = AuditStamp::new(now, actor);
        tx.set_voucher_editable(voucher_no, false).await?;

        let contra_no = tx
            .insert_voucher(VoucherType::Purchase, false, &stamp)
            .await?;
        let contra_particulars = format!("Contra entry for voucher #{voucher_no}");
        tx.clone_bill_as_contra(voucher_no, contra_no, &contra_particulars, &stamp)
            .await?;

        let mut contra_items = tx.get_line_items(voucher_no).await?;
        for item in &mut contra_items {
            item.trn_no = contra_no;
            item.audit = stamp.clone();
        }
        tx.replace_line_items(contra_no, &contra_items).await?;

        tx.set_purchase_status(&[voucher_no, contra_no], PurchaseStatus::Closed, now, actor)
            .await?;

        tx.settle_ap_entry(
            voucher_no,
            contra_no,
            existing.amount.clone(),
            existing.trn_date,
            &contra_particulars,
            now,
            actor,
        )
        .await?;

        tx.apply_posting_credit(
            voucher_no,
            existing.amount.clone(),
            &contra_particulars,
            now,
            actor,
        )
        .await?;

        let replacement = self.insert_purchase_tx(tx, input, vendor_name).await?;

        Ok(UpdateOutcome::Superseded {
            original: voucher_no,
            contra: contra_no,
            replacement,
        })
    }

    async fn fetch_view(&self, voucher_no: VoucherNo) -> PurchaseResult<PurchaseView> {
        let bill = self
            .store
            .get_purchase(voucher_no)
            .await?
            .ok_or(PurchaseError::NotFound(voucher_no))?;
        let voucher = self.store.get_voucher(voucher_no).await?;
        let line_items = self.store.get_line_items(voucher_no).await?;
        let entries = self.store.get_ap_entries(voucher_no).await?;
        let total_due: BigDecimal = entries
            .iter()
            .map(|entry| &entry.credit - &entry.debit)
            .sum();

        Ok(PurchaseView {
            bill,
            editable: voucher.map(|v| v.editable).unwrap_or(false),
            line_items,
            total_due,
        })
    }
}

fn build_line_items(
    trn_no: VoucherNo,
    inputs: &[LineItemInput],
    stamp: &AuditStamp,
) -> Vec<PurchaseLineItem> {
    inputs
        .iter()
        .map(|item| PurchaseLineItem {
            trn_no,
            product_id: item.product_id,
            qty: item.qty.clone(),
            unit_price: item.unit_price.clone(),
            amount: item.line_total(),
            audit: stamp.clone(),
        })
        .collect()
}
