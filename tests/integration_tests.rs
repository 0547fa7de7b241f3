//! Integration tests for payables-core

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

use payables_core::utils::{MemoryStore, MemoryVendorDirectory, RecordingEventSink};
use payables_core::{
    Clock, FixedActor, LedgerMap, LineItemInput, OrderBy, OrderDirection, Pagination,
    PurchaseEngine, PurchaseError, PurchaseEvent, PurchaseFilter, PurchaseInput, PurchaseStatus,
    PurchaseStore,
};

struct FixedClock(NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

struct Fixture {
    store: MemoryStore,
    events: Arc<RecordingEventSink>,
    engine: PurchaseEngine<MemoryStore>,
}

fn fixture() -> Fixture {
    fixture_with_map(LedgerMap::standard())
}

fn fixture_with_map(map: LedgerMap) -> Fixture {
    let store = MemoryStore::new();
    let vendors = MemoryVendorDirectory::new();
    vendors.insert(7, "Acme", "Traders");
    vendors.insert(8, "Binford", "Tools");

    let events = Arc::new(RecordingEventSink::new());
    let engine = PurchaseEngine::with_collaborators(
        store.clone(),
        Arc::new(vendors),
        Arc::new(map),
        events.clone(),
        Arc::new(FixedClock(fixed_now())),
        Arc::new(FixedActor(42)),
    );

    Fixture {
        store,
        events,
        engine,
    }
}

fn input(vendor_id: u64, lines: &[(u64, i64, i64)]) -> PurchaseInput {
    PurchaseInput {
        vendor_id,
        trn_date: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        due_date: Some(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
        amount: None,
        ref_no: Some("INV-1001".to_string()),
        status: PurchaseStatus::Posted,
        purchase_order: false,
        attachments: vec![],
        particulars: "Stock replenishment".to_string(),
        line_items: lines
            .iter()
            .map(|(product_id, qty, unit_price)| LineItemInput {
                product_id: *product_id,
                qty: BigDecimal::from(*qty),
                unit_price: BigDecimal::from(*unit_price),
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_amount_is_sum_of_line_totals() {
    let fx = fixture();

    let view = fx
        .engine
        .create_purchase(input(7, &[(1, 2, 300), (2, 4, 100)]))
        .await
        .unwrap();

    assert_eq!(view.bill.amount, BigDecimal::from(1000));
    assert_eq!(view.line_items.len(), 2);
    assert_eq!(view.line_items[0].amount, BigDecimal::from(600));
    assert_eq!(view.line_items[1].amount, BigDecimal::from(400));

    let fetched = fx.engine.get_purchase(view.bill.voucher_no).await.unwrap();
    assert_eq!(fetched.bill.amount, BigDecimal::from(1000));
}

#[tokio::test]
async fn test_explicit_amount_wins_over_line_totals() {
    let fx = fixture();

    let mut purchase = input(7, &[(1, 2, 300)]);
    purchase.amount = Some(BigDecimal::from(750));

    let view = fx.engine.create_purchase(purchase).await.unwrap();
    assert_eq!(view.bill.amount, BigDecimal::from(750));
    // line totals are still recomputed from the multiplicands
    assert_eq!(view.line_items[0].amount, BigDecimal::from(600));
}

#[tokio::test]
async fn test_posted_purchase_writes_ap_entry_and_posting() {
    let fx = fixture();

    let mut purchase = input(7, &[]);
    purchase.amount = Some(BigDecimal::from(1000));
    let view = fx.engine.create_purchase(purchase).await.unwrap();
    let voucher_no = view.bill.voucher_no;

    let entries = fx.store.get_ap_entries(voucher_no).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].debit, BigDecimal::from(0));
    assert_eq!(entries[0].credit, BigDecimal::from(1000));

    let postings = fx.store.get_postings(voucher_no).await.unwrap();
    assert_eq!(postings.len(), 1);
    assert_eq!(postings[0].debit, BigDecimal::from(1000));
    assert_eq!(postings[0].credit, BigDecimal::from(0));

    // ledger postings net to the bill amount
    let net: BigDecimal = postings.iter().map(|p| &p.debit - &p.credit).sum();
    assert_eq!(net, view.bill.amount);

    assert_eq!(
        fx.engine.get_due(voucher_no).await.unwrap(),
        BigDecimal::from(1000)
    );
}

#[tokio::test]
async fn test_purchase_order_has_no_financial_footprint() {
    let fx = fixture();

    let mut order = input(7, &[]);
    order.amount = Some(BigDecimal::from(500));
    order.purchase_order = true;

    let view = fx.engine.create_purchase(order).await.unwrap();
    let voucher_no = view.bill.voucher_no;

    assert_eq!(
        fx.engine.get_due(voucher_no).await.unwrap(),
        BigDecimal::from(0)
    );
    assert!(fx.store.get_ap_entries(voucher_no).await.unwrap().is_empty());
    assert!(fx.store.get_postings(voucher_no).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_draft_does_not_post() {
    let fx = fixture();

    let mut draft = input(7, &[(1, 1, 400)]);
    draft.status = PurchaseStatus::Draft;

    let view = fx.engine.create_purchase(draft).await.unwrap();
    assert!(fx
        .store
        .get_postings(view.bill.voucher_no)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(view.total_due, BigDecimal::from(0));
}

#[tokio::test]
async fn test_draft_update_corrects_in_place() {
    let fx = fixture();

    let mut draft = input(7, &[(1, 2, 100), (2, 1, 50)]);
    draft.status = PurchaseStatus::Draft;
    let view = fx.engine.create_purchase(draft).await.unwrap();
    let voucher_no = view.bill.voucher_no;

    let updated = fx
        .engine
        .update_purchase(voucher_no, {
            let mut next = input(7, &[(3, 1, 900)]);
            next.status = PurchaseStatus::Draft;
            next
        })
        .await
        .unwrap();

    // same voucher, replaced line items, still nothing posted
    assert_eq!(updated.bill.voucher_no, voucher_no);
    assert_eq!(updated.bill.amount, BigDecimal::from(900));
    assert_eq!(updated.line_items.len(), 1);
    assert_eq!(updated.line_items[0].product_id, 3);
    assert!(fx.store.get_postings(voucher_no).await.unwrap().is_empty());

    let count = fx
        .engine
        .count_purchases(&PurchaseFilter::default())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_updating_posted_purchase_supersedes_with_contra() {
    let fx = fixture();

    let original = fx
        .engine
        .create_purchase(input(7, &[(1, 4, 250)]))
        .await
        .unwrap();
    let original_no = original.bill.voucher_no;
    assert_eq!(original.bill.amount, BigDecimal::from(1000));

    let replacement = fx
        .engine
        .update_purchase(original_no, input(7, &[(1, 4, 300)]))
        .await
        .unwrap();
    let replacement_no = replacement.bill.voucher_no;
    assert_ne!(replacement_no, original_no);
    assert_eq!(replacement.bill.amount, BigDecimal::from(1200));
    assert_eq!(replacement.total_due, BigDecimal::from(1200));

    // the original voucher is frozen and its bill closed
    let frozen = fx.engine.get_purchase(original_no).await.unwrap();
    assert!(!frozen.editable);
    assert_eq!(frozen.bill.status, PurchaseStatus::Closed);
    assert_eq!(frozen.total_due, BigDecimal::from(0));

    // exactly one contra voucher sits between original and replacement
    let contra_no = original_no + 1;
    assert_eq!(replacement_no, contra_no + 1);
    let contra = fx.engine.get_purchase(contra_no).await.unwrap();
    assert!(!contra.editable);
    assert_eq!(contra.bill.status, PurchaseStatus::Closed);
    assert_eq!(contra.bill.amount, BigDecimal::from(1000));
    assert_eq!(
        contra.bill.particulars,
        format!("Contra entry for voucher #{original_no}")
    );
    assert_eq!(contra.line_items.len(), 1);

    // the original transaction's postings net to zero; the corrected
    // amount lives on the replacement's posting
    let original_postings = fx.store.get_postings(original_no).await.unwrap();
    assert_eq!(original_postings.len(), 1);
    let original_net: BigDecimal = original_postings.iter().map(|p| &p.debit - &p.credit).sum();
    assert_eq!(original_net, BigDecimal::from(0));

    let replacement_postings = fx.store.get_postings(replacement_no).await.unwrap();
    let replacement_net: BigDecimal = replacement_postings
        .iter()
        .map(|p| &p.debit - &p.credit)
        .sum();
    assert_eq!(replacement_net, BigDecimal::from(1200));

    // aggregate vendor due reflects only the corrected amount
    let open = fx
        .engine
        .list_dues_by_vendor(7, &Pagination::default())
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].voucher_no, replacement_no);
}

#[tokio::test]
async fn test_superseded_voucher_rejects_further_edits() {
    let fx = fixture();

    let original = fx
        .engine
        .create_purchase(input(7, &[(1, 1, 100)]))
        .await
        .unwrap();
    fx.engine
        .update_purchase(original.bill.voucher_no, input(7, &[(1, 1, 150)]))
        .await
        .unwrap();

    let err = fx
        .engine
        .update_purchase(original.bill.voucher_no, input(7, &[(1, 1, 200)]))
        .await
        .unwrap_err();
    assert!(matches!(err, PurchaseError::Validation(_)));
}

#[tokio::test]
async fn test_void_is_idempotent() {
    let fx = fixture();

    let view = fx
        .engine
        .create_purchase(input(7, &[(1, 1, 100)]))
        .await
        .unwrap();
    let voucher_no = view.bill.voucher_no;

    fx.engine.void_purchase(voucher_no).await.unwrap();
    let first = fx.engine.get_purchase(voucher_no).await.unwrap();
    assert_eq!(first.bill.status, PurchaseStatus::Void);

    fx.engine.void_purchase(voucher_no).await.unwrap();
    let second = fx.engine.get_purchase(voucher_no).await.unwrap();
    assert_eq!(second.bill, first.bill);

    // voiding marks status only; postings are not reversed
    assert_eq!(fx.store.get_postings(voucher_no).await.unwrap().len(), 1);

    // voided bills drop out of the due listing
    let open = fx
        .engine
        .list_dues_by_vendor(7, &Pagination::default())
        .await
        .unwrap();
    assert!(open.is_empty());
}

#[tokio::test]
async fn test_void_unknown_bill_is_not_found() {
    let fx = fixture();
    let err = fx.engine.void_purchase(404).await.unwrap_err();
    assert!(matches!(err, PurchaseError::NotFound(404)));
}

#[tokio::test]
async fn test_delete_purchase_removes_only_sub_ledger_entries() {
    let fx = fixture();

    let view = fx
        .engine
        .create_purchase(input(7, &[(1, 2, 500)]))
        .await
        .unwrap();
    let voucher_no = view.bill.voucher_no;

    fx.engine.delete_purchase(voucher_no).await.unwrap();

    assert!(fx.store.get_ap_entries(voucher_no).await.unwrap().is_empty());
    assert_eq!(
        fx.engine.get_due(voucher_no).await.unwrap(),
        BigDecimal::from(0)
    );

    // the bill, its line items, and the ledger history survive
    let survivor = fx.engine.get_purchase(voucher_no).await.unwrap();
    assert_eq!(survivor.bill.amount, BigDecimal::from(1000));
    assert_eq!(survivor.line_items.len(), 1);
    assert_eq!(fx.store.get_postings(voucher_no).await.unwrap().len(), 1);

    // deleting again is a no-op
    fx.engine.delete_purchase(voucher_no).await.unwrap();
}

#[tokio::test]
async fn test_get_due_is_idempotent() {
    let fx = fixture();

    let view = fx
        .engine
        .create_purchase(input(7, &[(1, 3, 200)]))
        .await
        .unwrap();

    let first = fx.engine.get_due(view.bill.voucher_no).await.unwrap();
    let second = fx.engine.get_due(view.bill.voucher_no).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, BigDecimal::from(600));
}

#[tokio::test]
async fn test_missing_ledger_slug_rolls_back_everything() {
    // a chart of accounts with no ledger mapped for purchases
    let fx = fixture_with_map(LedgerMap::new([("sales".to_string(), 4000)]));

    let err = fx
        .engine
        .create_purchase(input(7, &[(1, 1, 100)]))
        .await
        .unwrap_err();
    assert!(matches!(err, PurchaseError::Configuration(_)));

    // no partial voucher, bill, or posting survives the rollback
    let count = fx
        .engine
        .count_purchases(&PurchaseFilter::default())
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert!(fx.store.get_voucher(1).await.unwrap().is_none());
    assert!(fx.events.events().is_empty());

    // drafts never touch the ledger map, so they still go through
    let mut draft = input(7, &[(1, 1, 100)]);
    draft.status = PurchaseStatus::Draft;
    fx.engine.create_purchase(draft).await.unwrap();
}

#[tokio::test]
async fn test_listing_filters_orders_and_paginates() {
    let fx = fixture();

    fx.engine
        .create_purchase(input(7, &[(1, 1, 100)]))
        .await
        .unwrap();
    fx.engine
        .create_purchase(input(8, &[(1, 1, 200)]))
        .await
        .unwrap();
    fx.engine
        .create_purchase(input(7, &[(1, 1, 300)]))
        .await
        .unwrap();

    let acme_only = PurchaseFilter {
        vendor_id: Some(7),
        ..PurchaseFilter::default()
    };
    let bills = fx
        .engine
        .list_purchases(&acme_only, &Pagination::default())
        .await
        .unwrap();
    assert_eq!(bills.len(), 2);
    // default ordering is voucher number, newest first
    assert!(bills[0].voucher_no > bills[1].voucher_no);

    let cheapest_first = Pagination {
        limit: 1,
        offset: 0,
        order_by: OrderBy::Amount,
        direction: OrderDirection::Asc,
    };
    let page = fx
        .engine
        .list_purchases(&PurchaseFilter::default(), &cheapest_first)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].amount, BigDecimal::from(100));
}

#[tokio::test]
async fn test_domain_events_fire_after_commit() {
    let fx = fixture();

    let view = fx
        .engine
        .create_purchase(input(7, &[(1, 4, 250)]))
        .await
        .unwrap();
    fx.engine
        .update_purchase(view.bill.voucher_no, input(7, &[(1, 4, 300)]))
        .await
        .unwrap();
    fx.engine.delete_purchase(view.bill.voucher_no).await.unwrap();

    let events = fx.events.events();
    // create -> Created, update -> Superseded, delete -> none
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[0],
        PurchaseEvent::Created { voucher_no, .. } if voucher_no == view.bill.voucher_no
    ));
    assert!(events
        .iter()
        .any(|event| matches!(event, PurchaseEvent::Superseded { .. })));
}

#[tokio::test]
async fn test_purchase_view_serializes_round_trip() {
    let fx = fixture();

    let view = fx
        .engine
        .create_purchase(input(7, &[(1, 2, 300)]))
        .await
        .unwrap();

    let json = serde_json::to_string(&view).unwrap();
    let parsed: payables_core::PurchaseView = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, view);
}
