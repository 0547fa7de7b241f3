//! Basic purchase workflow example

use bigdecimal::BigDecimal;
use std::sync::Arc;

use payables_core::utils::{MemoryStore, MemoryVendorDirectory};
use payables_core::{
    LineItemInput, Pagination, PurchaseEngine, PurchaseInput, PurchaseStatus,
};

fn bill_input(vendor_id: u64, lines: Vec<LineItemInput>) -> PurchaseInput {
    PurchaseInput {
        vendor_id,
        trn_date: None,
        due_date: None,
        amount: None,
        ref_no: Some("INV-2024-0042".to_string()),
        status: PurchaseStatus::Posted,
        purchase_order: false,
        attachments: vec![],
        particulars: "Monthly stock replenishment".to_string(),
        line_items: lines,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧾 Payables Core - Basic Purchase Example\n");

    // Wire the engine to an in-memory store and vendor directory
    let vendors = MemoryVendorDirectory::new();
    vendors.insert(7, "Acme", "Traders");
    let engine = PurchaseEngine::new(MemoryStore::new(), Arc::new(vendors));

    // 1. Record a posted purchase bill
    println!("💰 Recording a purchase bill...");
    let bill = engine
        .create_purchase(bill_input(
            7,
            vec![
                LineItemInput {
                    product_id: 11,
                    qty: BigDecimal::from(4),
                    unit_price: BigDecimal::from(250),
                },
                LineItemInput {
                    product_id: 12,
                    qty: BigDecimal::from(10),
                    unit_price: BigDecimal::from(35),
                },
            ],
        ))
        .await?;

    println!(
        "  ✓ Voucher #{} for {} ({} lines, total {})",
        bill.bill.voucher_no,
        bill.bill.vendor_name,
        bill.line_items.len(),
        bill.bill.amount
    );
    println!(
        "  ✓ Outstanding due: {}\n",
        engine.get_due(bill.bill.voucher_no).await?
    );

    // 2. Correct the bill; the original is preserved behind a contra entry
    println!("✏️  Correcting the posted bill (price change)...");
    let corrected = engine
        .update_purchase(
            bill.bill.voucher_no,
            bill_input(
                7,
                vec![LineItemInput {
                    product_id: 11,
                    qty: BigDecimal::from(4),
                    unit_price: BigDecimal::from(300),
                }],
            ),
        )
        .await?;

    println!(
        "  ✓ Replacement voucher #{} (amount {})",
        corrected.bill.voucher_no, corrected.bill.amount
    );
    let original = engine.get_purchase(bill.bill.voucher_no).await?;
    println!(
        "  ✓ Original voucher #{} is now {:?}, editable: {}\n",
        original.bill.voucher_no, original.bill.status, original.editable
    );

    // 3. Vendor due listing
    println!("📊 Open dues for vendor 7:");
    for open in engine.list_dues_by_vendor(7, &Pagination::default()).await? {
        println!(
            "  • Voucher #{}: {} due {}",
            open.voucher_no,
            open.amount,
            engine.get_due(open.voucher_no).await?
        );
    }

    Ok(())
}
