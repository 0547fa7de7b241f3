//! # Payables Core
//!
//! A purchasing and accounts-payable engine with double-entry ledger
//! posting, contra-entry audit trails, and vendor due tracking.
//!
//! ## Features
//!
//! - **Purchase workflow**: create, update, void, and delete purchase
//!   bills and purchase orders through one atomic transaction per operation
//! - **Double-entry posting**: posted bills write a balancing
//!   accounts-payable credit and general-ledger debit automatically
//! - **Contra-entry edits**: editing a posted bill never rewrites history;
//!   the original is frozen behind a contra duplicate and reissued
//! - **Due tracking**: per-bill and per-vendor outstanding payables
//!   aggregated from the sub-ledger
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage and an in-memory backend for tests and development
//!
//! ## Quick Start
//!
//! ```rust
//! use payables_core::utils::{MemoryStore, MemoryVendorDirectory};
//! use payables_core::{PurchaseEngine, PurchaseInput, PurchaseStatus, LineItemInput};
//! use bigdecimal::BigDecimal;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), payables_core::PurchaseError> {
//! let vendors = MemoryVendorDirectory::new();
//! vendors.insert(7, "Acme", "Traders");
//! let engine = PurchaseEngine::new(MemoryStore::new(), Arc::new(vendors));
//!
//! let bill = engine
//!     .create_purchase(PurchaseInput {
//!         vendor_id: 7,
//!         trn_date: None,
//!         due_date: None,
//!         amount: None,
//!         ref_no: None,
//!         status: PurchaseStatus::Posted,
//!         purchase_order: false,
//!         attachments: vec![],
//!         particulars: "Stock replenishment".to_string(),
//!         line_items: vec![LineItemInput {
//!             product_id: 11,
//!             qty: BigDecimal::from(4),
//!             unit_price: BigDecimal::from(250),
//!         }],
//!     })
//!     .await?;
//!
//! assert_eq!(engine.get_due(bill.bill.voucher_no).await?, BigDecimal::from(1000));
//! # Ok(())
//! # }
//! ```

pub mod purchase;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use purchase::*;
pub use traits::*;
pub use types::*;
