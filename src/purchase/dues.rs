//! Read-only due and aging queries over the purchase record store

use bigdecimal::BigDecimal;

use crate::traits::PurchaseStore;
use crate::types::*;

/// Aggregates outstanding payables from the accounts-payable sub-ledger.
/// This component never writes.
pub struct AgingQuery<S: PurchaseStore> {
    store: S,
}

impl<S: PurchaseStore> AgingQuery<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Outstanding due of one bill: `credit - debit` summed over its
    /// sub-ledger entries. Orders and drafts carry no entries and owe 0.
    pub async fn get_due(&self, purchase_no: VoucherNo) -> PurchaseResult<BigDecimal> {
        if self.store.get_purchase(purchase_no).await?.is_none() {
            return Err(PurchaseError::NotFound(purchase_no));
        }

        let entries = self.store.get_ap_entries(purchase_no).await?;
        Ok(sum_due(&entries))
    }

    /// Bills of a vendor with a non-zero sub-ledger balance, excluding
    /// purchase orders and draft/void bills, ordered and paginated
    pub async fn dues_by_vendor(
        &self,
        vendor_id: VendorId,
        page: &Pagination,
    ) -> PurchaseResult<Vec<PurchaseBill>> {
        let filter = PurchaseFilter {
            vendor_id: Some(vendor_id),
            ..PurchaseFilter::default()
        };
        // fetch the vendor's bills unpaged; the due filter applies before
        // pagination, like the original HAVING clause
        let unpaged = Pagination {
            limit: usize::MAX,
            offset: 0,
            ..page.clone()
        };
        let bills = self.store.list_purchases(&filter, &unpaged).await?;

        let mut open = Vec::new();
        for bill in bills {
            if bill.purchase_order
                || bill.status == PurchaseStatus::Draft
                || bill.status == PurchaseStatus::Void
            {
                continue;
            }
            let entries = self.store.get_ap_entries(bill.voucher_no).await?;
            if sum_due(&entries) != BigDecimal::from(0) {
                open.push(bill);
            }
        }

        Ok(open
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect())
    }
}

fn sum_due(entries: &[ApEntry]) -> BigDecimal {
    entries
        .iter()
        .map(|entry| &entry.credit - &entry.debit)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(debit: i64, credit: i64) -> ApEntry {
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        ApEntry {
            purchase_no: 1,
            trn_no: 1,
            trn_date: now.date(),
            particulars: String::new(),
            debit: BigDecimal::from(debit),
            credit: BigDecimal::from(credit),
            audit: AuditStamp::new(now, 1),
        }
    }

    #[test]
    fn test_sum_due_is_credit_minus_debit() {
        assert_eq!(sum_due(&[entry(0, 1000)]), BigDecimal::from(1000));
        assert_eq!(sum_due(&[entry(1000, 1000)]), BigDecimal::from(0));
        assert_eq!(sum_due(&[]), BigDecimal::from(0));
    }
}
