//! Resolution of symbolic ledger slugs to general-ledger account ids

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::types::{LedgerId, PurchaseError, PurchaseResult};

/// Slug of the purchase expense ledger
pub const PURCHASE_SLUG: &str = "purchase";
/// Slug of the sales revenue ledger
pub const SALES_SLUG: &str = "sales";
/// Slug of the accounts-payable control ledger
pub const ACCOUNTS_PAYABLE_SLUG: &str = "accounts-payable";

/// Shared mapping from domain-meaningful slugs to numeric ledger ids
///
/// Built once from the chart of accounts and read on every posting.
/// Readers resolve against an `Arc` snapshot of the whole map;
/// [`reload`](LedgerMap::reload) swaps in a complete replacement, so a
/// reader never observes a partially rebuilt mapping.
pub struct LedgerMap {
    map: RwLock<Arc<HashMap<String, LedgerId>>>,
}

impl LedgerMap {
    /// Build a map from explicit slug/ledger-id pairs
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, LedgerId)>,
    {
        Self {
            map: RwLock::new(Arc::new(entries.into_iter().collect())),
        }
    }

    /// The standard chart mapping for the ledgers this crate posts against
    pub fn standard() -> Self {
        Self::new([
            (ACCOUNTS_PAYABLE_SLUG.to_string(), 2000),
            (SALES_SLUG.to_string(), 4000),
            (PURCHASE_SLUG.to_string(), 5000),
        ])
    }

    /// Resolve a slug to its ledger id
    pub fn resolve(&self, slug: &str) -> Option<LedgerId> {
        self.map.read().unwrap().get(slug).copied()
    }

    /// Resolve a slug, failing with a configuration error when the chart
    /// of accounts has no ledger for it
    pub fn require(&self, slug: &str) -> PurchaseResult<LedgerId> {
        self.resolve(slug).ok_or_else(|| {
            PurchaseError::Configuration(format!("no ledger id mapped for slug '{slug}'"))
        })
    }

    /// Replace the whole mapping, e.g. after a chart-of-accounts edit.
    /// In-flight readers keep the snapshot they already resolved against.
    pub fn reload<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, LedgerId)>,
    {
        let next: HashMap<String, LedgerId> = entries.into_iter().collect();
        *self.map.write().unwrap() = Arc::new(next);
        tracing::debug!("ledger map reloaded");
    }
}

impl Default for LedgerMap {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_map_resolves_purchase() {
        let map = LedgerMap::standard();
        assert_eq!(map.resolve(PURCHASE_SLUG), Some(5000));
        assert_eq!(map.resolve(ACCOUNTS_PAYABLE_SLUG), Some(2000));
        assert_eq!(map.resolve("no-such-ledger"), None);
    }

    #[test]
    fn test_require_reports_configuration_error() {
        let map = LedgerMap::new([(SALES_SLUG.to_string(), 4000)]);
        let err = map.require(PURCHASE_SLUG).unwrap_err();
        assert!(matches!(err, PurchaseError::Configuration(_)));
    }

    #[test]
    fn test_reload_swaps_whole_mapping() {
        let map = LedgerMap::standard();
        map.reload([(PURCHASE_SLUG.to_string(), 5100)]);

        assert_eq!(map.resolve(PURCHASE_SLUG), Some(5100));
        // entries absent from the replacement are gone, not merged
        assert_eq!(map.resolve(SALES_SLUG), None);
    }
}
