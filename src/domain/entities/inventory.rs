use std::collections::BTreeMap;

use super::{item_type::ItemType, receipt::Receipt, sku_details::SkuDetails};

/// Snapshot of owned purchases and catalog details produced by one
/// inventory query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    purchases: BTreeMap<String, Receipt>,
    sku_details: BTreeMap<String, SkuDetails>,
}

impl Inventory {
    pub fn purchase(&self, sku: &str) -> Option<&Receipt> {
        self.purchases.get(sku)
    }

    pub fn sku_details(&self, sku: &str) -> Option<&SkuDetails> {
        self.sku_details.get(sku)
    }

    pub fn has_purchase(&self, sku: &str) -> bool {
        self.purchases.contains_key(sku)
    }

    pub fn has_details(&self, sku: &str) -> bool {
        self.sku_details.contains_key(sku)
    }

    pub fn all_owned_skus(&self) -> Vec<&str> {
        self.purchases.keys().map(String::as_str).collect()
    }

    pub fn all_owned_skus_of(&self, item_type: ItemType) -> Vec<&str> {
        self.purchases
            .values()
            .filter(|p| p.item_type() == item_type)
            .map(Receipt::sku)
            .collect()
    }

    pub fn all_purchases(&self) -> Vec<&Receipt> {
        self.purchases.values().collect()
    }

    pub(crate) fn add_purchase(&mut self, receipt: Receipt) {
        self.purchases.insert(receipt.sku().to_string(), receipt);
    }

    pub(crate) fn add_sku_details(&mut self, details: SkuDetails) {
        self.sku_details.insert(details.sku().to_string(), details);
    }
}
