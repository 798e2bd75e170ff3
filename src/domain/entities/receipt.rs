use chrono::{DateTime, Utc};

use crate::{
    data::models::purchase_data_model::{PurchaseDataModel, PurchaseState},
    errors::BillingError,
};

use super::item_type::ItemType;

/// A purchase as reported by the store.
///
/// Receipts are only ever created by parsing the store's signed purchase data
/// and are immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    item_type: ItemType,
    order_id: Option<String>,
    package_name: Option<String>,
    sku: String,
    purchase_time: Option<DateTime<Utc>>,
    purchase_state: Option<PurchaseState>,
    developer_payload: String,
    token: String,
    raw_json: String,
    signature: String,
}

impl Receipt {
    /// Parses the store's purchase data JSON. The token is read from
    /// `token`, falling back to `purchaseToken`.
    pub fn parse(
        item_type: ItemType,
        raw_json: impl Into<String>,
        signature: impl Into<String>,
    ) -> Result<Self, BillingError> {
        let raw_json = raw_json.into();
        let model: PurchaseDataModel = serde_json::from_str(&raw_json)
            .map_err(|e| BillingError::BadResponse(format!("invalid purchase data: {e}")))?;
        let token = model
            .token
            .filter(|t| !t.is_empty())
            .or(model.purchase_token)
            .unwrap_or_default();
        Ok(Self {
            item_type,
            order_id: model.order_id,
            package_name: model.package_name,
            sku: model.product_id.unwrap_or_default(),
            purchase_time: model.purchase_time,
            purchase_state: model.purchase_state,
            developer_payload: model.developer_payload.unwrap_or_default(),
            token,
            raw_json,
            signature: signature.into(),
        })
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    pub fn package_name(&self) -> Option<&str> {
        self.package_name.as_deref()
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn purchase_time(&self) -> Option<DateTime<Utc>> {
        self.purchase_time
    }

    pub fn purchase_state(&self) -> Option<PurchaseState> {
        self.purchase_state
    }

    pub fn developer_payload(&self) -> &str {
        &self.developer_payload
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The purchase data exactly as the store signed it.
    pub fn raw_json(&self) -> &str {
        &self.raw_json
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Only receipts carrying a purchase token can be consumed.
    pub fn is_consumable(&self) -> bool {
        !self.token.is_empty()
    }
}
