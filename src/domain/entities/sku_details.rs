use crate::{data::models::sku_details_model::SkuDetailsModel, errors::BillingError};

use super::item_type::ItemType;

/// Catalog metadata for a single product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuDetails {
    item_type: ItemType,
    sku: String,
    price: String,
    title: String,
    description: String,
    price_amount_micros: Option<i64>,
    price_currency_code: Option<String>,
    raw_json: String,
}

impl SkuDetails {
    /// `item_type` is used when the JSON does not carry its own `type`.
    pub fn parse(item_type: ItemType, raw_json: impl Into<String>) -> Result<Self, BillingError> {
        let raw_json = raw_json.into();
        let model: SkuDetailsModel = serde_json::from_str(&raw_json)
            .map_err(|e| BillingError::BadResponse(format!("invalid sku details: {e}")))?;
        let item_type = match model.item_type.as_deref() {
            Some(t) => t.parse().unwrap_or(item_type),
            None => item_type,
        };
        Ok(Self {
            item_type,
            sku: model.product_id.unwrap_or_default(),
            price: model.price.unwrap_or_default(),
            title: model.title.unwrap_or_default(),
            description: model.description.unwrap_or_default(),
            price_amount_micros: model.price_amount_micros,
            price_currency_code: model.price_currency_code,
            raw_json,
        })
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price_amount_micros(&self) -> Option<i64> {
        self.price_amount_micros
    }

    pub fn price_currency_code(&self) -> Option<&str> {
        self.price_currency_code.as_deref()
    }

    pub fn raw_json(&self) -> &str {
        &self.raw_json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalog_entry() {
        let json = r#"{"productId":"gas","type":"inapp","price":"1,000 Toman","title":"Gas","description":"Fill the tank","price_amount_micros":10000000000,"price_currency_code":"IRR"}"#;
        let details = SkuDetails::parse(ItemType::Subs, json).unwrap();
        assert_eq!(details.sku(), "gas");
        assert_eq!(details.item_type(), ItemType::Inapp);
        assert_eq!(details.price(), "1,000 Toman");
        assert_eq!(details.price_amount_micros(), Some(10_000_000_000));
        assert_eq!(details.price_currency_code(), Some("IRR"));
    }
}
