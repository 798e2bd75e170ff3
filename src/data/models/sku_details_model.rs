use serde::Deserialize;

/// Catalog entry JSON, one per element of the store's `DETAILS_LIST`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SkuDetailsModel {
    pub(crate) product_id: Option<String>,
    #[serde(rename = "type")]
    pub(crate) item_type: Option<String>,
    /// Formatted price including currency sign.
    pub(crate) price: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    #[serde(rename = "price_amount_micros")]
    pub(crate) price_amount_micros: Option<i64>,
    #[serde(rename = "price_currency_code")]
    pub(crate) price_currency_code: Option<String>,
}
