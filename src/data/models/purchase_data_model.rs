use chrono::serde::ts_milliseconds_option;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_repr::Deserialize_repr;
use serde_with::{serde_as, DefaultOnError, DefaultOnNull, NoneAsEmptyString};

/// Purchase data JSON signed by the store and returned both in the purchase
/// result payload and in the owned-items list.
///
/// None of the fields are guaranteed by the store, so everything is optional
/// and defaults are applied by the receipt entity.
#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PurchaseDataModel {
    /// Unique order identifier for the transaction.
    #[serde_as(as = "DefaultOnNull<NoneAsEmptyString>")]
    #[serde(default)]
    pub(crate) order_id: Option<String>,
    /// The application package from which the purchase originated.
    pub(crate) package_name: Option<String>,
    /// The item's product identifier.
    pub(crate) product_id: Option<String>,
    /// The time the product was purchased, in milliseconds since the epoch.
    #[serde(default, with = "ts_milliseconds_option")]
    pub(crate) purchase_time: Option<DateTime<Utc>>,
    /// Unknown states are dropped rather than failing the whole receipt.
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub(crate) purchase_state: Option<PurchaseState>,
    /// The payload the developer passed when launching the purchase.
    pub(crate) developer_payload: Option<String>,
    pub(crate) token: Option<String>,
    /// Older store versions use this name for the token.
    pub(crate) purchase_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr)]
#[repr(u8)]
pub enum PurchaseState {
    Purchased = 0,
    Canceled = 1,
    Refunded = 2,
}
