//! Typed views of store reply bundles. The field names are the keys in
//! [`crate::constants`]; the tests below keep the two in step.

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull, NoneAsEmptyString};

use crate::domain::entities::authorization_token::AuthorizationToken;

/// Reply to `get_purchases`: three parallel lists plus an optional
/// continuation token when more items are available.
#[serde_as]
#[derive(Debug, Deserialize)]
pub(crate) struct PurchasesResponseModel {
    #[serde(rename = "INAPP_PURCHASE_ITEM_LIST")]
    pub(crate) item_list: Vec<String>,
    #[serde(rename = "INAPP_PURCHASE_DATA_LIST")]
    pub(crate) purchase_data_list: Vec<String>,
    #[serde(rename = "INAPP_DATA_SIGNATURE_LIST")]
    pub(crate) signature_list: Vec<String>,
    #[serde_as(as = "DefaultOnNull<NoneAsEmptyString>")]
    #[serde(rename = "INAPP_CONTINUATION_TOKEN", default)]
    pub(crate) continuation_token: Option<String>,
}

/// Reply to `get_sku_details`.
#[derive(Debug, Deserialize)]
pub(crate) struct SkuDetailsResponseModel {
    #[serde(rename = "DETAILS_LIST")]
    pub(crate) details_list: Vec<String>,
}

/// Reply to a buy-intent request (bound service or broadcast).
#[derive(Debug, Deserialize)]
pub(crate) struct BuyIntentResponseModel {
    #[serde(rename = "BUY_INTENT")]
    pub(crate) buy_intent: AuthorizationToken,
}

/// Result payload the purchase screen hands back.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PurchaseResultModel {
    #[serde(rename = "INAPP_PURCHASE_DATA", default)]
    pub(crate) purchase_data: Option<String>,
    #[serde(rename = "INAPP_DATA_SIGNATURE", default)]
    pub(crate) data_signature: Option<String>,
}

/// Reply to the broadcast billing-support check.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct BillingSupportReplyModel {
    #[serde(rename = "subscriptionSupport", default)]
    pub(crate) subscription_support: bool,
}

/// Bound-service purchase configuration.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PurchaseConfigModel {
    #[serde(rename = "INTENT_V2_SUPPORT", default)]
    pub(crate) intent_v2_support: bool,
}
