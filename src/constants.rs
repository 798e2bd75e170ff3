use std::time::Duration;

pub const DEFAULT_API_VERSION: i32 = 3;
pub const DEFAULT_CONSUME_TIMEOUT: Duration = Duration::from_secs(60);

/// The store rejects detail queries with more items than this.
pub const SKU_DETAILS_BATCH_SIZE: usize = 20;

// Bundle keys shared by both transports.
pub const RESPONSE_CODE: &str = "RESPONSE_CODE";
pub const RESPONSE_BUY_INTENT: &str = "BUY_INTENT";
pub const RESPONSE_GET_SKU_DETAILS_LIST: &str = "DETAILS_LIST";
pub const RESPONSE_INAPP_ITEM_LIST: &str = "INAPP_PURCHASE_ITEM_LIST";
pub const RESPONSE_INAPP_PURCHASE_DATA_LIST: &str = "INAPP_PURCHASE_DATA_LIST";
pub const RESPONSE_INAPP_SIGNATURE_LIST: &str = "INAPP_DATA_SIGNATURE_LIST";
pub const INAPP_CONTINUATION_TOKEN: &str = "INAPP_CONTINUATION_TOKEN";
pub const RESPONSE_INAPP_PURCHASE_DATA: &str = "INAPP_PURCHASE_DATA";
pub const RESPONSE_INAPP_SIGNATURE: &str = "INAPP_DATA_SIGNATURE";
pub const GET_SKU_DETAILS_ITEM_LIST: &str = "ITEM_ID_LIST";
pub const INTENT_V2_SUPPORT: &str = "INTENT_V2_SUPPORT";

// Broadcast extras.
pub const PACKAGE_NAME_KEY: &str = "packageName";
pub const API_VERSION_KEY: &str = "apiVersion";
pub const SUBSCRIPTION_SUPPORT_KEY: &str = "subscriptionSupport";
pub const SKU_KEY: &str = "sku";
pub const ITEM_TYPE_KEY: &str = "itemType";
pub const DEVELOPER_PAYLOAD_KEY: &str = "developerPayload";
pub const TOKEN_KEY: &str = "token";

/// Suffix the store appends to the action of every reply.
pub const REPLY_SUFFIX: &str = ".iab";

/// MD5 of `ir.mservices.market`.
pub const MYKET_PACKAGE_DIGEST: &str = "3c97c0b07a6f4a0d1ae1cf8816396560";
pub const MYKET_MIN_BROADCAST_VERSION: i64 = 900;
/// MD5 of `com.farsitel.bazaar`.
pub const BAZAAR_PACKAGE_DIGEST: &str = "6c02ea10518a07556a7b44e930478cb9";
pub const BAZAAR_MIN_BROADCAST_VERSION: i64 = 801301;

pub const BAZAAR_PACKAGE: &str = "com.farsitel.bazaar";
pub const BAZAAR_BIND_ADDRESS: &str = "ir.cafebazaar.pardakht.InAppBillingService.BIND";
pub const MYKET_PACKAGE: &str = "ir.mservices.market";
pub const MYKET_BIND_ADDRESS: &str = "ir.mservices.market.InAppBillingService.BIND";
