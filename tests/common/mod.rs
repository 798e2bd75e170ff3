#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fractic_store_billing::{
    constants::{
        GET_SKU_DETAILS_ITEM_LIST, INAPP_CONTINUATION_TOKEN, INTENT_V2_SUPPORT, RESPONSE_BUY_INTENT,
        RESPONSE_CODE, RESPONSE_GET_SKU_DETAILS_LIST, RESPONSE_INAPP_ITEM_LIST,
        RESPONSE_INAPP_PURCHASE_DATA, RESPONSE_INAPP_PURCHASE_DATA_LIST,
        RESPONSE_INAPP_SIGNATURE, RESPONSE_INAPP_SIGNATURE_LIST, SUBSCRIPTION_SUPPORT_KEY,
    },
    AuthorizationToken, BillingConfig, BillingError, BillingEvent, BroadcastAction,
    BroadcastRegistry, BroadcastSender, Bundle, Environment, PurchaseLauncher, StoreConfig,
    StoreMessage, StoreService,
};
use openssl::{
    hash::MessageDigest,
    pkey::{PKey, Private},
    rsa::Rsa,
    sign::Signer,
};
use serde_json::json;
use tokio::sync::{mpsc::UnboundedReceiver, Notify};

pub const APP_PACKAGE: &str = "com.example.app";

pub struct TestKeys {
    private: PKey<Private>,
    pub public_b64: String,
}

impl TestKeys {
    pub fn generate() -> Self {
        let private = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let public_b64 = STANDARD.encode(private.public_key_to_der().unwrap());
        Self {
            private,
            public_b64,
        }
    }

    pub fn sign(&self, data: &str) -> String {
        let mut signer = Signer::new(MessageDigest::sha1(), &self.private).unwrap();
        signer.update(data.as_bytes()).unwrap();
        STANDARD.encode(signer.sign_to_vec().unwrap())
    }

    pub fn config(&self) -> BillingConfig {
        BillingConfig::new(APP_PACKAGE, self.public_b64.clone()).store(StoreConfig::bazaar())
    }
}

pub fn purchase_json(sku: &str, token: &str) -> String {
    json!({
        "orderId": format!("order-{sku}"),
        "packageName": APP_PACKAGE,
        "productId": sku,
        "purchaseTime": 1_700_000_000_000_i64,
        "purchaseState": 0,
        "developerPayload": "payload",
        "purchaseToken": token,
    })
    .to_string()
}

/// Result data the purchase screen hands back for a signed purchase.
pub fn purchase_result(keys: &TestKeys, sku: &str, token: &str) -> Bundle {
    let data = purchase_json(sku, token);
    let signature = keys.sign(&data);
    Bundle::new()
        .with(RESPONSE_CODE, 0)
        .with(RESPONSE_INAPP_PURCHASE_DATA, data)
        .with(RESPONSE_INAPP_SIGNATURE, signature)
}

pub fn details_json(sku: &str) -> String {
    json!({
        "productId": sku,
        "type": "inapp",
        "price": "1,000 Toman",
        "title": sku,
        "description": format!("{sku} description"),
    })
    .to_string()
}

pub async fn next_event(rx: &mut UnboundedReceiver<BillingEvent>) -> BillingEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for billing event")
        .expect("listener channel closed")
}

/// Lets spawned tasks run, then asserts nothing else was reported.
pub async fn assert_no_event(rx: &mut UnboundedReceiver<BillingEvent>) {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(rx.try_recv().is_err(), "unexpected billing event");
}

pub struct FakeEnvironment {
    pub installed: Mutex<bool>,
    pub version: Mutex<Option<i64>>,
    pub online: Mutex<bool>,
}

impl FakeEnvironment {
    pub fn new(version: i64) -> Arc<Self> {
        Arc::new(Self {
            installed: Mutex::new(true),
            version: Mutex::new(Some(version)),
            online: Mutex::new(true),
        })
    }
}

impl Environment for FakeEnvironment {
    fn is_package_installed(&self, _package: &str) -> bool {
        *self.installed.lock().unwrap()
    }

    fn installed_version(&self, _package: &str) -> Option<i64> {
        *self.version.lock().unwrap()
    }

    fn is_online(&self) -> bool {
        *self.online.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingLauncher {
    pub presented: Mutex<Vec<AuthorizationToken>>,
}

impl RecordingLauncher {
    pub fn count(&self) -> usize {
        self.presented.lock().unwrap().len()
    }
}

impl PurchaseLauncher for RecordingLauncher {
    fn present(&self, token: AuthorizationToken) -> Result<(), BillingError> {
        self.presented.lock().unwrap().push(token);
        Ok(())
    }
}

/// In-memory bound billing service.
pub struct FakeStoreService {
    pub bind_ok: bool,
    pub inapp_support: i32,
    pub subs_support: i32,
    pub intent_v2: bool,
    pub buy_intent_code: Mutex<i32>,
    /// While set, buy-intent calls wait for `buy_intent_gate`.
    pub hold_buy_intent: AtomicBool,
    pub buy_intent_gate: Notify,
    pub consume_code: Mutex<i32>,
    /// Pages of owned in-app purchases: (sku, purchase json, signature).
    pub owned_pages: Mutex<Vec<Vec<(String, String, String)>>>,
    pub catalog: Mutex<HashMap<String, String>>,
    pub calls: Mutex<Vec<String>>,
    pub detail_batches: Mutex<Vec<usize>>,
}

impl Default for FakeStoreService {
    fn default() -> Self {
        Self {
            bind_ok: true,
            inapp_support: 0,
            subs_support: 0,
            intent_v2: false,
            buy_intent_code: Mutex::new(0),
            hold_buy_intent: AtomicBool::new(false),
            buy_intent_gate: Notify::new(),
            consume_code: Mutex::new(0),
            owned_pages: Mutex::new(Vec::new()),
            catalog: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            detail_batches: Mutex::new(Vec::new()),
        }
    }
}

impl FakeStoreService {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls_named(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == name)
            .count()
    }
}

#[async_trait]
impl StoreService for FakeStoreService {
    async fn bind(&self, _bind_address: &str) -> Result<bool, BillingError> {
        self.record("bind");
        Ok(self.bind_ok)
    }

    async fn unbind(&self) -> Result<(), BillingError> {
        self.record("unbind");
        Ok(())
    }

    async fn is_billing_supported(
        &self,
        _api_version: i32,
        _package_name: &str,
        item_type: &str,
    ) -> Result<i32, BillingError> {
        self.record(format!("is_billing_supported:{item_type}"));
        Ok(if item_type == "subs" {
            self.subs_support
        } else {
            self.inapp_support
        })
    }

    async fn get_purchase_config(&self, _api_version: i32) -> Result<Option<Bundle>, BillingError> {
        Ok(Some(Bundle::new().with(INTENT_V2_SUPPORT, self.intent_v2)))
    }

    async fn get_buy_intent(
        &self,
        _api_version: i32,
        _package_name: &str,
        sku: &str,
        _item_type: &str,
        _developer_payload: &str,
    ) -> Result<Bundle, BillingError> {
        self.record("get_buy_intent");
        if self.hold_buy_intent.load(Ordering::SeqCst) {
            self.buy_intent_gate.notified().await;
        }
        Ok(Bundle::new()
            .with(RESPONSE_CODE, *self.buy_intent_code.lock().unwrap())
            .with(RESPONSE_BUY_INTENT, format!("intent:{sku}")))
    }

    async fn get_buy_intent_v2(
        &self,
        _api_version: i32,
        _package_name: &str,
        sku: &str,
        _item_type: &str,
        _developer_payload: &str,
    ) -> Result<Bundle, BillingError> {
        self.record("get_buy_intent_v2");
        Ok(Bundle::new()
            .with(RESPONSE_CODE, *self.buy_intent_code.lock().unwrap())
            .with(RESPONSE_BUY_INTENT, format!("intent-v2:{sku}")))
    }

    async fn consume_purchase(
        &self,
        _api_version: i32,
        _package_name: &str,
        _token: &str,
    ) -> Result<i32, BillingError> {
        self.record("consume_purchase");
        Ok(*self.consume_code.lock().unwrap())
    }

    async fn get_sku_details(
        &self,
        _api_version: i32,
        _package_name: &str,
        _item_type: &str,
        query: Bundle,
    ) -> Result<Bundle, BillingError> {
        self.record("get_sku_details");
        let requested: Vec<String> = query
            .get(GET_SKU_DETAILS_ITEM_LIST)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        self.detail_batches.lock().unwrap().push(requested.len());
        let catalog = self.catalog.lock().unwrap();
        let details: Vec<String> = requested
            .iter()
            .filter_map(|sku| catalog.get(sku).cloned())
            .collect();
        Ok(Bundle::new()
            .with(RESPONSE_CODE, 0)
            .with(RESPONSE_GET_SKU_DETAILS_LIST, details))
    }

    async fn get_purchases(
        &self,
        _api_version: i32,
        _package_name: &str,
        item_type: &str,
        continuation_token: Option<&str>,
    ) -> Result<Bundle, BillingError> {
        self.record(format!("get_purchases:{item_type}"));
        let pages = self.owned_pages.lock().unwrap();
        let index: usize = continuation_token
            .and_then(|t| t.strip_prefix("page-"))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        let page = if item_type == "inapp" {
            pages.get(index).cloned().unwrap_or_default()
        } else {
            Vec::new()
        };
        let mut bundle = owned_bundle(&page);
        if item_type == "inapp" && index + 1 < pages.len() {
            bundle.insert(INAPP_CONTINUATION_TOKEN, format!("page-{}", index + 1));
        }
        Ok(bundle)
    }
}

pub fn owned_bundle(page: &[(String, String, String)]) -> Bundle {
    Bundle::new()
        .with(RESPONSE_CODE, 0)
        .with(
            RESPONSE_INAPP_ITEM_LIST,
            page.iter().map(|(s, _, _)| s.clone()).collect::<Vec<_>>(),
        )
        .with(
            RESPONSE_INAPP_PURCHASE_DATA_LIST,
            page.iter().map(|(_, d, _)| d.clone()).collect::<Vec<_>>(),
        )
        .with(
            RESPONSE_INAPP_SIGNATURE_LIST,
            page.iter().map(|(_, _, s)| s.clone()).collect::<Vec<_>>(),
        )
}

/// Store that speaks the broadcast protocol. Replies are delivered
/// synchronously through the registry, as a host's receiver would.
pub struct FakeBroadcastStore {
    pub registry: Arc<BroadcastRegistry>,
    pub store_package: String,
    pub subscriptions: bool,
    /// `None` leaves consume requests unanswered.
    pub consume_reply: Mutex<Option<i32>>,
    pub purchase_reply_code: Mutex<i32>,
    pub owned: Mutex<Vec<(String, String, String)>>,
    pub sent: Mutex<Vec<StoreMessage>>,
}

impl FakeBroadcastStore {
    pub fn new(registry: Arc<BroadcastRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            store_package: StoreConfig::bazaar().package,
            subscriptions: true,
            consume_reply: Mutex::new(Some(0)),
            purchase_reply_code: Mutex::new(0),
            owned: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent_actions(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.action.clone())
            .collect()
    }

    fn reply(&self, action: BroadcastAction, extras: Bundle) {
        let message = StoreMessage::new(
            format!("{}.iab", action.action_for(&self.store_package)),
            extras,
        );
        self.registry.notify(&message);
    }
}

impl BroadcastSender for FakeBroadcastStore {
    fn send(&self, message: StoreMessage) -> Result<(), BillingError> {
        self.sent.lock().unwrap().push(message.clone());
        let Some(action) = BroadcastAction::parse(&message.action, &self.store_package) else {
            return Ok(());
        };
        match action {
            BroadcastAction::Ping => self.reply(action, Bundle::new()),
            BroadcastAction::BillingSupport => self.reply(
                action,
                Bundle::new()
                    .with(RESPONSE_CODE, 0)
                    .with(SUBSCRIPTION_SUPPORT_KEY, self.subscriptions),
            ),
            BroadcastAction::Purchase => {
                let sku = message.extras.get_str("sku").unwrap_or_default().to_string();
                self.reply(
                    action,
                    Bundle::new()
                        .with(RESPONSE_CODE, *self.purchase_reply_code.lock().unwrap())
                        .with(RESPONSE_BUY_INTENT, format!("intent:{sku}")),
                );
            }
            BroadcastAction::Consume => {
                let reply = *self.consume_reply.lock().unwrap();
                if let Some(code) = reply {
                    self.reply(action, Bundle::new().with(RESPONSE_CODE, code));
                }
            }
            BroadcastAction::GetPurchase => {
                let owned = self.owned.lock().unwrap().clone();
                self.reply(action, owned_bundle(&owned));
            }
            BroadcastAction::SkuDetail => self.reply(
                action,
                Bundle::new()
                    .with(RESPONSE_CODE, 0)
                    .with(RESPONSE_GET_SKU_DETAILS_LIST, Vec::<String>::new()),
            ),
        }
        Ok(())
    }
}
