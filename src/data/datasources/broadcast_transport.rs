use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::{
    constants::{
        API_VERSION_KEY, DEVELOPER_PAYLOAD_KEY, GET_SKU_DETAILS_ITEM_LIST, ITEM_TYPE_KEY,
        PACKAGE_NAME_KEY, SKU_KEY, TOKEN_KEY,
    },
    correlator::ResponseCorrelator,
    data::models::{
        bundle::Bundle,
        store_message::{BroadcastAction, StoreMessage},
        store_response_models::{BillingSupportReplyModel, BuyIntentResponseModel},
    },
    domain::entities::{
        authorization_token::AuthorizationToken, item_type::ItemType,
        operation_result::OperationResult, receipt::Receipt, response_code::ResponseCode,
    },
    errors::BillingError,
    host::{BroadcastSender, Environment},
    util::{broadcast_min_version, lock},
};

use super::{
    billing_transport::BillingTransport,
    broadcast_registry::{BroadcastObserver, BroadcastRegistry, ObserverId},
    purchase_flow::PurchaseFlow,
};

#[derive(Default)]
struct SlotState {
    correlator: Option<Arc<ResponseCorrelator>>,
    reply: Option<Bundle>,
    closed: bool,
}

/// Holds the correlator for one kind of request and the reply that
/// satisfied it.
#[derive(Default)]
struct ReplySlot {
    state: Mutex<SlotState>,
}

impl ReplySlot {
    /// Arms a fresh correlator, aborting any previous one. Once the slot is
    /// closed every new correlator starts aborted.
    fn arm(&self) -> Arc<ResponseCorrelator> {
        let mut state = lock(&self.state);
        let correlator = Arc::new(ResponseCorrelator::new(1));
        if state.closed {
            correlator.abort();
        }
        if let Some(previous) = state.correlator.replace(correlator.clone()) {
            previous.abort();
        }
        state.reply = None;
        correlator
    }

    fn deliver(&self, reply: Bundle) {
        let mut state = lock(&self.state);
        if state.closed {
            return;
        }
        state.reply = Some(reply);
        if let Some(correlator) = &state.correlator {
            correlator.signal();
        }
    }

    fn take_reply(&self) -> Option<Bundle> {
        lock(&self.state).reply.take()
    }

    fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        state.reply = None;
        if let Some(correlator) = state.correlator.take() {
            correlator.abort();
        }
    }
}

struct BroadcastInner {
    sender: Arc<dyn BroadcastSender>,
    environment: Arc<dyn Environment>,
    store_package: String,
    package_name: String,
    api_version: i32,
    consume_timeout: Duration,
    flow: Arc<PurchaseFlow>,
    disposed: AtomicBool,
    subscriptions_supported: AtomicBool,
    ping: ReplySlot,
    billing_support: ReplySlot,
    consume: ReplySlot,
    sku_details: ReplySlot,
    purchases: ReplySlot,
}

impl BroadcastInner {
    fn send(&self, action: BroadcastAction, extras: Bundle) -> Result<(), BillingError> {
        let mut message = Bundle::new().with(PACKAGE_NAME_KEY, self.package_name.as_str());
        if action != BroadcastAction::Ping {
            message.insert(API_VERSION_KEY, self.api_version);
        }
        message.extend(extras);
        debug!(action = action.suffix(), "Sending broadcast to store.");
        self.sender.send(StoreMessage::new(
            action.action_for(&self.store_package),
            message,
        ))
    }

    fn slots(&self) -> [&ReplySlot; 5] {
        [
            &self.ping,
            &self.billing_support,
            &self.consume,
            &self.sku_details,
            &self.purchases,
        ]
    }

    fn handle_purchase_reply(&self, extras: &Bundle) {
        let response = match extras.response_code() {
            Ok(code) => code,
            Err(e) => {
                self.flow.finish(e.to_result(), None);
                return;
            }
        };
        if !response.is_ok() {
            error!(code = %response, "Unable to buy item.");
            self.flow.finish(
                OperationResult::new(response, "Unable to buy item"),
                None,
            );
            return;
        }
        let token = match extras.decode::<BuyIntentResponseModel>() {
            Ok(model) => model.buy_intent,
            Err(e) => {
                self.flow.finish(e.to_result(), None);
                return;
            }
        };
        debug!("Launching buy intent.");
        if let Err(e) = self.flow.present(token) {
            error!(error = %e, "Failed to present purchase flow.");
            self.flow.finish(e.to_result(), None);
        }
    }
}

impl BroadcastObserver for BroadcastInner {
    fn on_broadcast(&self, message: &StoreMessage) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let Some(action) = BroadcastAction::parse(&message.action, &self.store_package) else {
            return;
        };
        debug!(action = action.suffix(), "Store reply received.");
        let extras = message.extras.clone();
        match action {
            BroadcastAction::Ping => self.ping.deliver(extras),
            BroadcastAction::BillingSupport => self.billing_support.deliver(extras),
            BroadcastAction::Purchase => self.handle_purchase_reply(&extras),
            BroadcastAction::Consume => self.consume.deliver(extras),
            BroadcastAction::SkuDetail => self.sku_details.deliver(extras),
            BroadcastAction::GetPurchase => self.purchases.deliver(extras),
        }
    }
}

/// Talks to stores that only answer broadcasts. Every request is a
/// fire-and-forget message; replies arrive through the broadcast registry
/// and are matched to the waiting request by action.
pub(crate) struct BroadcastTransport {
    inner: Arc<BroadcastInner>,
    registry: Arc<BroadcastRegistry>,
    registration: Mutex<Option<ObserverId>>,
}

impl BroadcastTransport {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        sender: Arc<dyn BroadcastSender>,
        environment: Arc<dyn Environment>,
        registry: Arc<BroadcastRegistry>,
        flow: Arc<PurchaseFlow>,
        store_package: impl Into<String>,
        package_name: impl Into<String>,
        api_version: i32,
        consume_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(BroadcastInner {
                sender,
                environment,
                store_package: store_package.into(),
                package_name: package_name.into(),
                api_version,
                consume_timeout,
                flow,
                disposed: AtomicBool::new(false),
                subscriptions_supported: AtomicBool::new(false),
                ping: ReplySlot::default(),
                billing_support: ReplySlot::default(),
                consume: ReplySlot::default(),
                sku_details: ReplySlot::default(),
                purchases: ReplySlot::default(),
            }),
            registry,
            registration: Mutex::new(None),
        }
    }

    fn is_eligible(&self) -> bool {
        let store = &self.inner.store_package;
        let Some(version) = self.inner.environment.installed_version(store) else {
            return false;
        };
        match broadcast_min_version(store) {
            Some(min) => version >= min,
            None => false,
        }
    }

    fn unregister(&self) {
        if let Some(id) = lock(&self.registration).take() {
            self.registry.unregister(id);
        }
    }

    /// Sends `action` and waits without limit for its reply. An aborted
    /// wait yields an empty bundle.
    async fn query(
        &self,
        slot: &ReplySlot,
        action: BroadcastAction,
        extras: Bundle,
    ) -> Result<Bundle, BillingError> {
        let correlator = slot.arm();
        self.inner.send(action, extras)?;
        match correlator.wait(None).await {
            Ok(()) => Ok(slot.take_reply().unwrap_or_default()),
            Err(e) => {
                warn!(action = action.suffix(), error = %e, "Error happened while waiting for store reply.");
                Ok(Bundle::new())
            }
        }
    }
}

#[async_trait]
impl BillingTransport for BroadcastTransport {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    async fn connect(&self) -> Result<(), BillingError> {
        if !self.is_eligible() {
            return Err(BillingError::Unavailable(format!(
                "{} does not support broadcast billing",
                self.inner.store_package
            )));
        }
        let observer: Arc<dyn BroadcastObserver> = self.inner.clone();
        let id = self.registry.register(Arc::downgrade(&observer));
        *lock(&self.registration) = Some(id);

        let correlator = self.inner.ping.arm();
        if let Err(e) = self.inner.send(BroadcastAction::Ping, Bundle::new()) {
            self.unregister();
            return Err(e);
        }
        correlator.wait(None).await?;
        debug!(store = %self.inner.store_package, "Connected to store over broadcast.");
        Ok(())
    }

    async fn check_billing_supported(
        &self,
        api_version: i32,
        package_name: &str,
    ) -> OperationResult {
        let correlator = self.inner.billing_support.arm();
        let extras = Bundle::new()
            .with(PACKAGE_NAME_KEY, package_name)
            .with(API_VERSION_KEY, api_version);
        if let Err(e) = self.inner.send(BroadcastAction::BillingSupport, extras) {
            return e.to_result();
        }
        if let Err(e) = correlator.wait(None).await {
            return BillingError::from(e).to_result();
        }
        let reply = self.inner.billing_support.take_reply().unwrap_or_default();
        let support = reply
            .decode::<BillingSupportReplyModel>()
            .unwrap_or_default();
        self.inner
            .subscriptions_supported
            .store(support.subscription_support, Ordering::SeqCst);
        match reply.response_code() {
            Ok(code) if code.is_ok() => OperationResult::ok("Setup successful."),
            Ok(code) => OperationResult::new(code, "Error checking for billing support."),
            Err(e) => e.to_result(),
        }
    }

    fn subscriptions_supported(&self) -> bool {
        self.inner.subscriptions_supported.load(Ordering::SeqCst)
    }

    async fn launch_purchase_flow(
        &self,
        sku: &str,
        item_type: ItemType,
        developer_payload: &str,
    ) -> Result<Option<AuthorizationToken>, BillingError> {
        let extras = Bundle::new()
            .with(SKU_KEY, sku)
            .with(ITEM_TYPE_KEY, item_type.as_str())
            .with(DEVELOPER_PAYLOAD_KEY, developer_payload);
        self.inner.send(BroadcastAction::Purchase, extras)?;
        Ok(None)
    }

    async fn consume(&self, receipt: &Receipt) -> Result<(), BillingError> {
        let sku = receipt.sku();
        if !receipt.is_consumable() {
            error!(sku, "Can't consume. No token.");
            return Err(BillingError::MissingToken {
                sku: sku.to_string(),
            });
        }
        debug!(sku, token = receipt.token(), "Consuming sku.");
        let correlator = self.inner.consume.arm();
        self.inner.send(
            BroadcastAction::Consume,
            Bundle::new().with(TOKEN_KEY, receipt.token()),
        )?;
        if let Err(e) = correlator.wait(Some(self.inner.consume_timeout)).await {
            warn!(sku, error = %e, "Error consuming sku.");
            return Err(BillingError::store(
                ResponseCode::TransportError,
                format!("Error consuming sku {sku}"),
            ));
        }
        let response = self
            .inner
            .consume
            .take_reply()
            .unwrap_or_default()
            .response_code()?;
        if response.is_ok() {
            debug!(sku, "Successfully consumed sku.");
            Ok(())
        } else {
            debug!(sku, code = %response, "Error consuming sku.");
            Err(BillingError::store(
                response,
                format!("Error consuming sku {sku}"),
            ))
        }
    }

    async fn get_sku_details(
        &self,
        item_type: ItemType,
        skus: &[String],
    ) -> Result<Bundle, BillingError> {
        let extras = Bundle::new()
            .with(ITEM_TYPE_KEY, item_type.as_str())
            .with(GET_SKU_DETAILS_ITEM_LIST, skus.to_vec());
        self.query(&self.inner.sku_details, BroadcastAction::SkuDetail, extras)
            .await
    }

    async fn get_purchases(
        &self,
        item_type: ItemType,
        continuation_token: Option<&str>,
    ) -> Result<Bundle, BillingError> {
        let mut extras = Bundle::new().with(ITEM_TYPE_KEY, item_type.as_str());
        if let Some(token) = continuation_token {
            extras.insert(TOKEN_KEY, token);
        }
        self.query(&self.inner.purchases, BroadcastAction::GetPurchase, extras)
            .await
    }

    async fn dispose(&self) -> Result<(), BillingError> {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.unregister();
        for slot in self.inner.slots() {
            slot.close();
        }
        debug!(store = %self.inner.store_package, "Broadcast transport disposed.");
        Ok(())
    }
}
