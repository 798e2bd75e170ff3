//! Traits the embedding application implements to connect the engine to the
//! store.

use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::{
    data::{
        datasources::broadcast_registry::BroadcastRegistry,
        models::{bundle::Bundle, store_message::StoreMessage},
    },
    domain::entities::authorization_token::AuthorizationToken,
    errors::BillingError,
};

/// Presents the store's purchase screen. The host later reports the outcome
/// through [`PurchaseClient::handle_purchase_result`](crate::PurchaseClient::handle_purchase_result).
pub trait PurchaseLauncher: Send + Sync {
    fn present(&self, token: AuthorizationToken) -> Result<(), BillingError>;
}

/// Device predicates the client consults before talking to the store.
pub trait Environment: Send + Sync {
    fn is_package_installed(&self, package: &str) -> bool;

    /// Installed version code of `package`, if installed.
    fn installed_version(&self, package: &str) -> Option<i64>;

    fn is_online(&self) -> bool;
}

/// The store's bound billing service. Each method is one remote call;
/// `Err` means the call itself failed, a non-OK store answer is carried in
/// the returned bundle or code.
#[async_trait]
pub trait StoreService: Send + Sync {
    /// Connects to the service exposed at `bind_address`. Returns `false`
    /// if the store does not expose it.
    async fn bind(&self, bind_address: &str) -> Result<bool, BillingError>;

    async fn unbind(&self) -> Result<(), BillingError>;

    async fn is_billing_supported(
        &self,
        api_version: i32,
        package_name: &str,
        item_type: &str,
    ) -> Result<i32, BillingError>;

    /// `None` when the store has no purchase configuration.
    async fn get_purchase_config(&self, api_version: i32) -> Result<Option<Bundle>, BillingError>;

    async fn get_buy_intent(
        &self,
        api_version: i32,
        package_name: &str,
        sku: &str,
        item_type: &str,
        developer_payload: &str,
    ) -> Result<Bundle, BillingError>;

    async fn get_buy_intent_v2(
        &self,
        api_version: i32,
        package_name: &str,
        sku: &str,
        item_type: &str,
        developer_payload: &str,
    ) -> Result<Bundle, BillingError>;

    async fn consume_purchase(
        &self,
        api_version: i32,
        package_name: &str,
        token: &str,
    ) -> Result<i32, BillingError>;

    async fn get_sku_details(
        &self,
        api_version: i32,
        package_name: &str,
        item_type: &str,
        query: Bundle,
    ) -> Result<Bundle, BillingError>;

    async fn get_purchases(
        &self,
        api_version: i32,
        package_name: &str,
        item_type: &str,
        continuation_token: Option<&str>,
    ) -> Result<Bundle, BillingError>;
}

/// Sends a broadcast to the store. Replies come back through
/// [`BroadcastRegistry::notify`].
pub trait BroadcastSender: Send + Sync {
    fn send(&self, message: StoreMessage) -> Result<(), BillingError>;
}

/// Everything the host provides to a [`PurchaseClient`](crate::PurchaseClient).
#[derive(Clone)]
pub struct HostBindings {
    pub(crate) environment: Arc<dyn Environment>,
    pub(crate) launcher: Weak<dyn PurchaseLauncher>,
    pub(crate) service: Option<Arc<dyn StoreService>>,
    pub(crate) broadcast: Option<Arc<dyn BroadcastSender>>,
    pub(crate) registry: Arc<BroadcastRegistry>,
}

impl HostBindings {
    /// The launcher is held weakly; keep it alive on the host side and call
    /// [`rebind_launcher`](crate::PurchaseClient::rebind_launcher) when it is
    /// recreated.
    pub fn new(environment: Arc<dyn Environment>, launcher: &Arc<dyn PurchaseLauncher>) -> Self {
        Self {
            environment,
            launcher: Arc::downgrade(launcher),
            service: None,
            broadcast: None,
            registry: BroadcastRegistry::global(),
        }
    }

    pub fn with_service(mut self, service: Arc<dyn StoreService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_broadcast(mut self, sender: Arc<dyn BroadcastSender>) -> Self {
        self.broadcast = Some(sender);
        self
    }

    /// Uses a private registry instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<BroadcastRegistry>) -> Self {
        self.registry = registry;
        self
    }
}
