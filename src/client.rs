use std::{
    future::Future,
    sync::{Arc, Mutex, RwLock, Weak},
};

use once_cell::sync::OnceCell;
use tokio::runtime::Handle;
use tracing::{debug, error};

use crate::{
    config::BillingConfig,
    data::{models::bundle::Bundle, repositories::billing_repository_impl::BillingRepositoryImpl},
    domain::{
        entities::{
            activity_result::ActivityResult, billing_status::BillingStatus, item_type::ItemType,
            operation_result::OperationResult, purchase_request::PurchaseRequest,
            receipt::Receipt,
        },
        repositories::billing_repository::{BillingRepository, PurchaseFinishedCallback},
    },
    errors::BillingError,
    host::{Environment, HostBindings, PurchaseLauncher},
    listener::BillingListener,
    util::{lock, read, write},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupPhase {
    #[default]
    Idle,
    SettingUp,
    Ready,
}

#[derive(Debug, Default)]
struct SessionState {
    phase: SetupPhase,
    setup_done: bool,
    disposed: bool,
    purchase_in_flight: bool,
    inventory_in_flight: bool,
    pending_sku: Option<String>,
    pending_auto_consume: bool,
    global_auto_consume: bool,
}

struct ClientInner<R> {
    repository: R,
    environment: Arc<dyn Environment>,
    store_package: String,
    listener: RwLock<Option<Arc<dyn BillingListener>>>,
    session: Mutex<SessionState>,
    runtime: OnceCell<Handle>,
}

/// Entry point for purchasing from the store.
///
/// Allows one purchase or inventory query at a time, and reports every
/// outcome to the [`BillingListener`] bound by [`configure`](Self::configure).
/// Once disposed, the client rejects everything with
/// [`BillingStatus::Disposed`].
pub struct PurchaseClient<R: BillingRepository> {
    inner: Arc<ClientInner<R>>,
}

impl<R: BillingRepository> Clone for PurchaseClient<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl PurchaseClient<BillingRepositoryImpl> {
    pub fn new(config: BillingConfig, host: HostBindings) -> Result<Self, BillingError> {
        let environment = host.environment.clone();
        let store_package = config.store.package.clone();
        let repository = BillingRepositoryImpl::new(config, host)?;
        Ok(Self::with_repository(repository, environment, store_package))
    }
}

impl<R: BillingRepository> PurchaseClient<R> {
    pub fn with_repository(
        repository: R,
        environment: Arc<dyn Environment>,
        store_package: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                repository,
                environment,
                store_package: store_package.into(),
                listener: RwLock::new(None),
                session: Mutex::new(SessionState::default()),
                runtime: OnceCell::new(),
            }),
        }
    }

    /// Binds `listener` and sets up billing. On success the owned items are
    /// queried in the background.
    pub async fn configure(&self, listener: Arc<dyn BillingListener>) {
        *write(&self.inner.listener) = Some(listener);
        if let Ok(handle) = Handle::try_current() {
            let _ = self.inner.runtime.set(handle);
        }

        let installed = self.store_installed();
        {
            let mut session = lock(&self.inner.session);
            if session.disposed {
                drop(session);
                self.report_status(BillingStatus::Disposed);
                return;
            }
            if !installed {
                drop(session);
                self.report_status(BillingStatus::StoreNotInstalled);
                return;
            }
            if session.phase != SetupPhase::Idle {
                debug!("Setup already started.");
                return;
            }
            session.phase = SetupPhase::SettingUp;
        }

        let result = self.inner.repository.start_setup().await;
        if result.is_failure() {
            debug!(result = %result, "startSetup failed.");
            {
                let mut session = lock(&self.inner.session);
                if session.disposed {
                    return;
                }
                session.phase = SetupPhase::Idle;
            }
            self.report_status(BillingStatus::SetupFailed);
            self.dispose().await;
            return;
        }

        let query_inventory = {
            let mut session = lock(&self.inner.session);
            if session.disposed {
                return;
            }
            session.phase = SetupPhase::Ready;
            session.setup_done = true;
            if session.purchase_in_flight || session.inventory_in_flight {
                false
            } else {
                session.inventory_in_flight = true;
                true
            }
        };
        debug!("Setup successful. Querying inventory.");
        self.report_status(BillingStatus::SetupSuccess);
        if query_inventory {
            let client = self.clone();
            if !self.spawn(async move { client.run_inventory_query(Vec::new()).await }) {
                lock(&self.inner.session).inventory_in_flight = false;
            }
        }
    }

    pub async fn launch_purchase(&self, request: PurchaseRequest) {
        let installed = self.store_installed();
        let online = self.inner.environment.is_online();
        let subscriptions = self.inner.repository.subscriptions_supported();

        let rejection = {
            let mut session = lock(&self.inner.session);
            let rejection = if session.disposed {
                Some(BillingStatus::Disposed)
            } else if session.purchase_in_flight || session.inventory_in_flight {
                Some(BillingStatus::InProgress)
            } else if !installed {
                Some(BillingStatus::StoreNotInstalled)
            } else if !online {
                Some(BillingStatus::NoNetwork)
            } else if request.item_type == ItemType::Subs && !subscriptions {
                debug!("Subscriptions not supported on your device yet.");
                Some(BillingStatus::SubscriptionsNotSupported)
            } else {
                None
            };
            if rejection.is_none() {
                session.pending_sku = Some(request.sku.clone());
                session.pending_auto_consume =
                    request.auto_consume.unwrap_or(session.global_auto_consume);
                session.purchase_in_flight = true;
            }
            rejection
        };
        if let Some(status) = rejection {
            self.report_status(status);
            return;
        }

        let client = Arc::downgrade(&self.inner);
        let on_finish: PurchaseFinishedCallback = Box::new(move |result, receipt| {
            if let Some(inner) = Weak::upgrade(&client) {
                PurchaseClient { inner }.on_purchase_finished(result, receipt);
            }
        });
        let launched = self
            .inner
            .repository
            .launch_purchase_flow(&request.sku, request.item_type, &request.payload, on_finish)
            .await;
        if let Err(e) = launched {
            debug!(sku = %request.sku, error = %e, "Launch purchase failed.");
            let disposed = {
                let mut session = lock(&self.inner.session);
                session.purchase_in_flight = false;
                session.disposed
            };
            if !disposed {
                self.report_status(BillingStatus::Failed);
            }
        }
    }

    fn on_purchase_finished(&self, result: OperationResult, receipt: Option<Receipt>) {
        debug!(result = %result, "Purchase finished.");
        let auto_consume = {
            let mut session = lock(&self.inner.session);
            session.purchase_in_flight = false;
            if session.disposed {
                return;
            }
            let sku_matches = match (&receipt, session.pending_sku.as_deref()) {
                (Some(receipt), Some(sku)) => receipt.sku().to_lowercase() == sku.to_lowercase(),
                _ => false,
            };
            if result.is_failure() || !sku_matches {
                None
            } else {
                Some(session.pending_auto_consume)
            }
        };
        let (Some(auto_consume), Some(receipt)) = (auto_consume, receipt) else {
            self.report_status(BillingStatus::Failed);
            return;
        };

        debug!(sku = receipt.sku(), "Purchase successful.");
        if let Some(listener) = self.listener() {
            listener.on_billing_success(receipt.clone());
        }
        if auto_consume {
            let client = self.clone();
            self.spawn(async move { client.consume(&receipt).await });
        }
    }

    /// Consumes `receipt`. The outcome is always reported through
    /// [`BillingListener::on_consume_finished`], even when disposed.
    pub async fn consume(&self, receipt: &Receipt) {
        let listener = self.listener();
        if lock(&self.inner.session).disposed {
            if let Some(listener) = listener {
                listener.on_consume_finished(receipt.clone(), false);
            }
            return;
        }
        let result = self.inner.repository.consume(receipt).await;
        match &result {
            Ok(()) => debug!(sku = receipt.sku(), "Consumption successful. Provisioning."),
            Err(e) => debug!(sku = receipt.sku(), error = %e, "Error while consuming."),
        }
        if let Some(listener) = listener {
            listener.on_consume_finished(receipt.clone(), result.is_ok());
        }
    }

    /// Queries owned items plus catalog details for them and `more_skus`.
    pub async fn query_inventory(&self, more_skus: Vec<String>) {
        let rejection = {
            let mut session = lock(&self.inner.session);
            if session.disposed {
                Some(BillingStatus::Disposed)
            } else if session.purchase_in_flight || session.inventory_in_flight {
                Some(BillingStatus::InProgress)
            } else {
                session.inventory_in_flight = true;
                None
            }
        };
        if let Some(status) = rejection {
            self.report_status(status);
            return;
        }
        self.run_inventory_query(more_skus).await;
    }

    async fn run_inventory_query(&self, more_skus: Vec<String>) {
        let result = self
            .inner
            .repository
            .query_inventory(true, &more_skus, &[])
            .await;
        {
            let mut session = lock(&self.inner.session);
            session.inventory_in_flight = false;
            if session.disposed {
                return;
            }
        }
        match result {
            Ok(inventory) => {
                debug!("Query inventory was successful.");
                if let Some(listener) = self.listener() {
                    listener.on_query_inventory_finished(inventory);
                }
            }
            // Failures are not surfaced to the listener.
            Err(e) => debug!(error = %e, "Query inventory failed."),
        }
    }

    /// Default for requests that don't set auto-consume. Ignored while a
    /// purchase is in flight.
    pub fn set_global_auto_consume(&self, auto_consume: bool) {
        let mut session = lock(&self.inner.session);
        if session.purchase_in_flight {
            debug!("Can't be used while billing is active.");
            return;
        }
        session.global_auto_consume = auto_consume;
    }

    pub fn subscriptions_supported(&self) -> bool {
        self.inner.repository.subscriptions_supported()
    }

    /// Delivers the purchase screen's result. Returns `false` if no purchase
    /// was waiting for one.
    pub fn handle_purchase_result(&self, result: impl Into<ActivityResult>, data: Option<Bundle>) -> bool {
        self.inner
            .repository
            .handle_purchase_result(result.into(), data)
    }

    /// Points the client at a recreated launcher.
    pub fn rebind_launcher(&self, launcher: &Arc<dyn PurchaseLauncher>) {
        self.inner.repository.rebind_launcher(Arc::downgrade(launcher));
    }

    /// Releases the store connection and aborts pending waits. Unfinished
    /// purchases and inventory queries end silently; later calls are
    /// rejected with [`BillingStatus::Disposed`].
    pub async fn dispose(&self) {
        {
            let mut session = lock(&self.inner.session);
            if session.disposed {
                return;
            }
            session.disposed = true;
        }
        if let Err(e) = self.inner.repository.dispose().await {
            error!(error = %e, "Error while disposing billing client.");
        }
    }

    pub fn phase(&self) -> SetupPhase {
        lock(&self.inner.session).phase
    }

    pub fn is_setup_done(&self) -> bool {
        lock(&self.inner.session).setup_done
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.inner.session).disposed
    }

    pub fn is_purchase_in_flight(&self) -> bool {
        lock(&self.inner.session).purchase_in_flight
    }

    pub fn is_inventory_in_flight(&self) -> bool {
        lock(&self.inner.session).inventory_in_flight
    }

    fn listener(&self) -> Option<Arc<dyn BillingListener>> {
        read(&self.inner.listener).clone()
    }

    fn report_status(&self, status: BillingStatus) {
        debug!(status = ?status, "Billing status.");
        if let Some(listener) = self.listener() {
            listener.on_billing_status(status);
        }
    }

    fn store_installed(&self) -> bool {
        self.inner
            .environment
            .is_package_installed(&self.inner.store_package)
    }

    fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self
            .inner
            .runtime
            .get()
            .cloned()
            .or_else(|| Handle::try_current().ok());
        match handle {
            Some(handle) => {
                handle.spawn(task);
                true
            }
            None => {
                error!("No async runtime available to run background billing task.");
                false
            }
        }
    }
}
