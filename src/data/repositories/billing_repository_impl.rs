use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock, Weak,
};

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::{
    config::BillingConfig,
    constants::{RESPONSE_GET_SKU_DETAILS_LIST, SKU_DETAILS_BATCH_SIZE},
    data::{
        datasources::{
            billing_transport::{BillingTransport, OperationTicket},
            bound_service_transport::BoundServiceTransport,
            broadcast_transport::BroadcastTransport,
            purchase_flow::PurchaseFlow,
        },
        models::{
            bundle::Bundle,
            store_response_models::{PurchasesResponseModel, SkuDetailsResponseModel},
        },
    },
    domain::{
        entities::{
            activity_result::ActivityResult, inventory::Inventory, item_type::ItemType,
            operation_result::OperationResult, receipt::Receipt, response_code::ResponseCode,
            sku_details::SkuDetails,
        },
        repositories::billing_repository::{BillingRepository, PurchaseFinishedCallback},
    },
    errors::BillingError,
    host::{HostBindings, PurchaseLauncher},
    security::{ReceiptVerifier, RsaReceiptVerifier},
    util::{read, write},
};

/// Default [`BillingRepository`]: picks a transport at setup and runs every
/// store operation through it.
pub struct BillingRepositoryImpl {
    config: BillingConfig,
    host: HostBindings,
    verifier: Arc<dyn ReceiptVerifier>,
    flow: Arc<PurchaseFlow>,
    transport: RwLock<Option<Arc<dyn BillingTransport>>>,
    disposed: AtomicBool,
}

impl BillingRepositoryImpl {
    /// Verifies receipts with the configured public key and algorithm.
    pub fn new(config: BillingConfig, host: HostBindings) -> Result<Self, BillingError> {
        config.validate()?;
        let verifier =
            RsaReceiptVerifier::from_base64(&config.public_key, config.signature_algorithm)?;
        Ok(Self::with_verifier(config, host, Arc::new(verifier)))
    }

    pub fn with_verifier(
        config: BillingConfig,
        host: HostBindings,
        verifier: Arc<dyn ReceiptVerifier>,
    ) -> Self {
        let flow = Arc::new(PurchaseFlow::new(verifier.clone(), host.launcher.clone()));
        Self {
            config,
            host,
            verifier,
            flow,
            transport: RwLock::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    /// Transports to try, in order of preference.
    fn candidates(&self) -> Vec<Arc<dyn BillingTransport>> {
        let mut candidates: Vec<Arc<dyn BillingTransport>> = Vec::with_capacity(2);
        if let Some(service) = &self.host.service {
            candidates.push(Arc::new(BoundServiceTransport::new(
                service.clone(),
                self.config.store.bind_address.clone(),
                self.config.package_name.clone(),
                self.config.api_version,
            )));
        }
        if let Some(sender) = &self.host.broadcast {
            candidates.push(Arc::new(BroadcastTransport::new(
                sender.clone(),
                self.host.environment.clone(),
                self.host.registry.clone(),
                self.flow.clone(),
                self.config.store.package.clone(),
                self.config.package_name.clone(),
                self.config.api_version,
                self.config.consume_timeout,
            )));
        }
        candidates
    }

    /// Publishes the transport before connecting so that `dispose` can
    /// interrupt the connection attempt.
    fn install(&self, transport: Arc<dyn BillingTransport>) -> Result<(), BillingError> {
        let mut slot = write(&self.transport);
        if self.disposed.load(Ordering::SeqCst) {
            return Err(BillingError::Disposed);
        }
        *slot = Some(transport);
        Ok(())
    }

    fn uninstall(&self) -> Option<Arc<dyn BillingTransport>> {
        write(&self.transport).take()
    }

    fn transport(&self, operation: &'static str) -> Result<Arc<dyn BillingTransport>, BillingError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(BillingError::Disposed);
        }
        read(&self.transport)
            .clone()
            .ok_or(BillingError::NotSetUp(operation))
    }

    async fn query_purchases(
        &self,
        transport: &dyn BillingTransport,
        inventory: &mut Inventory,
        item_type: ItemType,
    ) -> Result<(), BillingError> {
        debug!(item_type = %item_type, "Querying owned items.");
        let mut continuation: Option<String> = None;
        let mut verification_failed = false;
        loop {
            debug!(continuation = ?continuation, "Calling getPurchases.");
            let bundle = transport
                .get_purchases(item_type, continuation.as_deref())
                .await?;
            let response = bundle.response_code()?;
            if !response.is_ok() {
                debug!(code = %response, "getPurchases() failed.");
                return Err(BillingError::store(
                    response,
                    "Error refreshing inventory (querying owned items).",
                ));
            }
            let model: PurchasesResponseModel = bundle.decode().map_err(|_| {
                error!("Bundle returned from getPurchases() doesn't contain required fields.");
                BillingError::BadResponse(
                    "Bundle returned from getPurchases() doesn't contain required fields."
                        .to_string(),
                )
            })?;
            if model.item_list.len() != model.purchase_data_list.len()
                || model.item_list.len() != model.signature_list.len()
            {
                return Err(BillingError::BadResponse(
                    "getPurchases() returned lists of different lengths.".to_string(),
                ));
            }

            let entries = model
                .item_list
                .iter()
                .zip(model.purchase_data_list)
                .zip(model.signature_list);
            for ((sku, purchase_data), signature) in entries {
                if self.verifier.verify(&purchase_data, &signature).is_err() {
                    warn!(sku, "Purchase signature verification **FAILED**. Not adding item.");
                    verification_failed = true;
                    continue;
                }
                debug!(sku, "Sku is owned.");
                let receipt = Receipt::parse(item_type, purchase_data, signature)?;
                if !receipt.is_consumable() {
                    warn!(sku, "BUG: empty/null token!");
                }
                inventory.add_purchase(receipt);
            }

            continuation = model.continuation_token;
            if continuation.is_none() {
                break;
            }
        }
        if verification_failed {
            Err(BillingError::VerificationFailed(
                "Error refreshing inventory (querying owned items).".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    async fn query_sku_details(
        &self,
        transport: &dyn BillingTransport,
        inventory: &mut Inventory,
        item_type: ItemType,
        more_skus: &[String],
    ) -> Result<(), BillingError> {
        debug!(item_type = %item_type, "Querying SKU details.");
        let mut skus: Vec<String> = inventory
            .all_owned_skus_of(item_type)
            .into_iter()
            .map(str::to_string)
            .collect();
        for sku in more_skus {
            if !skus.contains(sku) {
                skus.push(sku.clone());
            }
        }
        if skus.is_empty() {
            debug!("No SKUs to query details for.");
            return Ok(());
        }

        for batch in skus.chunks(SKU_DETAILS_BATCH_SIZE) {
            let bundle = transport.get_sku_details(item_type, batch).await?;
            if !bundle.contains_key(RESPONSE_GET_SKU_DETAILS_LIST) {
                let response = bundle.response_code()?;
                if !response.is_ok() {
                    debug!(code = %response, "getSkuDetails() failed.");
                    return Err(BillingError::store(
                        response,
                        "Error refreshing inventory (querying prices of items).",
                    ));
                }
                error!("getSkuDetails() returned a bundle with neither an error nor a detail list.");
                return Err(BillingError::BadResponse(
                    "getSkuDetails() returned a bundle with neither an error nor a detail list."
                        .to_string(),
                ));
            }
            let model: SkuDetailsResponseModel = bundle.decode()?;
            for json in model.details_list {
                let details = SkuDetails::parse(item_type, json)?;
                debug!(sku = details.sku(), "Got sku details.");
                inventory.add_sku_details(details);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BillingRepository for BillingRepositoryImpl {
    async fn start_setup(&self) -> OperationResult {
        debug!("Starting in-app billing setup.");
        for transport in self.candidates() {
            if let Err(e) = self.install(transport.clone()) {
                return e.to_result();
            }
            match transport.connect().await {
                Ok(()) => {
                    debug!(transport = transport.name(), "Billing service connected.");
                    let result = transport
                        .check_billing_supported(
                            self.config.api_version,
                            &self.config.package_name,
                        )
                        .await;
                    debug!(result = %result, "Billing support checked.");
                    return result;
                }
                Err(e) => {
                    debug!(transport = transport.name(), error = %e, "Transport unavailable.");
                    self.uninstall();
                    if let Err(e) = transport.dispose().await {
                        warn!(transport = transport.name(), error = %e, "Failed to release transport.");
                    }
                }
            }
        }
        OperationResult::new(
            ResponseCode::BillingUnavailable,
            "Billing service unavailable on device.",
        )
    }

    fn subscriptions_supported(&self) -> bool {
        read(&self.transport)
            .as_ref()
            .map(|t| t.subscriptions_supported())
            .unwrap_or(false)
    }

    async fn launch_purchase_flow(
        &self,
        sku: &str,
        item_type: ItemType,
        developer_payload: &str,
        on_finish: PurchaseFinishedCallback,
    ) -> Result<(), BillingError> {
        let transport = self.transport("launchPurchaseFlow")?;
        if let Some(guard) = transport.operation_guard() {
            guard.start("launchPurchaseFlow")?;
        }
        let end_guard = transport.clone();
        self.flow.begin(
            item_type,
            Box::new(move |result, receipt| {
                if let Some(guard) = end_guard.operation_guard() {
                    guard.end();
                }
                on_finish(result, receipt);
            }),
        );

        let launched = match transport
            .launch_purchase_flow(sku, item_type, developer_payload)
            .await
        {
            Ok(_) if self.disposed.load(Ordering::SeqCst) => {
                debug!(sku, "Disposed while the buy intent was requested.");
                Err(BillingError::Disposed)
            }
            Ok(Some(token)) => self.flow.present(token),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = launched {
            error!(sku, error = %e, "Failed to launch purchase flow.");
            self.flow.cancel();
            if let Some(guard) = transport.operation_guard() {
                guard.end();
            }
            return Err(e);
        }
        Ok(())
    }

    fn handle_purchase_result(&self, result: ActivityResult, data: Option<Bundle>) -> bool {
        self.flow.handle_result(result, data)
    }

    async fn consume(&self, receipt: &Receipt) -> Result<(), BillingError> {
        let transport = self.transport("consume")?;
        let _ticket = OperationTicket::start(transport.as_ref(), "consume")?;
        transport.consume(receipt).await
    }

    async fn query_inventory(
        &self,
        query_sku_details: bool,
        more_item_skus: &[String],
        more_subs_skus: &[String],
    ) -> Result<Inventory, BillingError> {
        let transport = self.transport("queryInventory")?;
        let _ticket = OperationTicket::start(transport.as_ref(), "refresh inventory")?;
        let mut inventory = Inventory::default();

        self.query_purchases(transport.as_ref(), &mut inventory, ItemType::Inapp)
            .await?;
        if query_sku_details {
            self.query_sku_details(
                transport.as_ref(),
                &mut inventory,
                ItemType::Inapp,
                more_item_skus,
            )
            .await?;
        }

        if transport.subscriptions_supported() {
            self.query_purchases(transport.as_ref(), &mut inventory, ItemType::Subs)
                .await?;
            if query_sku_details {
                self.query_sku_details(
                    transport.as_ref(),
                    &mut inventory,
                    ItemType::Subs,
                    more_subs_skus,
                )
                .await?;
            }
        }
        Ok(inventory)
    }

    fn rebind_launcher(&self, launcher: Weak<dyn PurchaseLauncher>) {
        self.flow.rebind_launcher(launcher);
    }

    async fn dispose(&self) -> Result<(), BillingError> {
        debug!("Disposing.");
        self.disposed.store(true, Ordering::SeqCst);
        self.flow.cancel();
        match self.uninstall() {
            Some(transport) => transport.dispose().await,
            None => Ok(()),
        }
    }
}
