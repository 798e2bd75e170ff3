use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::{
    constants::GET_SKU_DETAILS_ITEM_LIST,
    data::models::{
        bundle::Bundle,
        store_response_models::{BuyIntentResponseModel, PurchaseConfigModel},
    },
    domain::entities::{
        authorization_token::AuthorizationToken, item_type::ItemType,
        operation_result::OperationResult, receipt::Receipt, response_code::ResponseCode,
    },
    errors::BillingError,
    host::StoreService,
};

use super::billing_transport::{AsyncOperationGuard, BillingTransport};

/// Talks to the store through its bound billing service.
pub(crate) struct BoundServiceTransport {
    service: Arc<dyn StoreService>,
    bind_address: String,
    package_name: String,
    api_version: i32,
    subscriptions_supported: AtomicBool,
    bound: AtomicBool,
    guard: AsyncOperationGuard,
}

impl BoundServiceTransport {
    pub(crate) fn new(
        service: Arc<dyn StoreService>,
        bind_address: impl Into<String>,
        package_name: impl Into<String>,
        api_version: i32,
    ) -> Self {
        Self {
            service,
            bind_address: bind_address.into(),
            package_name: package_name.into(),
            api_version,
            subscriptions_supported: AtomicBool::new(false),
            bound: AtomicBool::new(false),
            guard: AsyncOperationGuard::default(),
        }
    }

    async fn intent_v2_supported(&self) -> Result<bool, BillingError> {
        let config = self.service.get_purchase_config(self.api_version).await?;
        Ok(match config {
            Some(bundle) => bundle.decode::<PurchaseConfigModel>()?.intent_v2_support,
            None => false,
        })
    }
}

#[async_trait]
impl BillingTransport for BoundServiceTransport {
    fn name(&self) -> &'static str {
        "bound service"
    }

    async fn connect(&self) -> Result<(), BillingError> {
        debug!(address = %self.bind_address, "Binding to billing service.");
        if self.service.bind(&self.bind_address).await? {
            self.bound.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(BillingError::Unavailable(format!(
                "no billing service bound at {}",
                self.bind_address
            )))
        }
    }

    async fn check_billing_supported(
        &self,
        api_version: i32,
        package_name: &str,
    ) -> OperationResult {
        debug!("Checking for in-app billing support.");
        let inapp = self
            .service
            .is_billing_supported(api_version, package_name, ItemType::Inapp.as_str())
            .await;
        let response = match inapp {
            Ok(code) => ResponseCode::from_code(code),
            Err(e) => {
                warn!(error = %e, "RemoteException while setting up in-app billing.");
                return OperationResult::new(
                    ResponseCode::RemoteException,
                    "RemoteException while setting up in-app billing.",
                );
            }
        };
        if !response.is_ok() {
            self.subscriptions_supported.store(false, Ordering::SeqCst);
            return OperationResult::new(response, "Error checking for billing v3 support.");
        }
        debug!(version = api_version, "In-app billing supported.");

        let subs = self
            .service
            .is_billing_supported(api_version, package_name, ItemType::Subs.as_str())
            .await;
        let supported = match subs {
            Ok(code) => ResponseCode::from_code(code).is_ok(),
            Err(e) => {
                warn!(error = %e, "RemoteException while setting up in-app billing.");
                return OperationResult::new(
                    ResponseCode::RemoteException,
                    "RemoteException while setting up in-app billing.",
                );
            }
        };
        if supported {
            debug!("Subscriptions AVAILABLE.");
        } else {
            debug!("Subscriptions NOT AVAILABLE.");
        }
        self.subscriptions_supported
            .store(supported, Ordering::SeqCst);
        OperationResult::ok("Setup successful.")
    }

    fn subscriptions_supported(&self) -> bool {
        self.subscriptions_supported.load(Ordering::SeqCst)
    }

    async fn launch_purchase_flow(
        &self,
        sku: &str,
        item_type: ItemType,
        developer_payload: &str,
    ) -> Result<Option<AuthorizationToken>, BillingError> {
        let bundle = if self.intent_v2_supported().await? {
            debug!(sku, "Constructing buy intent v2.");
            self.service
                .get_buy_intent_v2(
                    self.api_version,
                    &self.package_name,
                    sku,
                    item_type.as_str(),
                    developer_payload,
                )
                .await?
        } else {
            debug!(sku, "Constructing buy intent.");
            self.service
                .get_buy_intent(
                    self.api_version,
                    &self.package_name,
                    sku,
                    item_type.as_str(),
                    developer_payload,
                )
                .await?
        };
        let response = bundle.response_code()?;
        if !response.is_ok() {
            error!(code = %response, "Unable to buy item.");
            return Err(BillingError::store(response, "Unable to buy item"));
        }
        let model: BuyIntentResponseModel = bundle.decode()?;
        debug!(sku, "Launching buy intent.");
        Ok(Some(model.buy_intent))
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
        let code = self
            .service
            .consume_purchase(self.api_version, &self.package_name, receipt.token())
            .await?;
        let response = ResponseCode::from_code(code);
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
        let query = Bundle::new().with(GET_SKU_DETAILS_ITEM_LIST, skus.to_vec());
        self.service
            .get_sku_details(
                self.api_version,
                &self.package_name,
                item_type.as_str(),
                query,
            )
            .await
    }

    async fn get_purchases(
        &self,
        item_type: ItemType,
        continuation_token: Option<&str>,
    ) -> Result<Bundle, BillingError> {
        self.service
            .get_purchases(
                self.api_version,
                &self.package_name,
                item_type.as_str(),
                continuation_token,
            )
            .await
    }

    fn operation_guard(&self) -> Option<&AsyncOperationGuard> {
        Some(&self.guard)
    }

    async fn dispose(&self) -> Result<(), BillingError> {
        if self.bound.swap(false, Ordering::SeqCst) {
            debug!("Unbinding from service.");
            self.service.unbind().await?;
        }
        Ok(())
    }
}
