use std::sync::Weak;

use async_trait::async_trait;

use crate::{
    data::models::bundle::Bundle,
    domain::entities::{
        activity_result::ActivityResult, inventory::Inventory, item_type::ItemType,
        operation_result::OperationResult, receipt::Receipt,
    },
    errors::BillingError,
    host::PurchaseLauncher,
};

/// Called exactly once when a purchase flow ends, with the outcome and the
/// receipt if one could be parsed.
pub type PurchaseFinishedCallback = Box<dyn FnOnce(OperationResult, Option<Receipt>) + Send>;

/// Store operations behind the purchase client. The client owns the session
/// state; the repository owns the transport.
#[async_trait]
pub trait BillingRepository: Send + Sync + 'static {
    /// Connects to the store, preferring the bound service and falling back
    /// to broadcasts, and checks billing support.
    async fn start_setup(&self) -> OperationResult;

    fn subscriptions_supported(&self) -> bool;

    /// Starts a purchase. `on_finish` runs once the flow ends, unless this
    /// returns an error, in which case it is dropped without being called.
    async fn launch_purchase_flow(
        &self,
        sku: &str,
        item_type: ItemType,
        developer_payload: &str,
        on_finish: PurchaseFinishedCallback,
    ) -> Result<(), BillingError>;

    /// Delivers the purchase screen's result. Returns `false` if no purchase
    /// was pending.
    fn handle_purchase_result(&self, result: ActivityResult, data: Option<Bundle>) -> bool;

    async fn consume(&self, receipt: &Receipt) -> Result<(), BillingError>;

    /// Owned purchases, optionally with catalog details for them and the
    /// extra skus given.
    async fn query_inventory(
        &self,
        query_sku_details: bool,
        more_item_skus: &[String],
        more_subs_skus: &[String],
    ) -> Result<Inventory, BillingError>;

    fn rebind_launcher(&self, launcher: Weak<dyn PurchaseLauncher>);

    /// Tears the transport down and aborts any wait in progress.
    async fn dispose(&self) -> Result<(), BillingError>;
}
