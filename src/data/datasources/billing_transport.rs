use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::{
    data::models::bundle::Bundle,
    domain::entities::{
        authorization_token::AuthorizationToken, item_type::ItemType,
        operation_result::OperationResult, receipt::Receipt,
    },
    errors::BillingError,
    util::lock,
};

/// A way of talking to the store. Both implementations expose the same
/// request/response surface; the broadcast one turns asynchronous replies
/// into awaited results.
#[async_trait]
pub(crate) trait BillingTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Establishes the connection. `Unavailable` when this transport cannot
    /// reach the store on this device.
    async fn connect(&self) -> Result<(), BillingError>;

    async fn check_billing_supported(&self, api_version: i32, package_name: &str)
        -> OperationResult;

    fn subscriptions_supported(&self) -> bool;

    /// Starts a purchase. `Some(token)` must be handed to the launcher by
    /// the caller; `None` means the transport presents it itself once the
    /// store answers.
    async fn launch_purchase_flow(
        &self,
        sku: &str,
        item_type: ItemType,
        developer_payload: &str,
    ) -> Result<Option<AuthorizationToken>, BillingError>;

    async fn consume(&self, receipt: &Receipt) -> Result<(), BillingError>;

    async fn get_sku_details(
        &self,
        item_type: ItemType,
        skus: &[String],
    ) -> Result<Bundle, BillingError>;

    async fn get_purchases(
        &self,
        item_type: ItemType,
        continuation_token: Option<&str>,
    ) -> Result<Bundle, BillingError>;

    /// Single-flight guard, if this transport enforces one.
    fn operation_guard(&self) -> Option<&AsyncOperationGuard> {
        None
    }

    async fn dispose(&self) -> Result<(), BillingError>;
}

/// Allows at most one asynchronous operation at a time. Overlapping calls
/// are a caller bug: they panic in debug builds and fail immediately with
/// `OperationInProgress` otherwise.
#[derive(Debug, Default)]
pub(crate) struct AsyncOperationGuard {
    active: Mutex<Option<&'static str>>,
}

impl AsyncOperationGuard {
    pub(crate) fn start(&self, operation: &'static str) -> Result<(), BillingError> {
        let mut active = lock(&self.active);
        let in_progress = *active;
        if let Some(current) = in_progress {
            drop(active);
            error!(
                requested = operation,
                active = current,
                "Can't start async operation because another async operation is in progress."
            );
            if cfg!(debug_assertions) {
                panic!(
                    "Can't start async operation ({operation}) because another async operation ({current}) is in progress."
                );
            }
            return Err(BillingError::OperationInProgress {
                requested: operation,
                active: current,
            });
        }
        debug!(operation, "Starting async operation.");
        *active = Some(operation);
        Ok(())
    }

    pub(crate) fn end(&self) {
        if let Some(operation) = lock(&self.active).take() {
            debug!(operation, "Ending async operation.");
        }
    }

    #[cfg(test)]
    pub(crate) fn active(&self) -> Option<&'static str> {
        *lock(&self.active)
    }
}

/// Marks an operation in progress on the transport's guard (if any) until
/// dropped.
pub(crate) struct OperationTicket<'a> {
    guard: Option<&'a AsyncOperationGuard>,
}

impl<'a> OperationTicket<'a> {
    pub(crate) fn start(
        transport: &'a dyn BillingTransport,
        operation: &'static str,
    ) -> Result<Self, BillingError> {
        let guard = transport.operation_guard();
        if let Some(guard) = guard {
            guard.start(operation)?;
        }
        Ok(Self { guard })
    }
}

impl Drop for OperationTicket<'_> {
    fn drop(&mut self) {
        if let Some(guard) = self.guard {
            guard.end();
        }
    }
}
