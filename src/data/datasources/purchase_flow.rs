use std::sync::{Arc, Mutex, RwLock, Weak};

use tracing::{debug, error, warn};

use crate::{
    data::models::{bundle::Bundle, store_response_models::PurchaseResultModel},
    domain::{
        entities::{
            activity_result::ActivityResult, authorization_token::AuthorizationToken,
            item_type::ItemType, operation_result::OperationResult, receipt::Receipt,
            response_code::ResponseCode,
        },
        repositories::billing_repository::PurchaseFinishedCallback,
    },
    errors::BillingError,
    host::PurchaseLauncher,
    security::ReceiptVerifier,
    util::{lock, read, write},
};

struct PendingPurchase {
    item_type: ItemType,
    on_finish: PurchaseFinishedCallback,
}

/// The one purchase a client may have in flight: which item type was
/// requested and who to tell when it ends. The callback is taken out before
/// it runs, so a flow finishes at most once.
pub(crate) struct PurchaseFlow {
    verifier: Arc<dyn ReceiptVerifier>,
    pending: Mutex<Option<PendingPurchase>>,
    launcher: RwLock<Weak<dyn PurchaseLauncher>>,
}

impl PurchaseFlow {
    pub(crate) fn new(
        verifier: Arc<dyn ReceiptVerifier>,
        launcher: Weak<dyn PurchaseLauncher>,
    ) -> Self {
        Self {
            verifier,
            pending: Mutex::new(None),
            launcher: RwLock::new(launcher),
        }
    }

    pub(crate) fn begin(&self, item_type: ItemType, on_finish: PurchaseFinishedCallback) {
        let previous = lock(&self.pending).replace(PendingPurchase {
            item_type,
            on_finish,
        });
        if previous.is_some() {
            warn!("Replacing an unfinished purchase flow.");
        }
    }

    /// Drops the pending flow without reporting it.
    pub(crate) fn cancel(&self) {
        lock(&self.pending).take();
    }

    /// Reports the outcome of the pending flow. Returns `false` if none was
    /// pending.
    pub(crate) fn finish(&self, result: OperationResult, receipt: Option<Receipt>) -> bool {
        let pending = lock(&self.pending).take();
        match pending {
            Some(pending) => {
                (pending.on_finish)(result, receipt);
                true
            }
            None => {
                debug!(result = %result, "No purchase flow pending; dropping result.");
                false
            }
        }
    }

    /// Hands `token` to the launcher. Refused once the flow was cancelled or
    /// finished.
    pub(crate) fn present(&self, token: AuthorizationToken) -> Result<(), BillingError> {
        if lock(&self.pending).is_none() {
            return Err(BillingError::LaunchFailed(
                "no purchase flow pending".to_string(),
            ));
        }
        let launcher = read(&self.launcher).upgrade();
        match launcher {
            Some(launcher) => launcher.present(token),
            None => Err(BillingError::LaunchFailed(
                "purchase launcher is no longer available".to_string(),
            )),
        }
    }

    pub(crate) fn rebind_launcher(&self, launcher: Weak<dyn PurchaseLauncher>) {
        *write(&self.launcher) = launcher;
    }

    /// Turns the purchase screen's result into a verified receipt and
    /// finishes the pending flow with it.
    pub(crate) fn handle_result(&self, activity: ActivityResult, data: Option<Bundle>) -> bool {
        let item_type = match lock(&self.pending).as_ref() {
            Some(pending) => pending.item_type,
            None => {
                debug!("Purchase result received with no flow pending.");
                return false;
            }
        };
        let (result, receipt) = self.evaluate(item_type, activity, data);
        self.finish(result, receipt)
    }

    fn evaluate(
        &self,
        item_type: ItemType,
        activity: ActivityResult,
        data: Option<Bundle>,
    ) -> (OperationResult, Option<Receipt>) {
        let Some(data) = data else {
            error!("Null data in IAB activity result.");
            return (
                OperationResult::new(ResponseCode::BadResponse, "Null data in IAB result"),
                None,
            );
        };
        let response = match data.response_code() {
            Ok(code) => code,
            Err(e) => {
                error!(error = %e, "Unexpected type for intent response code.");
                return (e.to_result(), None);
            }
        };

        match activity {
            ActivityResult::Ok if response.is_ok() => {
                debug!(expected = %item_type, "Successful resultCode from purchase activity.");
                let model = data.decode::<PurchaseResultModel>().unwrap_or_default();
                let (Some(purchase_data), Some(signature)) =
                    (model.purchase_data, model.data_signature)
                else {
                    error!("BUG: either purchaseData or dataSignature is null.");
                    return (
                        OperationResult::new(
                            ResponseCode::UnknownError,
                            "IAB returned null purchaseData or dataSignature",
                        ),
                        None,
                    );
                };
                let receipt = match Receipt::parse(item_type, purchase_data, signature) {
                    Ok(receipt) => receipt,
                    Err(e) => {
                        error!(error = %e, "Failed to parse purchase data.");
                        return (
                            OperationResult::new(
                                ResponseCode::BadResponse,
                                "Failed to parse purchase data.",
                            ),
                            None,
                        );
                    }
                };
                if self
                    .verifier
                    .verify(receipt.raw_json(), receipt.signature())
                    .is_err()
                {
                    error!(sku = receipt.sku(), "Purchase signature verification FAILED.");
                    let result = OperationResult::new(
                        ResponseCode::VerificationFailed,
                        format!("Signature verification failed for sku {}", receipt.sku()),
                    );
                    return (result, Some(receipt));
                }
                debug!(sku = receipt.sku(), "Purchase signature successfully verified.");
                (OperationResult::ok("Success"), Some(receipt))
            }
            ActivityResult::Ok => {
                debug!(code = %response, "Result code was OK but in-app billing response was not OK.");
                (
                    OperationResult::new(response, "Problem purchasing item."),
                    None,
                )
            }
            ActivityResult::Canceled => {
                debug!(code = %response, "Purchase canceled.");
                (
                    OperationResult::new(ResponseCode::UserCancelled, "User canceled."),
                    None,
                )
            }
            ActivityResult::Other(code) => {
                error!(result_code = code, response = %response, "Purchase failed.");
                (
                    OperationResult::new(
                        ResponseCode::UnknownPurchaseResponse,
                        "Unknown purchase response.",
                    ),
                    None,
                )
            }
        }
    }
}
