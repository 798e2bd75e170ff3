use thiserror::Error;

use crate::{
    correlator::CorrelatorError,
    domain::entities::{operation_result::OperationResult, response_code::ResponseCode},
};

/// Errors produced by the billing engine.
///
/// Every variant maps onto a [`ResponseCode`], so a failure can always be
/// reported to the caller as an [`OperationResult`].
#[derive(Debug, Error)]
pub enum BillingError {
    /// The store answered with a non-OK response code.
    #[error("{message} ({code})")]
    Store { code: ResponseCode, message: String },

    /// A call into the bound store service failed.
    #[error("Remote call to the store failed: {0}")]
    Remote(String),

    /// The store returned a payload that could not be understood.
    #[error("Bad response received: {0}")]
    BadResponse(String),

    /// A receipt without a purchase token cannot be consumed.
    #[error("PurchaseInfo is missing token for sku: {sku}")]
    MissingToken { sku: String },

    /// The receipt signature did not match the configured public key.
    #[error("Signature verification failed: {0}")]
    VerificationFailed(String),

    /// The configured public key could not be decoded.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A wait for an asynchronous store reply did not complete.
    #[error(transparent)]
    Correlator(#[from] CorrelatorError),

    /// Neither transport could reach the store.
    #[error("Billing service unavailable: {0}")]
    Unavailable(String),

    /// The purchase flow could not be handed to the launcher.
    #[error("Failed to launch purchase flow: {0}")]
    LaunchFailed(String),

    /// An operation was attempted before setup completed.
    #[error("Billing helper is not set up. Can't perform operation: {0}")]
    NotSetUp(&'static str),

    /// A second asynchronous operation was started on a transport that only
    /// allows one at a time. This is a caller bug.
    #[error("Can't start async operation ({requested}) because another async operation ({active}) is in progress.")]
    OperationInProgress {
        requested: &'static str,
        active: &'static str,
    },

    /// The client was disposed while the operation was pending.
    #[error("Billing client was disposed.")]
    Disposed,

    /// The billing configuration is incomplete or invalid.
    #[error("Invalid billing configuration: {0}")]
    Config(String),
}

impl BillingError {
    pub fn store(code: ResponseCode, message: impl Into<String>) -> Self {
        Self::Store {
            code,
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    pub fn response_code(&self) -> ResponseCode {
        match self {
            BillingError::Store { code, .. } => *code,
            BillingError::Remote(_) => ResponseCode::RemoteException,
            BillingError::BadResponse(_) => ResponseCode::BadResponse,
            BillingError::MissingToken { .. } => ResponseCode::MissingToken,
            BillingError::VerificationFailed(_) => ResponseCode::VerificationFailed,
            BillingError::InvalidPublicKey(_) => ResponseCode::UnknownError,
            BillingError::Correlator(_) => ResponseCode::TransportError,
            BillingError::Unavailable(_) => ResponseCode::BillingUnavailable,
            BillingError::LaunchFailed(_) => ResponseCode::SendIntentFailed,
            BillingError::NotSetUp(_) => ResponseCode::UnknownError,
            BillingError::OperationInProgress { .. } => ResponseCode::DeveloperError,
            BillingError::Disposed => ResponseCode::TransportError,
            BillingError::Config(_) => ResponseCode::DeveloperError,
        }
    }

    pub fn to_result(&self) -> OperationResult {
        let message = match self {
            BillingError::Store { message, .. } => message.clone(),
            other => other.to_string(),
        };
        OperationResult::new(self.response_code(), message)
    }
}
