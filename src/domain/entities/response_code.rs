use std::fmt;

use serde::{Deserialize, Serialize};

/// Response codes returned by the store, plus the codes the engine itself
/// produces (all at or below -1000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ResponseCode {
    Ok,
    UserCanceled,
    Unknown,
    BillingUnavailable,
    ItemUnavailable,
    DeveloperError,
    Error,
    ItemAlreadyOwned,
    ItemNotOwned,

    TransportError,
    RemoteException,
    BadResponse,
    VerificationFailed,
    SendIntentFailed,
    UserCancelled,
    UnknownPurchaseResponse,
    MissingToken,
    UnknownError,
    SubscriptionsNotAvailable,
    InvalidConsumption,

    /// Any code this engine does not know about.
    Other(i32),
}

impl ResponseCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::UserCanceled,
            2 => Self::Unknown,
            3 => Self::BillingUnavailable,
            4 => Self::ItemUnavailable,
            5 => Self::DeveloperError,
            6 => Self::Error,
            7 => Self::ItemAlreadyOwned,
            8 => Self::ItemNotOwned,
            -1000 => Self::TransportError,
            -1001 => Self::RemoteException,
            -1002 => Self::BadResponse,
            -1003 => Self::VerificationFailed,
            -1004 => Self::SendIntentFailed,
            -1005 => Self::UserCancelled,
            -1006 => Self::UnknownPurchaseResponse,
            -1007 => Self::MissingToken,
            -1008 => Self::UnknownError,
            -1009 => Self::SubscriptionsNotAvailable,
            -1010 => Self::InvalidConsumption,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::UserCanceled => 1,
            Self::Unknown => 2,
            Self::BillingUnavailable => 3,
            Self::ItemUnavailable => 4,
            Self::DeveloperError => 5,
            Self::Error => 6,
            Self::ItemAlreadyOwned => 7,
            Self::ItemNotOwned => 8,
            Self::TransportError => -1000,
            Self::RemoteException => -1001,
            Self::BadResponse => -1002,
            Self::VerificationFailed => -1003,
            Self::SendIntentFailed => -1004,
            Self::UserCancelled => -1005,
            Self::UnknownPurchaseResponse => -1006,
            Self::MissingToken => -1007,
            Self::UnknownError => -1008,
            Self::SubscriptionsNotAvailable => -1009,
            Self::InvalidConsumption => -1010,
            Self::Other(code) => code,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Human-readable description, e.g. `"7:Item Already Owned"`.
    pub fn description(self) -> String {
        let text = match self {
            Self::Ok => "OK",
            Self::UserCanceled => "User Canceled",
            Self::Unknown => "Unknown",
            Self::BillingUnavailable => "Billing Unavailable",
            Self::ItemUnavailable => "Item unavailable",
            Self::DeveloperError => "Developer Error",
            Self::Error => "Error",
            Self::ItemAlreadyOwned => "Item Already Owned",
            Self::ItemNotOwned => "Item not owned",
            Self::TransportError => "Transport error",
            Self::RemoteException => "Remote exception during initialization",
            Self::BadResponse => "Bad response received",
            Self::VerificationFailed => "Purchase signature verification failed",
            Self::SendIntentFailed => "Send intent failed",
            Self::UserCancelled => "User cancelled",
            Self::UnknownPurchaseResponse => "Unknown purchase response",
            Self::MissingToken => "Missing token",
            Self::UnknownError => "Unknown error",
            Self::SubscriptionsNotAvailable => "Subscriptions not available",
            Self::InvalidConsumption => "Invalid consumption attempt",
            Self::Other(code) if code <= -1000 => "Unknown IAB Helper Error",
            Self::Other(_) => "Unknown",
        };
        format!("{}:{}", self.code(), text)
    }
}

impl From<i32> for ResponseCode {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl From<ResponseCode> for i32 {
    fn from(code: ResponseCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
