use serde_repr::{Deserialize_repr, Serialize_repr};

/// Client-side statuses delivered through
/// [`BillingListener::on_billing_status`](crate::listener::BillingListener::on_billing_status).
///
/// The integer values are stable and may be forwarded to hosts that expect
/// numeric status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum BillingStatus {
    SetupSuccess = 0,
    SetupFailed = 1,
    InProgress = 2,
    NoNetwork = 3,
    StoreNotInstalled = 4,
    Failed = 5,
    SubscriptionsNotSupported = 6,
    Disposed = 7,
}

impl BillingStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}
