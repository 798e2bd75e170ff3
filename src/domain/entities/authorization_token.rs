use serde::{Deserialize, Serialize};

/// Opaque token the store hands out to start its purchase screen. The engine
/// never inspects it; it is forwarded to the
/// [`PurchaseLauncher`](crate::host::PurchaseLauncher) as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationToken(serde_json::Value);

impl AuthorizationToken {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}
