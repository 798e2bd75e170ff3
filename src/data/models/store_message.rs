use serde::{Deserialize, Serialize};

use crate::constants::REPLY_SUFFIX;

use super::bundle::Bundle;

/// A broadcast message exchanged with the store: an action string plus its
/// extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMessage {
    pub action: String,
    #[serde(default)]
    pub extras: Bundle,
}

impl StoreMessage {
    pub fn new(action: impl Into<String>, extras: Bundle) -> Self {
        Self {
            action: action.into(),
            extras,
        }
    }
}

/// Message kinds of the broadcast protocol. Outbound actions are
/// `<store package><suffix>`; replies reuse the same action, optionally
/// followed by `.iab`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastAction {
    Ping,
    BillingSupport,
    Purchase,
    SkuDetail,
    GetPurchase,
    Consume,
}

impl BroadcastAction {
    const ALL: [BroadcastAction; 6] = [
        BroadcastAction::Ping,
        BroadcastAction::BillingSupport,
        BroadcastAction::Purchase,
        BroadcastAction::SkuDetail,
        BroadcastAction::GetPurchase,
        BroadcastAction::Consume,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            BroadcastAction::Ping => ".ping",
            BroadcastAction::BillingSupport => ".billingSupport",
            BroadcastAction::Purchase => ".purchase",
            BroadcastAction::SkuDetail => ".skuDetail",
            BroadcastAction::GetPurchase => ".getPurchase",
            BroadcastAction::Consume => ".consume",
        }
    }

    pub fn action_for(self, store_package: &str) -> String {
        format!("{store_package}{}", self.suffix())
    }

    /// Identifies a reply from `store_package`. Actions belonging to another
    /// store yield `None`.
    pub fn parse(action: &str, store_package: &str) -> Option<Self> {
        let rest = action.strip_prefix(store_package)?;
        let rest = rest.strip_suffix(REPLY_SUFFIX).unwrap_or(rest);
        Self::ALL.into_iter().find(|a| a.suffix() == rest)
    }
}
