use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::BillingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// One-time (managed) product.
    #[default]
    Inapp,
    /// Recurring subscription.
    Subs,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Inapp => "inapp",
            ItemType::Subs => "subs",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inapp" => Ok(ItemType::Inapp),
            "subs" => Ok(ItemType::Subs),
            other => Err(BillingError::BadResponse(format!(
                "unknown item type '{other}'"
            ))),
        }
    }
}
