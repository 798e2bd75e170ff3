use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

use crate::{
    constants::{
        BAZAAR_BIND_ADDRESS, BAZAAR_PACKAGE, DEFAULT_API_VERSION, DEFAULT_CONSUME_TIMEOUT,
        MYKET_BIND_ADDRESS, MYKET_PACKAGE,
    },
    errors::BillingError,
    security::SignatureAlgorithm,
};

/// The store application to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Package name of the store application. Broadcast actions are
    /// prefixed with it.
    pub package: String,
    /// Address the bound billing service is exposed under.
    pub bind_address: String,
}

impl StoreConfig {
    pub fn bazaar() -> Self {
        Self {
            package: BAZAAR_PACKAGE.to_string(),
            bind_address: BAZAAR_BIND_ADDRESS.to_string(),
        }
    }

    pub fn myket() -> Self {
        Self {
            package: MYKET_PACKAGE.to_string(),
            bind_address: MYKET_BIND_ADDRESS.to_string(),
        }
    }

    /// A custom store, bound at `<package>.InAppBillingService.BIND` unless
    /// overridden.
    pub fn custom(package: impl Into<String>) -> Self {
        let package = package.into();
        let bind_address = format!("{package}.InAppBillingService.BIND");
        Self {
            package,
            bind_address,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::bazaar()
    }
}

fn default_api_version() -> i32 {
    DEFAULT_API_VERSION
}

fn default_consume_timeout() -> Duration {
    DEFAULT_CONSUME_TIMEOUT
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Package name of the application selling the items.
    pub package_name: String,
    /// Base64-encoded X.509 RSA public key from the store's developer panel.
    pub public_key: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default = "default_api_version")]
    pub api_version: i32,
    /// Upper bound on a broadcast consume round trip.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_consume_timeout")]
    pub consume_timeout: Duration,
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,
}

impl BillingConfig {
    pub fn new(package_name: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            public_key: public_key.into(),
            store: StoreConfig::default(),
            api_version: DEFAULT_API_VERSION,
            consume_timeout: DEFAULT_CONSUME_TIMEOUT,
            signature_algorithm: SignatureAlgorithm::default(),
        }
    }

    pub fn store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn api_version(mut self, api_version: i32) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn consume_timeout(mut self, timeout: Duration) -> Self {
        self.consume_timeout = timeout;
        self
    }

    pub fn signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature_algorithm = algorithm;
        self
    }

    pub fn validate(&self) -> Result<(), BillingError> {
        if self.package_name.trim().is_empty() {
            return Err(BillingError::Config("package name is empty".to_string()));
        }
        if self.public_key.trim().is_empty() {
            return Err(BillingError::Config("public key is empty".to_string()));
        }
        if self.store.package.trim().is_empty() {
            return Err(BillingError::Config("store package is empty".to_string()));
        }
        Ok(())
    }
}
