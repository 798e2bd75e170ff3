use std::{fmt, str::FromStr};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use openssl::{
    hash::MessageDigest,
    pkey::{PKey, Public},
    sign::Verifier,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::BillingError;

/// Checks that purchase data was signed by the store.
pub trait ReceiptVerifier: Send + Sync {
    fn verify(&self, signed_data: &str, signature: &str) -> Result<(), BillingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[default]
    #[serde(rename = "SHA1withRSA")]
    Sha1WithRsa,
    #[serde(rename = "SHA256withRSA")]
    Sha256WithRsa,
}

impl SignatureAlgorithm {
    fn digest(self) -> MessageDigest {
        match self {
            SignatureAlgorithm::Sha1WithRsa => MessageDigest::sha1(),
            SignatureAlgorithm::Sha256WithRsa => MessageDigest::sha256(),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureAlgorithm::Sha1WithRsa => f.write_str("SHA1withRSA"),
            SignatureAlgorithm::Sha256WithRsa => f.write_str("SHA256withRSA"),
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHA1withRSA" => Ok(SignatureAlgorithm::Sha1WithRsa),
            "SHA256withRSA" => Ok(SignatureAlgorithm::Sha256WithRsa),
            other => Err(BillingError::Config(format!(
                "unsupported signature algorithm '{other}'"
            ))),
        }
    }
}

/// Verifies receipts against the store's base64-encoded X.509 RSA public key.
pub struct RsaReceiptVerifier {
    key: PKey<Public>,
    algorithm: SignatureAlgorithm,
}

impl RsaReceiptVerifier {
    pub fn from_base64(
        public_key: &str,
        algorithm: SignatureAlgorithm,
    ) -> Result<Self, BillingError> {
        let der = STANDARD
            .decode(public_key.trim())
            .map_err(|e| BillingError::InvalidPublicKey(e.to_string()))?;
        let key = PKey::public_key_from_der(&der)
            .map_err(|e| BillingError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { key, algorithm })
    }

    fn check(&self, signed_data: &str, signature: &[u8]) -> Result<bool, openssl::error::ErrorStack> {
        let mut verifier = Verifier::new(self.algorithm.digest(), &self.key)?;
        verifier.update(signed_data.as_bytes())?;
        verifier.verify(signature)
    }
}

impl ReceiptVerifier for RsaReceiptVerifier {
    fn verify(&self, signed_data: &str, signature: &str) -> Result<(), BillingError> {
        if signed_data.is_empty() || signature.is_empty() {
            warn!("Purchase verification failed: missing data.");
            return Err(BillingError::VerificationFailed(
                "missing signed data or signature".to_string(),
            ));
        }
        let signature = STANDARD.decode(signature).map_err(|e| {
            warn!(error = %e, "Base64 decoding of signature failed.");
            BillingError::VerificationFailed("signature is not valid base64".to_string())
        })?;
        match self.check(signed_data, &signature) {
            Ok(true) => {
                debug!(algorithm = %self.algorithm, "Signature verified.");
                Ok(())
            }
            Ok(false) => {
                warn!("Signature verification failed.");
                Err(BillingError::VerificationFailed(
                    "signature does not match".to_string(),
                ))
            }
            Err(e) => {
                warn!(error = %e, "Signature verification errored.");
                Err(BillingError::VerificationFailed(e.to_string()))
            }
        }
    }
}
