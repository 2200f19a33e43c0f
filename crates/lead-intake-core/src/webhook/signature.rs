//! HMAC-SHA256 [`SignatureVerifier`] backed by a configuration-supplied secret.

use super::{SignatureCheck, SignatureError, SignaturePolicy, SignatureVerifier};
use crate::secret::SecretValue;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};

type HmacSha256 = Hmac<Sha256>;

/// Verifies the `X-Cal-Signature-256` header: lowercase hex of
/// HMAC-SHA256(secret, raw body).
///
/// # Examples
///
/// ```rust
/// use lead_intake_core::{HmacSignatureVerifier, SecretValue, SignaturePolicy};
///
/// let verifier = HmacSignatureVerifier::new(
///     SecretValue::from_string("shared-secret".to_string()),
///     SignaturePolicy::Optional,
/// )
/// .unwrap();
/// ```
pub struct HmacSignatureVerifier {
    secret: SecretValue,
    policy: SignaturePolicy,
}

impl HmacSignatureVerifier {
    /// Construct a verifier from the configured secret.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::MissingSecret`] when the secret is blank.
    pub fn new(secret: SecretValue, policy: SignaturePolicy) -> Result<Self, SignatureError> {
        if secret.is_empty() {
            return Err(SignatureError::MissingSecret);
        }

        Ok(Self { secret, policy })
    }

    fn digest(&self, payload: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_bytes())
            .map_err(|_| SignatureError::MissingSecret)?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for HmacSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSignatureVerifier")
            .field("secret", &"<REDACTED>")
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl SignatureVerifier for HmacSignatureVerifier {
    #[instrument(skip(self, payload, signature), fields(body_len = payload.len()))]
    async fn verify(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<SignatureCheck, SignatureError> {
        let signature = signature.map(str::trim).filter(|s| !s.is_empty());

        let Some(signature) = signature else {
            return match self.policy {
                SignaturePolicy::Optional => {
                    debug!("No signature header sent; verification skipped");
                    Ok(SignatureCheck::Skipped)
                }
                SignaturePolicy::Required => Err(SignatureError::Missing),
            };
        };

        let provided = hex::decode(signature).map_err(|_| SignatureError::MalformedHeader)?;
        let expected = self.digest(payload)?;

        if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            Ok(SignatureCheck::Verified)
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    fn policy(&self) -> SignaturePolicy {
        self.policy
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
