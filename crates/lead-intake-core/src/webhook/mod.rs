//! # Webhook Processing Module
//!
//! Authenticates scheduling-system webhooks and derives lead fields from
//! their loosely-structured payloads.
//!
//! - [`SignatureVerifier`] / [`HmacSignatureVerifier`]: HMAC-SHA256 over the
//!   raw request body, compared in constant time.
//! - [`PayloadExtractor`]: ordered, typed fallback rules for email, product
//!   and the interview booking fields.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod extraction;
mod signature;

pub use extraction::{
    EmailSource, Extracted, ExtractionError, InterviewBooking, PayloadExtractor, ProductSource,
};
pub use signature::HmacSignatureVerifier;

/// Header carrying the hex HMAC of the request body
pub const SIGNATURE_HEADER: &str = "x-cal-signature-256";

// ============================================================================
// Signature Types
// ============================================================================

/// What to do when a webhook arrives without a signature header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePolicy {
    /// Unsigned requests are accepted; signed requests must verify.
    #[default]
    Optional,
    /// Every request must carry a valid signature.
    Required,
}

/// Outcome of a successful signature check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The header was present and the digest matched.
    Verified,
    /// No header was sent and the policy allowed it.
    Skipped,
}

/// Reasons a webhook failed authentication
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header is required but was not sent")]
    Missing,

    #[error("signature header is not valid hex")]
    MalformedHeader,

    #[error("HMAC-SHA256 digest does not match")]
    Mismatch,

    #[error("webhook secret is not configured")]
    MissingSecret,
}

// ============================================================================
// Core Operations (Traits)
// ============================================================================

/// Interface for webhook signature verification
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Verify `signature` against the byte-exact request body.
    ///
    /// A missing or blank header is handled according to [`Self::policy`].
    async fn verify(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<SignatureCheck, SignatureError>;

    /// Policy applied to unsigned requests
    fn policy(&self) -> SignaturePolicy;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
