//! Configuration-supplied secret values.
//!
//! Secrets (the webhook HMAC key, the repository service key) are loaded from
//! configuration at startup and never compiled into the binary.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret value container
///
/// The content is excluded from `Debug` and `Serialize` output and is
/// zeroed when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue {
    inner: String,
}

impl SecretValue {
    /// Create secret value from string
    pub fn from_string(value: String) -> Self {
        Self { inner: value }
    }

    /// Get secret as string (only for immediate use)
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// Get secret as bytes
    pub fn expose_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Check if secret is empty
    pub fn is_empty(&self) -> bool {
        self.inner.trim().is_empty()
    }

    /// Get secret length without exposing content
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_is_redacted() {
        let secret = SecretValue::from_string("hunter2".to_string());
        let debug = format!("{:?}", secret);

        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_serialize_is_redacted() {
        let secret = SecretValue::from_string("hunter2".to_string());
        assert_eq!(serde_json::to_value(&secret).unwrap(), "[REDACTED]");
    }

    #[test]
    fn test_deserialize_from_plain_string() {
        let secret: SecretValue = serde_json::from_str(r#""hunter2""#).unwrap();
        assert_eq!(secret.expose_secret(), "hunter2");
        assert!(!secret.is_empty());
    }

    #[test]
    fn test_whitespace_secret_counts_as_empty() {
        assert!(SecretValue::from_string("  ".to_string()).is_empty());
    }
}
