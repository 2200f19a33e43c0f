//! # Lead Intake Core
//!
//! Core business logic for the lead intake and reconciliation service.
//!
//! Leads arrive through two entry points: a direct submission form and a
//! scheduling-webhook callback. Both are reconciled into a single record per
//! lead, keyed by email address.
//!
//! ## Architecture
//!
//! The core follows clean architecture principles:
//! - Business logic depends only on trait abstractions ([`LeadRepository`],
//!   [`webhook::SignatureVerifier`])
//! - Infrastructure implementations live in [`adapters`] and are injected at runtime
//! - HTTP concerns (status codes, CORS, routing) live in `lead-intake-api`
//!
//! ## Usage
//!
//! ```rust
//! use lead_intake_core::{Email, Product};
//!
//! let email = Email::new("ada@example.com").unwrap();
//! let product: Product = "cloud".parse().unwrap();
//! assert_eq!(email.as_str(), "ada@example.com");
//! assert_eq!(product, Product::Cloud);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use uuid::Uuid;

/// Standard result type for lead intake operations
pub type IntakeResult<T> = Result<T, IntakeError>;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Repository-assigned identifier of a stored lead row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(Uuid);

impl LeadId {
    /// Generate a new random lead ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Email address identifying a lead
///
/// The email is the unique key of a lead. Surrounding whitespace is removed;
/// otherwise the value is stored exactly as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Create a new email with validation
    ///
    /// # Validation Rules
    /// - Must not be empty after trimming whitespace
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "email".to_string(),
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Email {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

// ============================================================================
// Classification Types
// ============================================================================

/// Product line a lead is associated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Cloud,
    Live,
}

impl Product {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = ParseError;

    /// Parse a product value. Matching is exact: `"Cloud"` is not a product.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cloud" => Ok(Self::Cloud),
            "live" => Ok(Self::Live),
            _ => Err(ParseError::InvalidFormat {
                expected: "cloud or live".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a lead
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Submitted through the form, no interview booked yet
    #[default]
    New,
    /// An interview was booked through the scheduling system
    InterviewScheduled,
}

impl LeadStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InterviewScheduled => "interview_scheduled",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Team size as submitted by the lead: either a number or a free-form
/// bracket such as `"11-50"`.
///
/// Numbers are kept exactly as sent, fractional or negative included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TeamSize {
    Count(serde_json::Number),
    Label(String),
}

impl TeamSize {
    /// Drop empty labels so that `""` is stored as absent.
    pub fn non_empty(self) -> Option<Self> {
        match self {
            Self::Label(label) if label.trim().is_empty() => None,
            other => Some(other),
        }
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// UTC timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse timestamp from RFC3339 string
    pub fn from_rfc3339(s: &str) -> Result<Self, ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|_| ParseError::InvalidFormat {
                expected: "RFC3339 datetime".to_string(),
                actual: s.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// ============================================================================
// Lead Types
// ============================================================================

/// A stored lead row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub created_at: Timestamp,
    pub email: Email,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub team_size: Option<TeamSize>,
    #[serde(default)]
    pub use_case: Option<String>,
    pub product: Product,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub interview_scheduled: bool,
    #[serde(default)]
    pub interview_slot: Option<Timestamp>,
    #[serde(default)]
    pub cal_event_id: Option<String>,
}

/// Fields written by a direct submission (plain insert)
///
/// `status` and `interview_scheduled` are deliberately absent: the
/// repository defaults apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLead {
    pub email: Email,
    pub name: Option<String>,
    pub company: Option<String>,
    pub team_size: Option<TeamSize>,
    pub use_case: Option<String>,
    pub product: Product,
}

/// Fields written by a webhook booking (upsert keyed on email)
///
/// On conflict exactly these fields are updated. `None` values are omitted
/// from the write and leave the stored column untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadUpsert {
    pub email: Email,
    pub product: Product,
    pub interview_scheduled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_slot: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cal_event_id: Option<String>,
    pub status: LeadStatus,
}

// ============================================================================
// Error Types
// ============================================================================

/// High-level error categorization for logging and alerting decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Authentication failures
    Security,
    /// Bad input that will not succeed on replay
    Permanent,
    /// The request collides with existing state
    Conflict,
    /// Infrastructure failures that may succeed later
    Transient,
}

/// Error type for input validation failures
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

/// Top-level error type for lead intake operations
///
/// The `Display` text of the client-facing variants is the exact message
/// returned in the `error` field of the HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Invalid signature")]
    InvalidSignature(#[from] webhook::SignatureError),

    #[error("Email and product are required")]
    MissingField { fields: Vec<&'static str> },

    #[error("Email not found")]
    EmailNotFound,

    #[error("Product must be cloud or live")]
    InvalidProduct { value: String },

    #[error("A lead with this email already exists")]
    Conflict { email: String },

    #[error("{0}")]
    Repository(RepositoryError),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("{message}")]
    Internal { message: String },
}

impl IntakeError {
    /// Get error category for monitoring and alerting
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSignature(_) => ErrorCategory::Security,
            Self::MissingField { .. } => ErrorCategory::Permanent,
            Self::EmailNotFound => ErrorCategory::Permanent,
            Self::InvalidProduct { .. } => ErrorCategory::Permanent,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Repository(_) => ErrorCategory::Transient,
            Self::MalformedPayload(_) => ErrorCategory::Permanent,
            Self::Internal { .. } => ErrorCategory::Transient,
        }
    }
}

impl From<RepositoryError> for IntakeError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict { email } => Self::Conflict { email },
            other => Self::Repository(other),
        }
    }
}

impl From<webhook::ExtractionError> for IntakeError {
    fn from(error: webhook::ExtractionError) -> Self {
        match error {
            webhook::ExtractionError::EmailNotFound { .. } => Self::EmailNotFound,
        }
    }
}

// ============================================================================
// Module declarations
// ============================================================================

/// Webhook authentication and payload extraction
pub mod webhook;

/// Direct-submission request validation
pub mod submission;

/// Lead repository abstraction
pub mod repository;

/// Insert / merge-by-key decisions against the repository
pub mod coordinator;

/// Per-request orchestration of the intake pipeline
pub mod intake;

/// Configuration-supplied secrets
pub mod secret;

/// Repository implementations
pub mod adapters;

// Re-export key types for convenience
pub use adapters::{InMemoryLeadRepository, PostgrestConfig, PostgrestLeadRepository};
pub use coordinator::LeadUpsertCoordinator;
pub use intake::{IntakeProcessor, LeadIntake};
pub use repository::{LeadRepository, RepositoryError};
pub use secret::SecretValue;
pub use submission::{LeadSubmission, RequestValidator};
pub use webhook::{
    HmacSignatureVerifier, InterviewBooking, PayloadExtractor, SignatureCheck, SignatureError,
    SignaturePolicy, SignatureVerifier,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
