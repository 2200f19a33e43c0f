//! Field extraction from scheduling-webhook payloads.
//!
//! Each fallback rule is a variant of a source enum. Sources are evaluated in
//! their `PRIORITY` order and the first one that yields a usable value wins.

use crate::{Email, Product, Timestamp};
use serde_json::Value;
use tracing::{debug, warn};

/// A value together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<T, S> {
    pub value: T,
    pub source: S,
}

/// Errors during field extraction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no email found at any of: {}", .searched.join(", "))]
    EmailNotFound { searched: Vec<&'static str> },
}

// ============================================================================
// Email sources
// ============================================================================

/// Locations an attendee email may appear in a booking payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSource {
    /// `responses.email` as a plain string
    ResponsesEmail,
    /// `attendees[0].email`
    FirstAttendee,
    /// `responses.email.value` (booking-form field wrapped in an object)
    ResponsesEmailValue,
}

impl EmailSource {
    /// Evaluation order
    pub const PRIORITY: [Self; 3] = [
        Self::ResponsesEmail,
        Self::FirstAttendee,
        Self::ResponsesEmailValue,
    ];

    /// JSON pointer to the field
    pub fn pointer(&self) -> &'static str {
        match self {
            Self::ResponsesEmail => "/responses/email",
            Self::FirstAttendee => "/attendees/0/email",
            Self::ResponsesEmailValue => "/responses/email/value",
        }
    }

    /// Read this source from the payload. Absent, non-string and blank
    /// values all yield `None`.
    pub fn extract(&self, payload: &Value) -> Option<Email> {
        payload
            .pointer(self.pointer())
            .and_then(Value::as_str)
            .and_then(|raw| Email::new(raw).ok())
    }
}

// ============================================================================
// Product sources
// ============================================================================

/// Rules for classifying a booking into a product line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSource {
    /// `metadata.product`, typically a booking-link query parameter
    Metadata,
    /// `responses.product`, as a string or a `{ "value": ... }` object
    Responses,
    /// `"cloud"` appears (any case) in `eventType.title`
    EventTitle,
    /// Nothing matched
    Default,
}

impl ProductSource {
    /// Evaluation order
    pub const PRIORITY: [Self; 4] = [
        Self::Metadata,
        Self::Responses,
        Self::EventTitle,
        Self::Default,
    ];

    /// Read this source from the payload.
    ///
    /// Explicit values that are not a known product are treated as absent so
    /// that evaluation falls through to the next rule.
    pub fn extract(&self, payload: &Value) -> Option<Product> {
        match self {
            Self::Metadata => explicit_product(payload, "/metadata/product"),
            Self::Responses => explicit_product(payload, "/responses/product")
                .or_else(|| explicit_product(payload, "/responses/product/value")),
            Self::EventTitle => payload
                .pointer("/eventType/title")
                .and_then(Value::as_str)
                .filter(|title| title.to_lowercase().contains("cloud"))
                .map(|_| Product::Cloud),
            Self::Default => Some(Product::Live),
        }
    }
}

fn explicit_product(payload: &Value, pointer: &str) -> Option<Product> {
    let raw = payload.pointer(pointer)?.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }

    match raw.parse::<Product>() {
        Ok(product) => Some(product),
        Err(_) => {
            warn!(field = pointer, value = raw, "Ignoring unknown product value");
            None
        }
    }
}

// ============================================================================
// InterviewBooking
// ============================================================================

/// Lead fields carried by a booking webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewBooking {
    pub email: Email,
    pub product: Product,
    /// `startTime` of the booking
    pub interview_slot: Option<Timestamp>,
    /// `uid` of the booking in the scheduling system
    pub cal_event_id: Option<String>,
}

// ============================================================================
// PayloadExtractor
// ============================================================================

/// Derives lead fields from a parsed webhook payload.
///
/// # Examples
///
/// ```rust
/// use lead_intake_core::{PayloadExtractor, Product};
/// use serde_json::json;
///
/// let payload = json!({
///     "attendees": [{ "email": "b@x.com" }],
///     "eventType": { "title": "Cloud Demo" }
/// });
///
/// let booking = PayloadExtractor::booking(&payload).unwrap();
/// assert_eq!(booking.email.as_str(), "b@x.com");
/// assert_eq!(booking.product, Product::Cloud);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadExtractor;

impl PayloadExtractor {
    /// Find the attendee email.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::EmailNotFound`] when no source yields a
    /// non-blank string.
    pub fn email(payload: &Value) -> Result<Extracted<Email, EmailSource>, ExtractionError> {
        EmailSource::PRIORITY
            .iter()
            .find_map(|source| {
                source.extract(payload).map(|value| Extracted {
                    value,
                    source: *source,
                })
            })
            .ok_or_else(|| ExtractionError::EmailNotFound {
                searched: EmailSource::PRIORITY
                    .iter()
                    .map(EmailSource::pointer)
                    .collect(),
            })
    }

    /// Classify the booking into a product line. Always succeeds because the
    /// last rule is a default.
    pub fn product(payload: &Value) -> Extracted<Product, ProductSource> {
        ProductSource::PRIORITY
            .iter()
            .find_map(|source| {
                source.extract(payload).map(|value| Extracted {
                    value,
                    source: *source,
                })
            })
            .unwrap_or(Extracted {
                value: Product::Live,
                source: ProductSource::Default,
            })
    }

    /// Derive every lead field a booking carries.
    pub fn booking(payload: &Value) -> Result<InterviewBooking, ExtractionError> {
        let email = Self::email(payload)?;
        let product = Self::product(payload);

        debug!(
            email_source = ?email.source,
            product_source = ?product.source,
            product = %product.value,
            "Extracted booking fields"
        );

        let interview_slot = payload
            .get("startTime")
            .and_then(Value::as_str)
            .and_then(|raw| match Timestamp::from_rfc3339(raw) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    warn!(start_time = raw, error = %e, "Ignoring unparseable startTime");
                    None
                }
            });

        let cal_event_id = payload
            .get("uid")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .map(String::from);

        Ok(InterviewBooking {
            email: email.value,
            product: product.value,
            interview_slot,
            cal_event_id,
        })
    }
}

#[cfg(test)]
#[path = "extraction_tests.rs"]
mod tests;
