//! # Direct Submission Validation
//!
//! Validates the flat JSON body posted by the lead form and turns it into a
//! [`NewLead`] ready for insertion.

use crate::{Email, IntakeError, NewLead, Product, TeamSize};
use serde::Deserialize;
use serde_json::Value;

/// Body of a direct lead submission, exactly as posted.
///
/// Fields are kept as raw JSON so that any value type reaches
/// [`RequestValidator`], which decides what is required and how scalars are
/// stored. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LeadSubmission {
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub company: Option<Value>,
    #[serde(default)]
    pub team_size: Option<Value>,
    #[serde(default)]
    pub use_case: Option<Value>,
    #[serde(default)]
    pub product: Option<Value>,
}

/// Enforces the required-field and product constraints of direct submissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestValidator;

impl RequestValidator {
    /// Validate a submission.
    ///
    /// # Errors
    ///
    /// - [`IntakeError::MissingField`] when `email` is absent or blank, or
    ///   `product` is absent, `null` or empty
    /// - [`IntakeError::InvalidProduct`] when `product` is anything other than
    ///   the string `cloud` or `live`
    pub fn validate(submission: LeadSubmission) -> Result<NewLead, IntakeError> {
        let email = text(submission.email).and_then(|raw| Email::new(raw).ok());
        let product = submission.product.filter(|p| !is_empty(p));

        let (email, product) = match (email, product) {
            (Some(email), Some(product)) => (email, product),
            (email, product) => {
                let mut fields = Vec::new();
                if email.is_none() {
                    fields.push("email");
                }
                if product.is_none() {
                    fields.push("product");
                }
                return Err(IntakeError::MissingField { fields });
            }
        };

        let product = parse_product(product)?;

        Ok(NewLead {
            email,
            name: text(submission.name),
            company: text(submission.company),
            team_size: team_size(submission.team_size),
            use_case: text(submission.use_case),
            product,
        })
    }
}

fn parse_product(value: Value) -> Result<Product, IntakeError> {
    match value {
        Value::String(raw) => raw
            .parse::<Product>()
            .map_err(|_| IntakeError::InvalidProduct { value: raw }),
        other => Err(IntakeError::InvalidProduct {
            value: other.to_string(),
        }),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Free-text column value. Non-string scalars are stored in their JSON text
/// form; `null` and blank strings are stored as absent.
fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn team_size(value: Option<Value>) -> Option<TeamSize> {
    match value? {
        Value::Number(n) => Some(TeamSize::Count(n)),
        other => text(Some(other)).map(TeamSize::Label),
    }
}

#[cfg(test)]
#[path = "submission_tests.rs"]
mod tests;
