//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use lead_intake_core::IntakeError;
use tracing::{error, warn};

/// Intake handler errors with HTTP status code mapping
///
/// Every failure is rendered as `{"error": <message>}`:
///
/// - `401 Unauthorized`: signature missing (when required), malformed or wrong
/// - `400 Bad Request`: missing email/product, no email in a booking,
///   unknown product
/// - `409 Conflict`: a direct submission for an email that is already stored
/// - `500 Internal Server Error`: repository failures, unparseable bodies,
///   timeouts
///
/// Nothing is retried server-side.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Failure raised by the intake pipeline
    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// The intake call did not finish within `server.request_timeout_seconds`
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl HandlerError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Intake(e) => match e {
                IntakeError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
                IntakeError::MissingField { .. }
                | IntakeError::EmailNotFound
                | IntakeError::InvalidProduct { .. } => StatusCode::BAD_REQUEST,
                IntakeError::Conflict { .. } => StatusCode::CONFLICT,
                IntakeError::Repository(_)
                | IntakeError::MalformedPayload(_)
                | IntakeError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Timeout { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        match &self {
            Self::Intake(e) if status.is_server_error() => {
                error!(error = %e, category = ?e.error_category(), "Intake request failed");
            }
            Self::Intake(e) => {
                warn!(error = %e, category = ?e.error_category(), "Intake request rejected");
            }
            Self::Timeout { seconds } => {
                error!(timeout_seconds = seconds, "Intake request timed out");
            }
        }

        error_response(status, message)
    }
}

/// Render `{"error": message}` with the given status
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
