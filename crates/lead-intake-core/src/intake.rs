//! # Intake Pipeline
//!
//! Per-request orchestration of both entry points.
//!
//! Webhook booking:
//! 1. Verify the signature over the raw body bytes
//! 2. Parse the body as JSON
//! 3. Extract email, product and booking details
//! 4. Merge the booking into the lead keyed by email
//!
//! Direct submission:
//! 1. Parse the body as a [`LeadSubmission`]
//! 2. Validate required fields and product
//! 3. Insert the lead
//!
//! Requests are independent; no state is kept between them.

use crate::{
    coordinator::LeadUpsertCoordinator,
    repository::LeadRepository,
    submission::{LeadSubmission, RequestValidator},
    webhook::{PayloadExtractor, SignatureCheck, SignatureVerifier},
    IntakeError, Lead,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Interface for the complete intake pipeline.
///
/// HTTP handlers depend on this trait only.
#[async_trait]
pub trait LeadIntake: Send + Sync {
    /// Handle a scheduling-webhook callback.
    ///
    /// `body` must be the exact bytes received; the signature is computed
    /// over them before any parsing.
    async fn process_booking(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<Vec<Lead>, IntakeError>;

    /// Handle a direct lead submission.
    async fn process_submission(&self, body: &[u8]) -> Result<Vec<Lead>, IntakeError>;

    /// Check that the pipeline's dependencies are reachable.
    async fn health_check(&self) -> Result<(), IntakeError>;

    /// Release held resources.
    async fn close(&self) -> Result<(), IntakeError> {
        Ok(())
    }
}

/// Default [`LeadIntake`] implementation
pub struct IntakeProcessor {
    verifier: Arc<dyn SignatureVerifier>,
    repository: Arc<dyn LeadRepository>,
    coordinator: LeadUpsertCoordinator,
}

impl IntakeProcessor {
    /// Create a new processor.
    pub fn new(verifier: Arc<dyn SignatureVerifier>, repository: Arc<dyn LeadRepository>) -> Self {
        let coordinator = LeadUpsertCoordinator::new(repository.clone());
        Self {
            verifier,
            repository,
            coordinator,
        }
    }
}

#[async_trait]
impl LeadIntake for IntakeProcessor {
    #[instrument(skip(self, body, signature), fields(body_len = body.len()))]
    async fn process_booking(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<Vec<Lead>, IntakeError> {
        match self.verifier.verify(body, signature).await {
            Ok(SignatureCheck::Verified) => debug!("Webhook signature verified"),
            Ok(SignatureCheck::Skipped) => debug!("Webhook accepted without signature"),
            Err(e) => {
                warn!(error = %e, "Webhook signature rejected");
                return Err(e.into());
            }
        }

        let payload: serde_json::Value = serde_json::from_slice(body)?;
        let booking = PayloadExtractor::booking(&payload).map_err(|e| {
            warn!(error = %e, "Webhook payload has no email");
            IntakeError::from(e)
        })?;

        info!(
            email = %booking.email,
            product = %booking.product,
            "Processing interview booking"
        );

        self.coordinator.merge_booking(booking).await
    }

    #[instrument(skip(self, body), fields(body_len = body.len()))]
    async fn process_submission(&self, body: &[u8]) -> Result<Vec<Lead>, IntakeError> {
        let submission: LeadSubmission = serde_json::from_slice(body)?;
        let lead = RequestValidator::validate(submission).map_err(|e| {
            debug!(error = %e, "Submission rejected");
            e
        })?;

        info!(
            email = %lead.email,
            product = %lead.product,
            "Processing lead submission"
        );

        self.coordinator.create(lead).await
    }

    async fn health_check(&self) -> Result<(), IntakeError> {
        self.repository.health_check().await.map_err(IntakeError::from)
    }

    async fn close(&self) -> Result<(), IntakeError> {
        self.repository.close().await.map_err(IntakeError::from)
    }
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
