//! # Lead Upsert Coordinator
//!
//! Decides how each intake path writes to the [`LeadRepository`]:
//!
//! | Path              | Operation        | Conflict on email            |
//! |-------------------|------------------|------------------------------|
//! | Direct submission | plain insert     | surfaced as `Conflict` (409) |
//! | Webhook booking   | upsert-by-email  | interview fields merged      |

use crate::{
    repository::LeadRepository, webhook::InterviewBooking, IntakeError, Lead, LeadStatus,
    LeadUpsert, NewLead,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Shapes the stored fields and chooses insert vs. merge-by-key.
#[derive(Clone)]
pub struct LeadUpsertCoordinator {
    repository: Arc<dyn LeadRepository>,
}

impl LeadUpsertCoordinator {
    /// Create a coordinator over a shared repository handle
    pub fn new(repository: Arc<dyn LeadRepository>) -> Self {
        Self { repository }
    }

    /// Create mode: unconditional insert of a validated submission.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Conflict`] when the email is already stored and
    /// [`IntakeError::Repository`] for any other repository failure.
    #[instrument(skip(self, lead), fields(email = %lead.email, product = %lead.product))]
    pub async fn create(&self, lead: NewLead) -> Result<Vec<Lead>, IntakeError> {
        let rows = self.repository.insert(lead).await.map_err(|e| {
            warn!(error = %e, "Lead insert failed");
            IntakeError::from(e)
        })?;

        info!(rows = rows.len(), "Lead submitted");
        Ok(rows)
    }

    /// Merge-by-key mode: record an interview booking on the lead with the
    /// booking's email, creating the lead when none exists.
    ///
    /// Only the booking fields are written; name, company, team size and use
    /// case of an existing lead are left untouched.
    #[instrument(skip(self, booking), fields(email = %booking.email, product = %booking.product))]
    pub async fn merge_booking(&self, booking: InterviewBooking) -> Result<Vec<Lead>, IntakeError> {
        let record = LeadUpsert {
            email: booking.email,
            product: booking.product,
            interview_scheduled: true,
            interview_slot: booking.interview_slot,
            cal_event_id: booking.cal_event_id,
            status: LeadStatus::InterviewScheduled,
        };

        let rows = self.repository.upsert(record).await.map_err(|e| {
            warn!(error = %e, "Lead upsert failed");
            IntakeError::from(e)
        })?;

        info!(rows = rows.len(), "Lead updated with interview");
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
