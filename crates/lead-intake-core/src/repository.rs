//! # Lead Repository
//!
//! Abstract persistence capability for leads. The repository owns key
//! uniqueness (one row per email) and upsert atomicity; the core never
//! coordinates writes itself.
//!
//! Implementations live in [`crate::adapters`].

use crate::{Email, Lead, LeadUpsert, NewLead};
use async_trait::async_trait;

/// Interface for lead persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Insert a new row. Repository defaults apply to `status` and
    /// `interview_scheduled`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] when a row with the same email
    /// already exists.
    async fn insert(&self, lead: NewLead) -> Result<Vec<Lead>, RepositoryError>;

    /// Insert a row, or update exactly the fields present in `record` on the
    /// row with the same email.
    async fn upsert(&self, record: LeadUpsert) -> Result<Vec<Lead>, RepositoryError>;

    /// Look up the row for an email.
    ///
    /// Not used by the intake pipeline, which relies on the write returning
    /// the stored row. Kept as a read-back lookup for tests and tooling that
    /// inspect stored leads.
    async fn find_by_email(&self, email: &Email) -> Result<Option<Lead>, RepositoryError>;

    /// Check that the backing store is reachable
    async fn health_check(&self) -> Result<(), RepositoryError>;

    /// Release held resources. Called once after the server has shut down.
    async fn close(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Errors raised by repository implementations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("A lead with email '{email}' already exists")]
    Conflict { email: String },

    #[error("{message}")]
    Request { status: u16, message: String },

    #[error("Repository unavailable: {message}")]
    Unavailable { message: String },

    #[error("Unexpected repository response: {message}")]
    InvalidResponse { message: String },

    #[error("Repository configuration error: {message}")]
    Configuration { message: String },
}

impl RepositoryError {
    /// Check if the failure may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Conflict { .. } => false,
            Self::Request { status, .. } => *status >= 500,
            Self::Unavailable { .. } => true,
            Self::InvalidResponse { .. } => false,
            Self::Configuration { .. } => false,
        }
    }
}
