//! # In-Memory Lead Repository
//!
//! Thread-safe in-memory implementation for testing and development.
//! Enforces the same email uniqueness and merge semantics as the hosted
//! table, so behavior observed against it carries over.

use crate::{
    repository::{LeadRepository, RepositoryError},
    Email, Lead, LeadId, LeadStatus, LeadUpsert, NewLead, Timestamp,
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::debug;

/// In-memory lead table keyed by email
///
/// Uses RwLock for concurrent access; each operation holds the write lock
/// for its whole read-modify-write, which makes upsert atomic per email.
#[derive(Clone, Default)]
pub struct InMemoryLeadRepository {
    leads: Arc<RwLock<HashMap<Email, Lead>>>,
}

impl InMemoryLeadRepository {
    /// Create new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create repository pre-populated with rows
    pub fn with_leads(leads: impl IntoIterator<Item = Lead>) -> Self {
        let map = leads
            .into_iter()
            .map(|lead| (lead.email.clone(), lead))
            .collect();
        Self {
            leads: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.read().map(|leads| leads.len()).unwrap_or(0)
    }

    /// Check if no rows are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Email, Lead>>, RepositoryError> {
        self.leads.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Email, Lead>>, RepositoryError> {
        self.leads.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Unavailable {
        message: "lead store lock poisoned".to_string(),
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn insert(&self, lead: NewLead) -> Result<Vec<Lead>, RepositoryError> {
        let mut leads = self.write()?;

        if leads.contains_key(&lead.email) {
            return Err(RepositoryError::Conflict {
                email: lead.email.to_string(),
            });
        }

        let row = Lead {
            id: LeadId::new(),
            created_at: Timestamp::now(),
            email: lead.email.clone(),
            name: lead.name,
            company: lead.company,
            team_size: lead.team_size,
            use_case: lead.use_case,
            product: lead.product,
            status: LeadStatus::default(),
            interview_scheduled: false,
            interview_slot: None,
            cal_event_id: None,
        };
        leads.insert(lead.email, row.clone());

        debug!(email = %row.email, "Inserted lead");
        Ok(vec![row])
    }

    async fn upsert(&self, record: LeadUpsert) -> Result<Vec<Lead>, RepositoryError> {
        let mut leads = self.write()?;

        let row = leads
            .entry(record.email.clone())
            .and_modify(|existing| {
                existing.product = record.product;
                existing.interview_scheduled = record.interview_scheduled;
                existing.status = record.status;
                if let Some(slot) = record.interview_slot {
                    existing.interview_slot = Some(slot);
                }
                if let Some(event_id) = &record.cal_event_id {
                    existing.cal_event_id = Some(event_id.clone());
                }
            })
            .or_insert_with(|| Lead {
                id: LeadId::new(),
                created_at: Timestamp::now(),
                email: record.email.clone(),
                name: None,
                company: None,
                team_size: None,
                use_case: None,
                product: record.product,
                status: record.status,
                interview_scheduled: record.interview_scheduled,
                interview_slot: record.interview_slot,
                cal_event_id: record.cal_event_id.clone(),
            })
            .clone();

        debug!(email = %row.email, "Upserted lead");
        Ok(vec![row])
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Lead>, RepositoryError> {
        Ok(self.read()?.get(email).cloned())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
#[path = "memory_repository_tests.rs"]
mod tests;
