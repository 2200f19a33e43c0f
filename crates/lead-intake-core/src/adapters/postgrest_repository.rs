//! # PostgREST Lead Repository
//!
//! Stores leads in a hosted Postgres table exposed through PostgREST
//! (`{url}/rest/v1/{table}`), authenticated with a service key.
//!
//! The table must carry a unique constraint on `email`; upsert relies on it
//! through `on_conflict=email`.

use crate::{
    repository::{LeadRepository, RepositoryError},
    Email, Lead, LeadUpsert, NewLead, SecretValue,
};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    RequestBuilder, Response, StatusCode,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

const PREFER_INSERT: &str = "return=representation";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=representation";

/// Connection settings for [`PostgrestLeadRepository`]
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    pub url: Url,
    /// Service-role key sent as `apikey` and bearer token
    pub service_key: SecretValue,
    /// Table name
    pub table: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl PostgrestConfig {
    pub fn new(url: Url, service_key: SecretValue) -> Self {
        Self {
            url,
            service_key,
            table: "leads".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.url.as_str().trim_end_matches('/'),
            self.table
        )
    }
}

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    message: Option<String>,
}

/// [`LeadRepository`] backed by a PostgREST endpoint
#[derive(Debug, Clone)]
pub struct PostgrestLeadRepository {
    config: PostgrestConfig,
    endpoint: String,
    http_client: reqwest::Client,
}

impl PostgrestLeadRepository {
    /// Build the repository and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Configuration` if the service key is blank
    /// or the HTTP client cannot be created.
    pub fn new(config: PostgrestConfig) -> Result<Self, RepositoryError> {
        if config.service_key.is_empty() {
            return Err(RepositoryError::Configuration {
                message: "service key is empty".to_string(),
            });
        }
        if config.table.trim().is_empty() {
            return Err(RepositoryError::Configuration {
                message: "table name is empty".to_string(),
            });
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(Self::auth_headers(&config.service_key)?)
            .build()
            .map_err(|e| RepositoryError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            endpoint: config.table_url(),
            config,
            http_client,
        })
    }

    fn auth_headers(key: &SecretValue) -> Result<HeaderMap, RepositoryError> {
        let invalid = |_| RepositoryError::Configuration {
            message: "service key contains invalid header characters".to_string(),
        };

        let mut apikey = HeaderValue::from_str(key.expose_secret()).map_err(invalid)?;
        apikey.set_sensitive(true);
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {}", key.expose_secret())).map_err(invalid)?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Send a request and decode the returned rows.
    async fn send_rows(
        &self,
        request: RequestBuilder,
        email: &Email,
    ) -> Result<Vec<Lead>, RepositoryError> {
        let response = request.send().await.map_err(transport_error)?;
        let response = check_status(response, email).await?;

        response
            .json::<Vec<Lead>>()
            .await
            .map_err(|e| RepositoryError::InvalidResponse {
                message: format!("Failed to decode rows: {}", e),
            })
    }
}

fn transport_error(error: reqwest::Error) -> RepositoryError {
    RepositoryError::Unavailable {
        message: error.to_string(),
    }
}

async fn check_status(response: Response, email: &Email) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::CONFLICT {
        return Err(RepositoryError::Conflict {
            email: email.to_string(),
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<PostgrestErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("Request failed with status {}", status.as_u16())
            } else {
                body
            }
        });

    warn!(status = status.as_u16(), message = %message, "PostgREST request failed");
    Err(RepositoryError::Request {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl LeadRepository for PostgrestLeadRepository {
    #[instrument(skip(self, lead), fields(email = %lead.email))]
    async fn insert(&self, lead: NewLead) -> Result<Vec<Lead>, RepositoryError> {
        let request = self
            .http_client
            .post(&self.endpoint)
            .header("Prefer", PREFER_INSERT)
            .json(&[&lead]);

        let rows = self.send_rows(request, &lead.email).await?;
        debug!(rows = rows.len(), "Inserted lead");
        Ok(rows)
    }

    #[instrument(skip(self, record), fields(email = %record.email))]
    async fn upsert(&self, record: LeadUpsert) -> Result<Vec<Lead>, RepositoryError> {
        let request = self
            .http_client
            .post(&self.endpoint)
            .query(&[("on_conflict", "email")])
            .header("Prefer", PREFER_UPSERT)
            .json(&[&record]);

        let rows = self.send_rows(request, &record.email).await?;
        debug!(rows = rows.len(), "Upserted lead");
        Ok(rows)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Lead>, RepositoryError> {
        let filter = format!("eq.{}", email.as_str());
        let request = self
            .http_client
            .get(&self.endpoint)
            .query(&[("email", filter.as_str()), ("select", "*")]);

        let rows = self.send_rows(request, email).await?;
        Ok(rows.into_iter().next())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable {
                message: format!(
                    "{} returned status {}",
                    self.config.table,
                    status.as_u16()
                ),
            })
        }
    }
}

#[cfg(test)]
#[path = "postgrest_repository_tests.rs"]
mod tests;
