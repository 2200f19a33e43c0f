//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use axum::http::HeaderValue;
use lead_intake_core::{PostgrestConfig, SecretValue, SignaturePolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Scheduling webhook settings
    pub webhooks: WebhookConfig,

    /// Direct submission settings
    pub submissions: SubmissionConfig,

    /// Lead storage settings
    pub repository: RepositoryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot start with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` for absent secrets or repository
    /// settings and `ConfigError::Invalid` for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.webhooks.secret {
            Some(secret) if !secret.is_empty() => {}
            _ => {
                return Err(ConfigError::Missing {
                    key: "webhooks.secret".to_string(),
                })
            }
        }

        for (key, path) in [
            ("webhooks.endpoint_path", &self.webhooks.endpoint_path),
            ("submissions.endpoint_path", &self.submissions.endpoint_path),
        ] {
            if !path.starts_with('/') || path.len() < 2 {
                return Err(ConfigError::Invalid {
                    message: format!("{} must be an absolute path, got '{}'", key, path),
                });
            }
            if path == HEALTH_PATH {
                return Err(ConfigError::Invalid {
                    message: format!("{} must not be {}", key, HEALTH_PATH),
                });
            }
        }

        if self.webhooks.endpoint_path == self.submissions.endpoint_path {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhook and submission endpoints share the path '{}'",
                    self.webhooks.endpoint_path
                ),
            });
        }

        if HeaderValue::from_str(&self.submissions.allowed_origin).is_err() {
            return Err(ConfigError::Invalid {
                message: "submissions.allowed_origin is not a valid header value".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server.request_timeout_seconds must be greater than zero".to_string(),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        if self.repository.backend == RepositoryBackend::Postgrest {
            self.repository.postgrest_config()?;
        }

        Ok(())
    }
}

/// Path of the health endpoint
pub const HEALTH_PATH: &str = "/health";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Upper bound on a single intake request, repository call included
    pub request_timeout_seconds: u64,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_seconds: 30,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Scheduling webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Reject callbacks that carry no signature header
    pub require_signature: bool,

    /// Shared HMAC secret
    pub secret: Option<SecretValue>,
}

impl WebhookConfig {
    pub fn signature_policy(&self) -> SignaturePolicy {
        if self.require_signature {
            SignaturePolicy::Required
        } else {
            SignaturePolicy::Optional
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/cal-webhook".to_string(),
            require_signature: false,
            secret: None,
        }
    }
}

/// Direct submission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Submission endpoint path
    pub endpoint_path: String,

    /// Value of `Access-Control-Allow-Origin` on submission responses
    pub allowed_origin: String,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/submit-lead".to_string(),
            allowed_origin: "*".to_string(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryBackend {
    /// Process-local table, lost on restart
    Memory,
    /// Hosted Postgres through PostgREST
    #[default]
    Postgrest,
}

/// Lead storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub backend: RepositoryBackend,

    /// PostgREST project URL
    pub url: Option<String>,

    /// PostgREST service-role key
    pub service_key: Option<SecretValue>,

    /// Table holding the leads
    pub table: String,

    /// Per-request timeout for repository calls
    pub timeout_seconds: u64,
}

impl RepositoryConfig {
    /// Build the PostgREST connection settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when the URL or service key is absent
    /// and `ConfigError::Invalid` when the URL does not parse.
    pub fn postgrest_config(&self) -> Result<PostgrestConfig, ConfigError> {
        let raw_url = self
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                key: "repository.url".to_string(),
            })?;
        let url = Url::parse(raw_url.trim()).map_err(|e| ConfigError::Invalid {
            message: format!("repository.url '{}' is not a valid URL: {}", raw_url, e),
        })?;

        let service_key = self
            .service_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                key: "repository.service_key".to_string(),
            })?;

        if self.table.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "repository.table".to_string(),
            });
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "repository.timeout_seconds must be greater than zero".to_string(),
            });
        }

        Ok(PostgrestConfig {
            url,
            service_key,
            table: self.table.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
        })
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            backend: RepositoryBackend::default(),
            url: None,
            service_key: None,
            table: "leads".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level, used when `RUST_LOG` is not set
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
