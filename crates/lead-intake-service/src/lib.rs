//! # Lead Intake Service
//!
//! Startup wiring for the lead intake binary: configuration loading, logging
//! initialization, and construction of the repository and intake pipeline.

use lead_intake_api::{ConfigError, LoggingConfig, RepositoryBackend, ServiceConfig, ServiceError};
use lead_intake_core::{
    HmacSignatureVerifier, InMemoryLeadRepository, IntakeProcessor, LeadIntake, LeadRepository,
    PostgrestLeadRepository, SignaturePolicy, SignatureVerifier,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable naming an explicit configuration file
pub const CONFIG_FILE_ENV: &str = "LI_CONFIG_FILE";

/// Prefix of structured environment overrides (`LI__SERVER__PORT=9090`)
pub const ENV_PREFIX: &str = "LI";

/// Conventional deployment variables and the settings they override
const DEPLOYMENT_OVERRIDES: [(&str, &str); 3] = [
    ("SUPABASE_URL", "repository.url"),
    ("SUPABASE_SERVICE_ROLE_KEY", "repository.service_key"),
    ("CAL_WEBHOOK_SECRET", "webhooks.secret"),
];

/// Load and validate the service configuration.
///
/// Sources, later overriding earlier:
///  1. `/etc/lead-intake/service.yaml`
///  2. `./config/service.yaml`
///  3. the file named by `LI_CONFIG_FILE` (must exist when set)
///  4. environment variables prefixed `LI__`, `__` separating sections
///  5. `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY`, `CAL_WEBHOOK_SECRET`
///
/// Every field has a default, so missing files are fine. A malformed file, a
/// value of the wrong type, or a failed [`ServiceConfig::validate`] is an
/// error.
pub fn load_configuration() -> Result<ServiceConfig, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/lead-intake/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(explicit_path) = non_empty_env(CONFIG_FILE_ENV) {
        builder = builder.add_source(config::File::with_name(&explicit_path).required(true));
        info!(path = %explicit_path, "Loading configuration from explicit path");
    }

    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

    for (variable, key) in DEPLOYMENT_OVERRIDES {
        builder = builder
            .set_override_option(key, non_empty_env(variable))
            .map_err(|e| ConfigError::Invalid {
                message: format!("failed to apply {}: {}", variable, e),
            })?;
    }

    let service_config: ServiceConfig = builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;

    service_config.validate()?;
    Ok(service_config)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}

/// Build the lead repository selected by `repository.backend`.
pub fn build_repository(config: &ServiceConfig) -> Result<Arc<dyn LeadRepository>, ServiceError> {
    match config.repository.backend {
        RepositoryBackend::Memory => {
            warn!("Using in-memory lead repository; leads are lost on restart");
            Ok(Arc::new(InMemoryLeadRepository::new()))
        }
        RepositoryBackend::Postgrest => {
            let postgrest = config.repository.postgrest_config()?;
            info!(
                url = %postgrest.url,
                table = %postgrest.table,
                "Using PostgREST lead repository"
            );
            let repository =
                PostgrestLeadRepository::new(postgrest).map_err(|e| ConfigError::Invalid {
                    message: e.to_string(),
                })?;
            Ok(Arc::new(repository))
        }
    }
}

/// Build the intake pipeline: signature verifier plus repository.
pub fn build_intake(config: &ServiceConfig) -> Result<Arc<dyn LeadIntake>, ServiceError> {
    let secret = config
        .webhooks
        .secret
        .clone()
        .ok_or_else(|| ConfigError::Missing {
            key: "webhooks.secret".to_string(),
        })?;

    let verifier = HmacSignatureVerifier::new(secret, config.webhooks.signature_policy())
        .map_err(|e| ConfigError::Invalid {
            message: format!("webhooks.secret: {}", e),
        })?;
    if verifier.policy() == SignaturePolicy::Optional {
        warn!(
            endpoint = %config.webhooks.endpoint_path,
            "Unsigned webhook deliveries are accepted; set webhooks.require_signature to reject them"
        );
    }

    let repository = build_repository(config)?;

    Ok(Arc::new(IntakeProcessor::new(Arc::new(verifier), repository)))
}

/// Process exit code for a startup or runtime failure
pub fn exit_code(error: &ServiceError) -> i32 {
    match error {
        ServiceError::BindFailed { .. } => 1,
        ServiceError::ServerFailed { .. } => 2,
        ServiceError::Configuration(_) => 3,
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
