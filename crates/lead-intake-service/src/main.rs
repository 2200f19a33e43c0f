//! # Lead Intake Service
//!
//! Binary entry point for the lead intake HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes structured logging
//! - Creates the lead repository and intake pipeline
//! - Starts the HTTP server from lead-intake-api

use lead_intake_api::{start_server, LoggingConfig, ServiceError};
use lead_intake_service::{build_intake, exit_code, init_tracing, load_configuration};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let loaded = load_configuration();

    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    init_tracing(&logging);

    info!("Starting Lead Intake Service");

    let service_config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(exit_code(&ServiceError::Configuration(e)));
        }
    };

    let intake = match build_intake(&service_config) {
        Ok(intake) => intake,
        Err(e) => {
            error!(error = %e, "Failed to build intake pipeline; aborting");
            std::process::exit(exit_code(&e));
        }
    };

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        webhook_path = %service_config.webhooks.endpoint_path,
        submission_path = %service_config.submissions.endpoint_path,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, intake).await {
        error!(error = %e, "Server terminated with error");
        std::process::exit(exit_code(&e));
    }
}
