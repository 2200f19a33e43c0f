//! # Lead Intake HTTP Service
//!
//! HTTP server exposing the two lead intake entry points:
//! - Scheduling webhook endpoint (`POST /cal-webhook`) with HMAC signature check
//! - Direct submission endpoint (`POST /submit-lead`) with CORS headers and
//!   `OPTIONS` preflight
//! - Health check endpoint (`GET /health`)
//!
//! Endpoint paths are configurable; see [`config::ServiceConfig`].

pub mod config;
pub mod errors;
pub mod responses;

pub use config::{
    LoggingConfig, RepositoryBackend, RepositoryConfig, ServerConfig, ServiceConfig,
    SubmissionConfig, WebhookConfig,
};
pub use errors::{ConfigError, HandlerError, ServiceError};
pub use responses::{HealthResponse, LeadResponse};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{
        header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use lead_intake_core::{webhook::SIGNATURE_HEADER, IntakeError, LeadIntake};
use std::{any::Any, future::IntoFuture, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, instrument, warn};

/// Headers a browser may send on a direct submission
pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Intake pipeline shared by both entry points
    pub intake: Arc<dyn LeadIntake>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ServiceConfig, intake: Arc<dyn LeadIntake>) -> Self {
        Self { config, intake }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let allowed_origin = HeaderValue::from_str(&state.config.submissions.allowed_origin)
        .unwrap_or_else(|_| {
            warn!(
                allowed_origin = %state.config.submissions.allowed_origin,
                "Invalid allowed origin, falling back to '*'"
            );
            HeaderValue::from_static("*")
        });

    let max_body_size = state.config.server.max_body_size;

    let webhook_routes = Router::new()
        .route(
            &state.config.webhooks.endpoint_path,
            post(handle_cal_webhook),
        )
        .layer(
            ServiceBuilder::new()
                .layer(middleware::map_response(json_payload_too_large))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_body_size))
                .into_inner(),
        );

    // Body limit sits inside the CORS headers so rejected submissions still
    // carry them.
    let submission_routes = Router::new()
        .route(
            &state.config.submissions.endpoint_path,
            post(handle_submit_lead).options(handle_lead_preflight),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    ACCESS_CONTROL_ALLOW_ORIGIN,
                    allowed_origin,
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(ALLOWED_HEADERS),
                ))
                .layer(middleware::map_response(json_payload_too_large))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_body_size))
                .into_inner(),
        );

    let health_routes = Router::new().route(config::HEALTH_PATH, get(handle_health_check));

    Router::new()
        .merge(webhook_routes)
        .merge(submission_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// Serves until SIGINT or SIGTERM, lets in-flight requests finish for at
/// most `server.shutdown_timeout_seconds`, then closes the intake pipeline.
pub async fn start_server(
    config: ServiceConfig,
    intake: Arc<dyn LeadIntake>,
) -> Result<(), ServiceError> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!(address = %address, "Starting HTTP server");

    let shutdown_timeout = config.server.shutdown_timeout();
    let state = AppState::new(config, intake.clone());
    let app = create_router(state);

    let shutdown_started = Arc::new(tokio::sync::Notify::new());
    let signal = {
        let shutdown_started = shutdown_started.clone();
        async move {
            shutdown_signal().await;
            info!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Initiating graceful shutdown"
            );
            shutdown_started.notify_one();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    let drain_deadline = async {
        shutdown_started.notified().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out, abandoning in-flight requests"
            );
        }
    }

    if let Err(e) = intake.close().await {
        warn!(error = %e, "Failed to close lead repository");
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolve when the process receives SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Intake Handlers
// ============================================================================

/// Handle scheduling-webhook callbacks
///
/// The body is taken as raw bytes so the signature is checked over exactly
/// what was received.
#[instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn handle_cal_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<LeadResponse>, HandlerError> {
    info!("Received scheduling webhook");

    let signature = headers
        .get(SIGNATURE_HEADER)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let rows = with_timeout(
        &state,
        state.intake.process_booking(&body, signature.as_deref()),
    )
    .await?;

    info!(rows = rows.len(), "Webhook processed");
    Ok(Json(LeadResponse::new(rows)))
}

/// Handle direct lead submissions
#[instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn handle_submit_lead(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LeadResponse>, HandlerError> {
    info!("Received lead submission");

    let rows = with_timeout(&state, state.intake.process_submission(&body)).await?;

    info!(rows = rows.len(), "Submission processed");
    Ok(Json(LeadResponse::new(rows)))
}

/// Answer CORS preflight for the submission endpoint
pub async fn handle_lead_preflight() -> &'static str {
    "ok"
}

/// Bound an intake call by `server.request_timeout_seconds`.
///
/// Dropping the future on expiry cancels any in-flight repository call.
async fn with_timeout<T>(
    state: &AppState,
    call: impl std::future::Future<Output = Result<T, IntakeError>>,
) -> Result<T, HandlerError> {
    let limit = state.config.server.request_timeout();
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(HandlerError::from),
        Err(_) => Err(HandlerError::Timeout {
            seconds: limit.as_secs(),
        }),
    }
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Report whether the lead repository is reachable
#[instrument(skip(state))]
async fn handle_health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.intake.health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::new(true))),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::new(false)),
            )
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Render a handler panic as a JSON 500
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    error!(panic = %detail, "Handler panicked");
    errors::error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Give body-limit rejections the same `{"error"}` shape as handler errors
async fn json_payload_too_large<B>(response: Response<B>) -> Response
where
    B: axum::body::HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<axum::BoxError>,
{
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response.into_response();
    }
    warn!("Request body exceeds configured limit");
    errors::error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
}

/// Request logging middleware with correlation ID tracking
///
/// Reuses the caller's `x-correlation-id` or generates one, and echoes it on
/// the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    info!(method = %method, uri = %uri, "Request started");

    let mut response = next.run(request).await.into_response();
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();
    if status.is_server_error() {
        error!(
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
