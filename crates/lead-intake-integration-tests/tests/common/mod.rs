//! Common test utilities for lead-intake integration tests
//!
//! This module provides:
//! - A fully wired application (real verifier, real pipeline) over an
//!   inspectable repository
//! - Request builders and payload signing helpers

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response, StatusCode},
    Router,
};
use hmac::{Hmac, Mac};
use lead_intake_api::{create_router, AppState, ServiceConfig};
use lead_intake_core::{
    HmacSignatureVerifier, InMemoryLeadRepository, IntakeProcessor, LeadRepository, SecretValue,
    SignaturePolicy,
};
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;

/// Webhook secret shared by every test application
pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// Application under test plus a handle on its store
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub repository: InMemoryLeadRepository,
}

#[allow(dead_code)]
impl TestApp {
    /// Application with the default optional-signature policy
    pub fn new() -> Self {
        Self::with_policy(SignaturePolicy::Optional)
    }

    pub fn with_policy(policy: SignaturePolicy) -> Self {
        let repository = InMemoryLeadRepository::new();
        let router = build_router(policy, Arc::new(repository.clone()));
        Self { router, repository }
    }

    /// Send a request and return status plus parsed JSON body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        split(response).await
    }
}

/// Wire the real pipeline over the given repository
pub fn build_router(policy: SignaturePolicy, repository: Arc<dyn LeadRepository>) -> Router {
    let verifier = HmacSignatureVerifier::new(
        SecretValue::from_string(WEBHOOK_SECRET.to_string()),
        policy,
    )
    .unwrap();
    let intake = Arc::new(IntakeProcessor::new(Arc::new(verifier), repository));

    let mut config = ServiceConfig::default();
    config.webhooks.secret = Some(SecretValue::from_string(WEBHOOK_SECRET.to_string()));
    config.webhooks.require_signature = policy == SignaturePolicy::Required;

    create_router(AppState::new(config, intake))
}

/// Lowercase hex HMAC-SHA256 of `body` under [`WEBHOOK_SECRET`]
#[allow(dead_code)]
pub fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// `POST /cal-webhook`, signed when `signature` is given
#[allow(dead_code)]
pub fn webhook_request(body: &serde_json::Value, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/cal-webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-cal-signature-256", signature);
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// `POST /cal-webhook` with a correct signature
#[allow(dead_code)]
pub fn signed_webhook_request(body: &serde_json::Value) -> Request<Body> {
    let bytes = serde_json::to_vec(body).unwrap();
    let signature = sign(&bytes);
    webhook_request(body, Some(&signature))
}

/// `POST /submit-lead`
#[allow(dead_code)]
pub fn submission_request(body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/submit-lead")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Status plus body parsed as JSON (`Null` for non-JSON bodies)
#[allow(dead_code)]
pub async fn split(response: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}
