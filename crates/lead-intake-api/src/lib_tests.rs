//! Router-level tests for the intake endpoints.

use super::*;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
};
use lead_intake_core::{
    Email, Lead, LeadId, LeadStatus, Product, RepositoryError, SignatureError, Timestamp,
};
use std::sync::Mutex;
use std::time::Duration;
use tower::ServiceExt;

// ============================================================================
// Test double
// ============================================================================

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail(fn() -> IntakeError),
    Hang,
    Panic,
}

/// Records the signature header it was given and answers with a preset
/// behavior.
struct StubIntake {
    behavior: Behavior,
    healthy: bool,
    seen_signature: Mutex<Option<Option<String>>>,
}

impl StubIntake {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            healthy: true,
            seen_signature: Mutex::new(None),
        }
    }

    fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new(Behavior::Succeed)
        }
    }

    async fn respond(&self, product: Product, status: LeadStatus) -> Result<Vec<Lead>, IntakeError> {
        match self.behavior {
            Behavior::Succeed => Ok(vec![lead(product, status)]),
            Behavior::Fail(make) => Err(make()),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(vec![])
            }
            Behavior::Panic => panic!("intake exploded"),
        }
    }
}

#[async_trait]
impl LeadIntake for StubIntake {
    async fn process_booking(
        &self,
        _body: &[u8],
        signature: Option<&str>,
    ) -> Result<Vec<Lead>, IntakeError> {
        *self.seen_signature.lock().unwrap() = Some(signature.map(str::to_string));
        self.respond(Product::Live, LeadStatus::InterviewScheduled).await
    }

    async fn process_submission(&self, _body: &[u8]) -> Result<Vec<Lead>, IntakeError> {
        self.respond(Product::Cloud, LeadStatus::New).await
    }

    async fn health_check(&self) -> Result<(), IntakeError> {
        if self.healthy {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable {
                message: "down".to_string(),
            }
            .into())
        }
    }
}

fn lead(product: Product, status: LeadStatus) -> Lead {
    Lead {
        id: LeadId::new(),
        created_at: Timestamp::now(),
        email: Email::new("a@x.com").unwrap(),
        name: None,
        company: None,
        team_size: None,
        use_case: None,
        product,
        status,
        interview_scheduled: status == LeadStatus::InterviewScheduled,
        interview_slot: None,
        cal_event_id: None,
    }
}

fn router_with(config: ServiceConfig, intake: Arc<StubIntake>) -> Router {
    create_router(AppState::new(config, intake))
}

fn router(intake: Arc<StubIntake>) -> Router {
    router_with(ServiceConfig::default(), intake)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Webhook endpoint
// ============================================================================

mod webhook_tests {
    use super::*;

    #[tokio::test]
    async fn test_booking_returns_stored_rows() {
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));

        let response = router(intake)
            .oneshot(post_json("/cal-webhook", r#"{"responses":{"email":"a@x.com"}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["status"], "interview_scheduled");
        assert_eq!(body["data"][0]["product"], "live");
    }

    #[tokio::test]
    async fn test_signature_header_is_passed_through() {
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));

        let mut request = post_json("/cal-webhook", "{}");
        request
            .headers_mut()
            .insert("X-Cal-Signature-256", HeaderValue::from_static("abc123"));
        router(intake.clone()).oneshot(request).await.unwrap();

        let seen = intake.seen_signature.lock().unwrap().clone();
        assert_eq!(seen, Some(Some("abc123".to_string())));
    }

    #[tokio::test]
    async fn test_absent_signature_header_is_passed_as_none() {
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));

        router(intake.clone())
            .oneshot(post_json("/cal-webhook", "{}"))
            .await
            .unwrap();

        let seen = intake.seen_signature.lock().unwrap().clone();
        assert_eq!(seen, Some(None));
    }

    #[tokio::test]
    async fn test_rejected_signature_is_401() {
        let intake = Arc::new(StubIntake::new(Behavior::Fail(|| {
            IntakeError::InvalidSignature(SignatureError::Mismatch)
        })));

        let response = router(intake)
            .oneshot(post_json("/cal-webhook", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "Invalid signature" })
        );
    }

    #[tokio::test]
    async fn test_webhook_responses_carry_no_cors_headers() {
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));

        let response = router(intake)
            .oneshot(post_json("/cal-webhook", "{}"))
            .await
            .unwrap();

        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}

// ============================================================================
// Submission endpoint
// ============================================================================

mod submission_tests {
    use super::*;

    #[tokio::test]
    async fn test_submission_success_carries_cors_headers() {
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));

        let response = router(intake)
            .oneshot(post_json(
                "/submit-lead",
                r#"{"email":"a@x.com","product":"cloud"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
            ALLOWED_HEADERS
        );
        let body = json_body(response).await;
        assert_eq!(body["data"][0]["interview_scheduled"], false);
    }

    #[tokio::test]
    async fn test_submission_errors_carry_cors_headers() {
        let intake = Arc::new(StubIntake::new(Behavior::Fail(|| IntakeError::InvalidProduct {
            value: "enterprise".to_string(),
        })));

        let response = router(intake)
            .oneshot(post_json("/submit-lead", r#"{"product":"enterprise"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            json_body(response).await["error"],
            "Product must be cloud or live"
        );
    }

    #[tokio::test]
    async fn test_duplicate_submission_is_409() {
        let intake = Arc::new(StubIntake::new(Behavior::Fail(|| IntakeError::Conflict {
            email: "a@x.com".to_string(),
        })));

        let response = router(intake)
            .oneshot(post_json("/submit-lead", r#"{"email":"a@x.com","product":"live"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_preflight_answers_ok() {
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/submit-lead")
            .body(Body::empty())
            .unwrap();

        let response = router(intake).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
            ALLOWED_HEADERS
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_configured_origin_is_used() {
        let mut config = ServiceConfig::default();
        config.submissions.allowed_origin = "https://www.example.com".to_string();
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));

        let response = router_with(config, intake)
            .oneshot(post_json("/submit-lead", "{}"))
            .await
            .unwrap();

        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://www.example.com"
        );
    }

    #[tokio::test]
    async fn test_configured_paths_are_routed() {
        let mut config = ServiceConfig::default();
        config.submissions.endpoint_path = "/leads".to_string();
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));
        let app = router_with(config, intake);

        let moved = app
            .clone()
            .oneshot(post_json("/leads", "{}"))
            .await
            .unwrap();
        let old = app.oneshot(post_json("/submit-lead", "{}")).await.unwrap();

        assert_eq!(moved.status(), StatusCode::OK);
        assert_eq!(old.status(), StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Failure handling
// ============================================================================

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_intake_times_out_as_500() {
        let mut config = ServiceConfig::default();
        config.server.request_timeout_seconds = 1;
        let intake = Arc::new(StubIntake::new(Behavior::Hang));

        let response = router_with(config, intake)
            .oneshot(post_json("/submit-lead", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["error"],
            "Request timed out after 1s"
        );
    }

    #[tokio::test]
    async fn test_panic_is_rendered_as_500() {
        let intake = Arc::new(StubIntake::new(Behavior::Panic));

        let response = router(intake)
            .oneshot(post_json("/cal-webhook", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "Internal server error" })
        );
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let mut config = ServiceConfig::default();
        config.server.max_body_size = 16;
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));

        let response = router_with(config, intake)
            .oneshot(post_json("/cal-webhook", &"x".repeat(64)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "Request body too large" })
        );
    }

    #[tokio::test]
    async fn test_oversized_submission_keeps_cors_headers() {
        let mut config = ServiceConfig::default();
        config.server.max_body_size = 16;
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));
        let oversized = Request::builder()
            .method(Method::POST)
            .uri("/submit-lead")
            .header("content-type", "application/json")
            .header("content-length", "64")
            .body(Body::from("x".repeat(64)))
            .unwrap();

        let response = router_with(config, intake).oneshot(oversized).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
            ALLOWED_HEADERS
        );
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "Request body too large" })
        );
    }
}

// ============================================================================
// Health and middleware
// ============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_healthy_repository() {
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = router(intake).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_health_reports_unreachable_repository() {
        let intake = Arc::new(StubIntake::unhealthy());
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = router(intake).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_correlation_id_is_echoed() {
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));
        let request = Request::builder()
            .uri("/health")
            .header("x-correlation-id", "req-42")
            .body(Body::empty())
            .unwrap();

        let response = router(intake).oneshot(request).await.unwrap();

        assert_eq!(response.headers()["x-correlation-id"], "req-42");
    }

    #[tokio::test]
    async fn test_correlation_id_is_generated_when_absent() {
        let intake = Arc::new(StubIntake::new(Behavior::Succeed));
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = router(intake).oneshot(request).await.unwrap();

        assert!(response.headers().contains_key("x-correlation-id"));
    }
}
