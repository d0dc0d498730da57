//! End-to-end tests over the HTTP router
//!
//! Drives the axum router directly with `tower::ServiceExt::oneshot`, so no
//! socket is bound. AI backends are replaced with an in-process fake.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use devpulse::{
    AiGateway, ApiServer, ApiServerConfig, CompletionProvider, DevpulseError, GithubClient,
};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;

/// Canned completion backend
struct FakeProvider {
    reply: Result<String, String>,
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn complete(&self, _system: &str, _user: &str) -> devpulse::Result<String> {
        self.reply.clone().map_err(DevpulseError::Provider)
    }
}

fn router_with(gateway: AiGateway, webhook_secret: Option<&str>) -> Router {
    ApiServer::with_components(
        ApiServerConfig::default(),
        Arc::new(gateway),
        Arc::new(GithubClient::new()),
        webhook_secret.map(str::to_string),
    )
    .router()
}

fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn approved_review_payload() -> Vec<u8> {
    json!({
        "action": "submitted",
        "review": {"state": "approved", "user": {"login": "alice"}},
        "pull_request": {"title": "Add widgets", "number": 7, "state": "open"},
        "repository": {"full_name": "octocat/hello"}
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn health_reports_component_status() {
    let router = router_with(AiGateway::with_providers(vec![]), None);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/agent/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["aiConfigured"], false);
    assert_eq!(body["aiProvider"], "none");
    assert_eq!(body["webhookConfigured"], false);
    assert_eq!(body["cachedSuggestions"], 0);
    assert_eq!(body["recentEventsCount"], 0);
}

#[tokio::test]
async fn forged_webhook_signature_is_rejected() {
    let router = router_with(AiGateway::with_providers(vec![]), Some("s3cret"));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("x-github-event", "pull_request_review")
                .header("x-hub-signature-256", "sha256=deadbeef")
                .body(Body::from(approved_review_payload()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("signature"));
}

#[tokio::test]
async fn approved_review_webhook_populates_suggestions() {
    let router = router_with(AiGateway::with_providers(vec![]), Some("s3cret"));
    let payload = approved_review_payload();
    let signature = sign("s3cret", &payload);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("x-github-event", "pull_request_review")
                .header("x-hub-signature-256", &signature)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let ack = body_json(response).await;
    assert_eq!(ack["processed"], true);

    // The congratulatory plan is now retrievable from the cache endpoint
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/agent/suggestions/octocat/hello/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"]["progressPercent"], 90);
    assert_eq!(body["result"]["complexity"], "easy");
    assert!(body["result"]["statusNarrative"]
        .as_str()
        .unwrap()
        .contains("alice"));

    // And the delivery shows up in the recent-event log
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/agent/recent-events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["events"][0]["eventType"], "pull_request_review");
    assert_eq!(body["events"][0]["reviewState"], "approved");
}

#[tokio::test]
async fn suggestions_miss_is_not_found() {
    let router = router_with(AiGateway::with_providers(vec![]), None);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/agent/suggestions/octocat/hello/999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "No cached suggestions found");
}

#[tokio::test]
async fn analyze_pr_requires_all_fields() {
    let router = router_with(AiGateway::with_providers(vec![]), None);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/analyze-pr")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"owner": "octocat", "repo": "hello"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "Missing required fields: token, owner, repo, prNumber"
    );
}

#[tokio::test]
async fn activity_requires_bearer_token() {
    let router = router_with(AiGateway::with_providers(vec![]), None);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/agent/activity")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "GitHub token required");
}

#[tokio::test]
async fn ask_requires_a_question() {
    let router = router_with(AiGateway::with_providers(vec![]), None);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/ask")
                .header("content-type", "application/json")
                .body(Body::from(json!({"question": "  "}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Question is required");
}

#[tokio::test]
async fn ask_returns_backend_reply() {
    let gateway = AiGateway::with_providers(vec![Arc::new(FakeProvider {
        reply: Ok("Merge the small one first.".to_string()),
    })]);
    let router = router_with(gateway, None);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/ask")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"question": "Which PR should I merge first?"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], "Merge the small one first.");
}

#[tokio::test]
async fn ask_falls_back_when_backend_is_down() {
    let gateway = AiGateway::with_providers(vec![Arc::new(FakeProvider {
        reply: Err("backend down".to_string()),
    })]);
    let router = router_with(gateway, None);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/ask")
                .header("content-type", "application/json")
                .body(Body::from(json!({"question": "Anything urgent?"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["response"],
        "Hmm, I'm having trouble thinking right now. Try asking me again in a moment!"
    );
}

#[tokio::test]
async fn comment_webhook_records_quick_action() {
    let gateway = AiGateway::with_providers(vec![Arc::new(FakeProvider {
        reply: Ok("Rename the variable as suggested.".to_string()),
    })]);
    let router = router_with(gateway, None);

    let payload = json!({"comment": {"body": "nit: rename", "user": {"login": "bob"}}})
        .to_string()
        .into_bytes();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("x-github-event", "issue_comment")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/agent/recent-events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(
        body["events"][0]["quickAction"],
        "Rename the variable as suggested."
    );
    assert_eq!(body["events"][0]["commentAuthor"], "bob");
}
