//! Integration tests for checkgate
//!
//! These drive signed webhook deliveries through the real router with a
//! scripted GitHub API and assert the outbound call sequence.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use checkgate_core::{CheckConclusion, CheckStatus, GateConfig, PullRequest, Review};
use checkgate_web::testing::{ApiCall, RecordingApi};
use checkgate_web::{create_router, CheckGate, WebhookState};
use http_body_util::BodyExt;
use secrecy::SecretString;
use std::sync::Arc;
use tower::util::ServiceExt;

const SECRET: &str = "integration-secret";

fn setup() -> (axum::Router, Arc<RecordingApi>) {
    let api = Arc::new(RecordingApi::default());
    let config = GateConfig::new(
        1234,
        "kiali-bot",
        vec!["qe-alice".to_string(), "qe-bob".to_string()],
    );
    let gate = CheckGate::new(config, api.clone());
    let state = Arc::new(WebhookState::new(
        gate,
        Some(SecretString::new(SECRET.to_string())),
    ));
    (create_router(state), api)
}

fn sign(payload: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(payload.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn delivery(event: &str, payload: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/webhooks/github")
        .header("content-type", "application/json")
        .header("x-github-event", event)
        .header("x-github-delivery", "integration-delivery")
        .header("x-hub-signature-256", sign(payload))
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn repo_json() -> serde_json::Value {
    serde_json::json!({
        "name": "kiali",
        "owner": { "login": "kiali-org" }
    })
}

async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_pr_opened_delivery_queues_check_run() {
    let (router, api) = setup();

    let payload = serde_json::json!({
        "action": "opened",
        "pull_request": { "number": 42, "head": { "sha": "abc123" } },
        "repository": repo_json()
    })
    .to_string();

    let response = router
        .oneshot(delivery("pull_request", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("ok"));

    assert_eq!(
        api.calls(),
        vec![ApiCall::CreateCheckRun {
            name: "Kiali - PR".to_string(),
            head_sha: "abc123".to_string(),
            status: CheckStatus::Queued,
            conclusion: None,
        }]
    );
}

#[tokio::test]
async fn test_tampered_delivery_is_rejected() {
    let (router, api) = setup();

    let payload = serde_json::json!({
        "action": "opened",
        "pull_request": { "number": 42, "head": { "sha": "abc123" } },
        "repository": repo_json()
    })
    .to_string();

    let mut request = delivery("pull_request", &payload);
    // Replace the body after signing
    *request.body_mut() = Body::from(payload.replace("abc123", "evil99"));

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_qe_review_approval_shortcut() {
    let (router, api) = setup();

    let payload = serde_json::json!({
        "action": "submitted",
        "review": { "state": "approved", "user": { "login": "qe-bob" } },
        "pull_request": { "number": 7, "head": { "sha": "def456" } },
        "repository": repo_json()
    })
    .to_string();

    let response = router
        .oneshot(delivery("pull_request_review", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        api.calls(),
        vec![ApiCall::CreateCheckRun {
            name: "Kiali - PR".to_string(),
            head_sha: "def456".to_string(),
            status: CheckStatus::Completed,
            conclusion: Some(CheckConclusion::Success),
        }]
    );
}

#[tokio::test]
async fn test_check_run_created_full_evaluation() {
    let (router, api) = setup();
    api.add_pull(
        PullRequest {
            number: 42,
            author: "contributor".to_string(),
            head_sha: "abc123".to_string(),
        },
        vec![
            Review {
                reviewer: "qe-alice".to_string(),
                state: "CHANGES_REQUESTED".to_string(),
                submitted_at: Some("2024-01-01T12:00:00Z".parse().unwrap()),
            },
            Review {
                reviewer: "qe-alice".to_string(),
                state: "APPROVED".to_string(),
                submitted_at: Some("2024-01-01T13:00:00Z".parse().unwrap()),
            },
        ],
    );

    let payload = serde_json::json!({
        "action": "created",
        "check_run": {
            "id": 99,
            "name": "Kiali - PR",
            "head_sha": "abc123",
            "status": "queued",
            "app": { "id": 1234 }
        },
        "repository": repo_json()
    })
    .to_string();

    let response = router
        .oneshot(delivery("check_run", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::PullsForCommit("abc123".to_string()),
            ApiCall::GetPullRequest(42),
            ApiCall::UpdateCheckRun {
                id: 99,
                status: CheckStatus::InProgress,
                conclusion: None,
            },
            ApiCall::ListReviews(42),
            ApiCall::UpdateCheckRun {
                id: 99,
                status: CheckStatus::Completed,
                conclusion: Some(CheckConclusion::Success),
            },
        ]
    );
}

#[tokio::test]
async fn test_check_run_created_without_qe_approval_fails() {
    let (router, api) = setup();
    api.add_pull(
        PullRequest {
            number: 42,
            author: "contributor".to_string(),
            head_sha: "abc123".to_string(),
        },
        vec![],
    );

    let payload = serde_json::json!({
        "action": "created",
        "check_run": {
            "id": 99,
            "name": "Kiali - PR",
            "head_sha": "abc123",
            "status": "queued",
            "app": { "id": 1234 }
        },
        "repository": repo_json()
    })
    .to_string();

    let response = router
        .oneshot(delivery("check_run", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let calls = api.calls();
    assert_eq!(
        calls.last().unwrap(),
        &ApiCall::UpdateCheckRun {
            id: 99,
            status: CheckStatus::Completed,
            conclusion: Some(CheckConclusion::Failure),
        }
    );
}

#[tokio::test]
async fn test_bot_authored_pr_auto_passes() {
    let (router, api) = setup();
    api.add_pull(
        PullRequest {
            number: 10,
            author: "kiali-bot".to_string(),
            head_sha: "botsha".to_string(),
        },
        vec![],
    );

    let payload = serde_json::json!({
        "action": "created",
        "check_run": {
            "id": 55,
            "name": "Kiali - PR",
            "head_sha": "botsha",
            "status": "queued",
            "app": { "id": 1234 }
        },
        "repository": repo_json()
    })
    .to_string();

    let response = router
        .oneshot(delivery("check_run", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // Straight to completed/success, never in_progress
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::PullsForCommit("botsha".to_string()),
            ApiCall::GetPullRequest(10),
            ApiCall::UpdateCheckRun {
                id: 55,
                status: CheckStatus::Completed,
                conclusion: Some(CheckConclusion::Success),
            },
        ]
    );
}

#[tokio::test]
async fn test_foreign_check_run_delivery_is_acknowledged_without_calls() {
    let (router, api) = setup();

    let payload = serde_json::json!({
        "action": "created",
        "check_run": {
            "id": 99,
            "name": "Other App Check",
            "head_sha": "abc123",
            "status": "queued",
            "app": { "id": 9999 }
        },
        "repository": repo_json()
    })
    .to_string();

    let response = router
        .oneshot(delivery("check_run", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(api.calls().is_empty());
}
