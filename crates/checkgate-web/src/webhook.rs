//! GitHub webhook receiver
//!
//! Verifies delivery signatures, parses the payload, and hands the event to
//! the check gate. A delivery is acknowledged with 200 once it parses; gate
//! errors are logged server-side and never surfaced to GitHub.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::event_handlers::CheckGate;
use crate::payload::WebhookPayload;

/// Webhook handler state
pub struct WebhookState {
    pub gate: CheckGate,
    /// GitHub webhook secret for HMAC verification; unset disables it
    pub secret: Option<SecretString>,
}

impl WebhookState {
    pub fn new(gate: CheckGate, secret: Option<SecretString>) -> Self {
        Self { gate, secret }
    }
}

/// Webhook response
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub message: String,
}

impl WebhookResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Build the webhook router
pub fn create_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/webhooks/github", post(github_webhook_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GitHub webhook handler
pub async fn github_webhook_handler(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event_type = match headers.get("x-github-event").map(|v| v.to_str()) {
        Some(Ok(v)) => v.to_string(),
        Some(Err(_)) => {
            warn!("Invalid X-GitHub-Event header");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse::error("Invalid X-GitHub-Event header")),
            );
        }
        None => {
            warn!("Missing X-GitHub-Event header");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse::error("Missing X-GitHub-Event header")),
            );
        }
    };

    let delivery_id = headers
        .get("x-github-delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    debug!(
        event_type = %event_type,
        delivery_id = %delivery_id,
        "Received GitHub webhook"
    );

    if let Some(ref secret) = state.secret {
        let signature = match headers.get("x-hub-signature-256").map(|v| v.to_str()) {
            Some(Ok(v)) => v,
            Some(Err(_)) => {
                warn!("Invalid X-Hub-Signature-256 header");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(WebhookResponse::error("Invalid X-Hub-Signature-256 header")),
                );
            }
            None => {
                warn!("Missing X-Hub-Signature-256 header");
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(WebhookResponse::error("Missing signature")),
                );
            }
        };

        if !verify_signature(secret.expose_secret(), &body, signature) {
            error!(delivery_id = %delivery_id, "Invalid webhook signature");
            return (
                StatusCode::UNAUTHORIZED,
                Json(WebhookResponse::error("Invalid signature")),
            );
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, delivery_id = %delivery_id, "Failed to parse webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse::error(format!(
                    "Invalid JSON payload: {}",
                    e
                ))),
            );
        }
    };

    info!(
        event_type = %event_type,
        delivery_id = %delivery_id,
        action = payload.action.as_deref().unwrap_or_default(),
        "Processing webhook delivery"
    );

    // One handler invocation per delivery; errors are logged inside
    state.gate.handle_event(&event_type, &payload).await;

    (StatusCode::OK, Json(WebhookResponse::ok("Webhook processed")))
}

/// Verify GitHub webhook signature using HMAC-SHA256
///
/// GitHub sends the signature in the format: "sha256=<hex-encoded-hmac>"
fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let Some(signature) = signature.strip_prefix("sha256=") else {
        warn!("Signature doesn't start with 'sha256='");
        return false;
    };

    let expected_signature = match hex::decode(signature) {
        Ok(sig) => sig,
        Err(e) => {
            warn!(error = %e, "Failed to decode signature hex");
            return false;
        }
    };

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "Failed to create HMAC");
            return false;
        }
    };
    mac.update(payload);

    // Constant-time comparison
    mac.verify_slice(&expected_signature).is_ok()
}
