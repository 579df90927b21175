//! Checkgate Web - webhook surface
//!
//! This crate provides the HTTP side of the gate:
//! - GitHub webhook receiver with signature verification
//! - Event handlers driving the check run lifecycle
//! - A scripted `CheckApi` for tests

pub mod event_handlers;
pub mod payload;
pub mod testing;
pub mod webhook;

pub use event_handlers::CheckGate;
pub use webhook::{create_router, github_webhook_handler, WebhookResponse, WebhookState};
