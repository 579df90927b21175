//! Checkgate Core - domain types and gate logic
//!
//! This crate provides the fundamental types for the QE check gate:
//! - Check run status and conclusion lifecycle
//! - Review folding (latest state per reviewer)
//! - Gate configuration and check run ownership
//! - The `CheckApi` interface over the GitHub calls the gate performs

pub mod api;
pub mod check;
pub mod config;
pub mod error;
pub mod review;

pub use api::{CheckApi, NewCheckRun, PrRef, PullRequest, RepoId};
pub use check::{CheckConclusion, CheckStatus};
pub use config::{GateConfig, DEFAULT_CHECK_NAME};
pub use error::{Error, Result};
pub use review::{any_qe_approved, latest_review_states, Review, APPROVED};
