//! Typed views of the GitHub webhook payloads the gate consumes
//!
//! Only the fields the gate reads are modeled; everything else in the
//! delivery is ignored by serde.

use serde::Deserialize;

use checkgate_core::RepoId;

/// Common envelope shared by all events the gate is bound to
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub action: Option<String>,
    pub repository: Option<Repository>,
    pub pull_request: Option<PullRequestPayload>,
    pub review: Option<ReviewPayload>,
    pub check_run: Option<CheckRunPayload>,
}

impl WebhookPayload {
    /// Repository the event belongs to
    pub fn repo_id(&self) -> Option<RepoId> {
        self.repository
            .as_ref()
            .map(|r| RepoId::new(r.owner.login.clone(), r.name.clone()))
    }
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: User,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    pub head: GitRef,
}

#[derive(Debug, Deserialize)]
pub struct GitRef {
    pub sha: String,
}

/// The review attached to a `pull_request_review` event
#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    /// Lower-case state as delivered in the event (e.g. "approved")
    pub state: String,
    pub user: User,
}

/// The check run attached to a `check_run` event
#[derive(Debug, Deserialize)]
pub struct CheckRunPayload {
    pub id: u64,
    pub name: String,
    pub head_sha: String,
    pub status: String,
    pub app: Option<App>,
}

impl CheckRunPayload {
    pub fn app_id(&self) -> Option<u64> {
        self.app.as_ref().map(|a| a.id)
    }
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub id: u64,
}
