//! Narrow interface over the GitHub operations the gate performs
//!
//! Each remote call the gate makes is one method here, so event handlers can
//! be exercised against a scripted in-memory implementation and the real
//! REST client stays swappable.

use async_trait::async_trait;
use std::fmt;

use crate::check::{CheckConclusion, CheckStatus};
use crate::review::Review;
use crate::Result;

/// Identifies a repository by owner and name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A pull request reference as returned by the commit association lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrRef {
    pub number: u64,
}

/// Pull request details the gate inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    /// Login of the pull request author
    pub author: String,
    pub head_sha: String,
}

/// Parameters for creating a check run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckRun {
    pub name: String,
    pub head_sha: String,
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
}

impl NewCheckRun {
    /// A check run waiting to be evaluated
    pub fn queued(name: impl Into<String>, head_sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            head_sha: head_sha.into(),
            status: CheckStatus::Queued,
            conclusion: None,
        }
    }

    /// A check run created directly in its passed terminal state, skipping
    /// the queued/in_progress pipeline
    pub fn completed_success(name: impl Into<String>, head_sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            head_sha: head_sha.into(),
            status: CheckStatus::Completed,
            conclusion: Some(CheckConclusion::Success),
        }
    }
}

/// GitHub operations used by the check gate
#[async_trait]
pub trait CheckApi: Send + Sync {
    /// Create a check run, returning its id
    async fn create_check_run(&self, repo: &RepoId, check: &NewCheckRun) -> Result<u64>;

    /// Update the status (and, when completing, the conclusion) of a check run
    async fn update_check_run(
        &self,
        repo: &RepoId,
        check_run_id: u64,
        status: CheckStatus,
        conclusion: Option<CheckConclusion>,
    ) -> Result<()>;

    /// Fetch pull request details by number
    async fn get_pull_request(&self, repo: &RepoId, number: u64) -> Result<PullRequest>;

    /// List all reviews for a pull request, paginating through every page
    async fn list_reviews(&self, repo: &RepoId, number: u64) -> Result<Vec<Review>>;

    /// Pull requests associated with a commit SHA
    async fn pulls_for_commit(&self, repo: &RepoId, sha: &str) -> Result<Vec<PrRef>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_display() {
        let repo = RepoId::new("kiali", "kiali");
        assert_eq!(repo.to_string(), "kiali/kiali");
    }

    #[test]
    fn test_queued_check_run_has_no_conclusion() {
        let check = NewCheckRun::queued("Kiali - PR", "abc123");
        assert_eq!(check.status, CheckStatus::Queued);
        assert!(check.conclusion.is_none());
    }

    #[test]
    fn test_completed_success_check_run() {
        let check = NewCheckRun::completed_success("Kiali - PR", "abc123");
        assert_eq!(check.status, CheckStatus::Completed);
        assert_eq!(check.conclusion, Some(CheckConclusion::Success));
    }
}
