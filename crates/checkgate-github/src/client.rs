//! GitHub REST client for check run and pull request operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use checkgate_core::{
    CheckApi, CheckConclusion, CheckStatus, Error, NewCheckRun, PrRef, PullRequest, RepoId,
    Result, Review,
};

/// Page size used when listing pull request reviews
const REVIEWS_PER_PAGE: usize = 100;

/// GitHub REST API client
pub struct GitHubClient {
    api_url: String,
    token: SecretString,
    http_client: reqwest::Client,
}

impl GitHubClient {
    /// Create a new client against the given API base URL (usually
    /// `https://api.github.com`)
    pub fn new(api_url: impl Into<String>, token: SecretString) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("checkgate")
            .build()?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            http_client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(self.token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }

    /// Fail on anything but the expected status, logging the response body
    async fn expect_status(
        response: reqwest::Response,
        expected: reqwest::StatusCode,
        context: &str,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status != expected {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                context = %context,
                body = %body,
                "Unexpected response from GitHub"
            );
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                context: context.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CheckApi for GitHubClient {
    async fn create_check_run(&self, repo: &RepoId, check: &NewCheckRun) -> Result<u64> {
        let path = format!("/repos/{}/{}/check-runs", repo.owner, repo.repo);
        let body = check_run_create_body(check, Utc::now());

        debug!(
            repo = %repo,
            head_sha = %check.head_sha,
            status = check.status.as_str(),
            "Creating check run"
        );

        let response = self
            .request(reqwest::Method::POST, &path)
            .json(&body)
            .send()
            .await?;
        let response =
            Self::expect_status(response, reqwest::StatusCode::CREATED, "create check run").await?;

        let created: CheckRunResponse = response.json().await?;
        Ok(created.id)
    }

    async fn update_check_run(
        &self,
        repo: &RepoId,
        check_run_id: u64,
        status: CheckStatus,
        conclusion: Option<CheckConclusion>,
    ) -> Result<()> {
        let path = format!(
            "/repos/{}/{}/check-runs/{}",
            repo.owner, repo.repo, check_run_id
        );
        let body = check_run_update_body(status, conclusion, Utc::now());

        debug!(
            repo = %repo,
            check_run_id = check_run_id,
            status = status.as_str(),
            "Updating check run"
        );

        let response = self
            .request(reqwest::Method::PATCH, &path)
            .json(&body)
            .send()
            .await?;
        Self::expect_status(response, reqwest::StatusCode::OK, "update check run").await?;
        Ok(())
    }

    async fn get_pull_request(&self, repo: &RepoId, number: u64) -> Result<PullRequest> {
        let path = format!("/repos/{}/{}/pulls/{}", repo.owner, repo.repo, number);

        let response = self.request(reqwest::Method::GET, &path).send().await?;
        let response =
            Self::expect_status(response, reqwest::StatusCode::OK, "get pull request").await?;

        let pull: PullResponse = response.json().await?;
        Ok(pull.into())
    }

    async fn list_reviews(&self, repo: &RepoId, number: u64) -> Result<Vec<Review>> {
        let path = format!(
            "/repos/{}/{}/pulls/{}/reviews",
            repo.owner, repo.repo, number
        );

        let mut reviews = Vec::new();
        let mut page = 1u32;
        loop {
            let response = self
                .request(reqwest::Method::GET, &path)
                .query(&[("per_page", REVIEWS_PER_PAGE as u32), ("page", page)])
                .send()
                .await?;
            let response =
                Self::expect_status(response, reqwest::StatusCode::OK, "list reviews").await?;

            let batch: Vec<ReviewResponse> = response.json().await?;
            let batch_len = batch.len();
            reviews.extend(batch.into_iter().filter_map(ReviewResponse::into_review));

            if batch_len < REVIEWS_PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!(repo = %repo, pr_number = number, count = reviews.len(), "Listed reviews");
        Ok(reviews)
    }

    async fn pulls_for_commit(&self, repo: &RepoId, sha: &str) -> Result<Vec<PrRef>> {
        let path = format!("/repos/{}/{}/commits/{}/pulls", repo.owner, repo.repo, sha);

        let response = self.request(reqwest::Method::GET, &path).send().await?;
        let response =
            Self::expect_status(response, reqwest::StatusCode::OK, "pulls for commit").await?;

        let pulls: Vec<CommitPullResponse> = response.json().await?;
        Ok(pulls.into_iter().map(|p| PrRef { number: p.number }).collect())
    }
}

/// Request body for creating a check run.
///
/// Completed check runs get both timestamps so the shortcut path shows a
/// zero-length run; in-flight ones only get `started_at`.
fn check_run_create_body(check: &NewCheckRun, now: DateTime<Utc>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "name": check.name,
        "head_sha": check.head_sha,
        "status": check.status.as_str(),
    });

    if check.status != CheckStatus::Queued {
        body["started_at"] = serde_json::json!(now.to_rfc3339());
    }
    if let Some(conclusion) = check.conclusion {
        body["conclusion"] = serde_json::json!(conclusion.as_str());
        body["completed_at"] = serde_json::json!(now.to_rfc3339());
    }
    body
}

/// Request body for updating a check run
fn check_run_update_body(
    status: CheckStatus,
    conclusion: Option<CheckConclusion>,
    now: DateTime<Utc>,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "status": status.as_str(),
    });

    if status == CheckStatus::InProgress {
        body["started_at"] = serde_json::json!(now.to_rfc3339());
    }
    if let Some(conclusion) = conclusion {
        body["conclusion"] = serde_json::json!(conclusion.as_str());
        body["completed_at"] = serde_json::json!(now.to_rfc3339());
    }
    body
}

// GitHub API response types
#[derive(Debug, Deserialize)]
struct CheckRunResponse {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    user: UserResponse,
    head: HeadResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct HeadResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ReviewResponse {
    /// Missing for reviews whose author account was deleted
    user: Option<UserResponse>,
    state: String,
    submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CommitPullResponse {
    number: u64,
}

impl From<PullResponse> for PullRequest {
    fn from(pull: PullResponse) -> Self {
        PullRequest {
            number: pull.number,
            author: pull.user.login,
            head_sha: pull.head.sha,
        }
    }
}

impl ReviewResponse {
    fn into_review(self) -> Option<Review> {
        let user = self.user?;
        Some(Review {
            reviewer: user.login,
            state: self.state,
            submitted_at: self.submitted_at,
        })
    }
}
