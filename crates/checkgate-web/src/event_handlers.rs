//! Event handlers for the GitHub webhook event types the gate is bound to
//!
//! This is the check gate state machine: pull request and review events
//! enqueue check runs, and `check_run.created` triggers the evaluation that
//! drives a run through `in_progress` to its conclusion.

use std::sync::Arc;
use tracing::{debug, error, info};

use checkgate_core::{
    any_qe_approved, latest_review_states, CheckApi, CheckConclusion, CheckStatus, GateConfig,
    NewCheckRun, RepoId, Result, Review,
};

use crate::payload::{CheckRunPayload, WebhookPayload};

/// The QE approval gate
///
/// Stateless across deliveries: all check run state lives at GitHub, reached
/// through the injected `CheckApi`.
#[derive(Clone)]
pub struct CheckGate {
    config: Arc<GateConfig>,
    api: Arc<dyn CheckApi>,
}

impl CheckGate {
    pub fn new(config: GateConfig, api: Arc<dyn CheckApi>) -> Self {
        Self {
            config: Arc::new(config),
            api,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Dispatch one webhook delivery to its handler.
    ///
    /// Never fails: API errors are logged and swallowed so a delivery is
    /// always acknowledged to GitHub. Recovery happens through a later
    /// re-request, not a retry here.
    pub async fn handle_event(&self, event_type: &str, payload: &WebhookPayload) {
        let Some(repo) = payload.repo_id() else {
            debug!(event_type = %event_type, "No repository in payload, skipping");
            return;
        };

        match event_type {
            "pull_request" => self.handle_pull_request(&repo, payload).await,
            "pull_request_review" => self.handle_review(&repo, payload).await,
            "check_run" => self.handle_check_run(&repo, payload).await,
            _ => {
                debug!(event_type = %event_type, "No handler for event type");
            }
        }
    }

    /// `pull_request.opened` / `pull_request.reopened`: enqueue a fresh check
    /// run for the head commit
    async fn handle_pull_request(&self, repo: &RepoId, payload: &WebhookPayload) {
        let action = payload.action.as_deref().unwrap_or_default();
        if !matches!(action, "opened" | "reopened") {
            debug!(action = %action, "Skipping pull_request action");
            return;
        }

        let Some(pr) = payload.pull_request.as_ref() else {
            debug!("No pull_request in payload, skipping");
            return;
        };

        info!(repo = %repo, pr_number = pr.number, action = %action, "Pull request event");
        self.enqueue_check(repo, &pr.head.sha).await;
    }

    /// `pull_request_review.submitted` / `.dismissed`.
    ///
    /// Shortcut: an approval submitted by a QE user finalizes a check run
    /// directly as `completed/success`, skipping the queued pipeline. Every
    /// other combination (and a failed shortcut creation) falls back to
    /// enqueueing a normal `queued` run.
    async fn handle_review(&self, repo: &RepoId, payload: &WebhookPayload) {
        let Some(pr) = payload.pull_request.as_ref() else {
            debug!("No pull_request in review payload, skipping");
            return;
        };

        let action = payload.action.as_deref().unwrap_or_default();
        if let Some(review) = payload.review.as_ref() {
            let qe_approval = matches!(action, "submitted" | "edited")
                && review.state == "approved"
                && self.config.is_qe_user(&review.user.login);

            if qe_approval {
                let check =
                    NewCheckRun::completed_success(&self.config.check_name, &pr.head.sha);
                match self.api.create_check_run(repo, &check).await {
                    Ok(id) => {
                        info!(
                            repo = %repo,
                            check_run_id = id,
                            reviewer = %review.user.login,
                            "QE approval, check run created as passed"
                        );
                        return;
                    }
                    Err(e) => {
                        error!(
                            repo = %repo,
                            error = %e,
                            "Failed to create passed check run, falling back to queued"
                        );
                    }
                }
            }
        }

        info!(repo = %repo, pr_number = pr.number, action = %action, "Review event");
        self.enqueue_check(repo, &pr.head.sha).await;
    }

    /// `check_run.created` / `check_run.rerequested`
    async fn handle_check_run(&self, repo: &RepoId, payload: &WebhookPayload) {
        let Some(check_run) = payload.check_run.as_ref() else {
            debug!("No check_run in payload, skipping");
            return;
        };

        if !self
            .config
            .owns_check_run(check_run.app_id(), &check_run.name)
        {
            debug!(
                repo = %repo,
                check_run_id = check_run.id,
                name = %check_run.name,
                "Check run not owned by this gate, ignoring"
            );
            return;
        }

        match payload.action.as_deref().unwrap_or_default() {
            "created" => {
                // Only queued runs are evaluated; runs created directly as
                // completed (the shortcut paths) must not be re-run.
                if check_run.status != CheckStatus::Queued.as_str() {
                    debug!(
                        check_run_id = check_run.id,
                        status = %check_run.status,
                        "Check run not queued, skipping evaluation"
                    );
                    return;
                }

                if let Err(e) = self.evaluate_check_run(repo, check_run).await {
                    error!(
                        repo = %repo,
                        check_run_id = check_run.id,
                        error = %e,
                        "Check run evaluation failed"
                    );
                }
            }
            "rerequested" => {
                info!(repo = %repo, check_run_id = check_run.id, "Check run re-requested");
                self.enqueue_check(repo, &check_run.head_sha).await;
            }
            action => {
                debug!(action = %action, "Skipping check_run action");
            }
        }
    }

    /// Evaluate a queued check run: inspect the pull requests associated with
    /// its head commit and finalize the run with a conclusion.
    ///
    /// The transitions are not atomic against GitHub; an error mid-sequence
    /// leaves the run at its last set state until a re-request arrives.
    async fn evaluate_check_run(&self, repo: &RepoId, check_run: &CheckRunPayload) -> Result<()> {
        let prs = self.api.pulls_for_commit(repo, &check_run.head_sha).await?;

        for pr_ref in &prs {
            let pr = self.api.get_pull_request(repo, pr_ref.number).await?;
            if pr.author == self.config.bot_login {
                info!(
                    repo = %repo,
                    pr_number = pr.number,
                    check_run_id = check_run.id,
                    "Bot-authored pull request, passing"
                );
                self.api
                    .update_check_run(
                        repo,
                        check_run.id,
                        CheckStatus::Completed,
                        Some(CheckConclusion::Success),
                    )
                    .await?;
                return Ok(());
            }
        }

        self.api
            .update_check_run(repo, check_run.id, CheckStatus::InProgress, None)
            .await?;

        let mut reviews: Vec<Review> = Vec::new();
        for pr_ref in &prs {
            reviews.extend(self.api.list_reviews(repo, pr_ref.number).await?);
        }

        let latest = latest_review_states(&reviews);
        let conclusion = if any_qe_approved(&latest, &self.config.qe_users) {
            CheckConclusion::Success
        } else {
            CheckConclusion::Failure
        };

        info!(
            repo = %repo,
            check_run_id = check_run.id,
            head_sha = %check_run.head_sha,
            conclusion = conclusion.as_str(),
            "Check run evaluated"
        );

        self.api
            .update_check_run(repo, check_run.id, CheckStatus::Completed, Some(conclusion))
            .await?;
        Ok(())
    }

    async fn enqueue_check(&self, repo: &RepoId, head_sha: &str) {
        let check = NewCheckRun::queued(&self.config.check_name, head_sha);
        match self.api.create_check_run(repo, &check).await {
            Ok(id) => {
                info!(repo = %repo, check_run_id = id, head_sha = %head_sha, "Check run queued");
            }
            Err(e) => {
                error!(
                    repo = %repo,
                    head_sha = %head_sha,
                    error = %e,
                    "Failed to create check run"
                );
            }
        }
    }
}
