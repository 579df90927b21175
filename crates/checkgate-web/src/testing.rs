//! Scripted in-memory `CheckApi` used by the crate's tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use checkgate_core::{
    CheckApi, CheckConclusion, CheckStatus, Error, NewCheckRun, PrRef, PullRequest, RepoId,
    Result, Review,
};

/// One recorded outbound GitHub call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CreateCheckRun {
        name: String,
        head_sha: String,
        status: CheckStatus,
        conclusion: Option<CheckConclusion>,
    },
    UpdateCheckRun {
        id: u64,
        status: CheckStatus,
        conclusion: Option<CheckConclusion>,
    },
    GetPullRequest(u64),
    ListReviews(u64),
    PullsForCommit(String),
}

/// Records every call and serves pre-seeded pull requests and reviews
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<ApiCall>>,
    pulls: Mutex<Vec<(PullRequest, Vec<Review>)>>,
    fail_next_create: AtomicBool,
    fail_pulls: AtomicBool,
    next_id: AtomicU64,
}

impl RecordingApi {
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn add_pull(&self, pull: PullRequest, reviews: Vec<Review>) {
        self.pulls.lock().unwrap().push((pull, reviews));
    }

    /// Make the next create_check_run call fail
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Make every pulls_for_commit call fail
    pub fn fail_pulls_for_commit(&self) {
        self.fail_pulls.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CheckApi for RecordingApi {
    async fn create_check_run(&self, _repo: &RepoId, check: &NewCheckRun) -> Result<u64> {
        self.record(ApiCall::CreateCheckRun {
            name: check.name.clone(),
            head_sha: check.head_sha.clone(),
            status: check.status,
            conclusion: check.conclusion,
        });
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(Error::UnexpectedStatus {
                status: 500,
                context: "create check run".to_string(),
            });
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn update_check_run(
        &self,
        _repo: &RepoId,
        check_run_id: u64,
        status: CheckStatus,
        conclusion: Option<CheckConclusion>,
    ) -> Result<()> {
        self.record(ApiCall::UpdateCheckRun {
            id: check_run_id,
            status,
            conclusion,
        });
        Ok(())
    }

    async fn get_pull_request(&self, _repo: &RepoId, number: u64) -> Result<PullRequest> {
        self.record(ApiCall::GetPullRequest(number));
        self.pulls
            .lock()
            .unwrap()
            .iter()
            .find(|(pull, _)| pull.number == number)
            .map(|(pull, _)| pull.clone())
            .ok_or_else(|| Error::Other(format!("no such pull request: {}", number)))
    }

    async fn list_reviews(&self, _repo: &RepoId, number: u64) -> Result<Vec<Review>> {
        self.record(ApiCall::ListReviews(number));
        Ok(self
            .pulls
            .lock()
            .unwrap()
            .iter()
            .find(|(pull, _)| pull.number == number)
            .map(|(_, reviews)| reviews.clone())
            .unwrap_or_default())
    }

    async fn pulls_for_commit(&self, _repo: &RepoId, sha: &str) -> Result<Vec<PrRef>> {
        self.record(ApiCall::PullsForCommit(sha.to_string()));
        if self.fail_pulls.load(Ordering::SeqCst) {
            return Err(Error::UnexpectedStatus {
                status: 500,
                context: "pulls for commit".to_string(),
            });
        }
        Ok(self
            .pulls
            .lock()
            .unwrap()
            .iter()
            .filter(|(pull, _)| pull.head_sha == sha)
            .map(|(pull, _)| PrRef {
                number: pull.number,
            })
            .collect())
    }
}
