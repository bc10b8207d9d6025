//! In-memory repository host for unit tests

use async_trait::async_trait;
use postbridge_core::{Error, MergeStrategy, PullRequestRef, Result};
use postbridge_github::{NewPullRequest, RepositoryHost, TreeEntry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Records every call as `"<operation> <args>"` and can fail a chosen operation
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<String>>,
    pull_requests: Mutex<Vec<NewPullRequest>>,
    fail_on: Mutex<Option<(String, usize)>>,
    next_number: AtomicU64,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            next_number: AtomicU64::new(1),
            ..Default::default()
        }
    }

    /// Fail the n-th (1-based) call of `operation` with a provider error
    pub fn failing_on(self, operation: &str, nth: usize) -> Self {
        *self.fail_on.lock().unwrap() = Some((operation.to_string(), nth));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .collect()
    }

    pub fn pull_requests(&self) -> Vec<NewPullRequest> {
        self.pull_requests.lock().unwrap().clone()
    }

    fn record(&self, operation: &str, args: String) -> Result<()> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(format!("{} {}", operation, args).trim_end().to_string());

        let count = calls
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count();

        match &*self.fail_on.lock().unwrap() {
            Some((op, nth)) if op == operation && *nth == count => Err(Error::Provider {
                status: 422,
                message: format!("{} failed", operation),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RepositoryHost for RecordingHost {
    async fn get_branch_head(&self, branch: &str) -> Result<String> {
        self.record("get_branch_head", branch.to_string())?;
        Ok(format!("head-of-{}", branch))
    }

    async fn create_branch(&self, branch: &str, from_sha: &str) -> Result<()> {
        self.record("create_branch", format!("{} {}", branch, from_sha))
    }

    async fn get_file_sha(&self, path: &str, branch: &str) -> Result<Option<String>> {
        self.record("get_file_sha", format!("{} {}", path, branch))?;
        Ok(None)
    }

    async fn create_or_update_file(
        &self,
        path: &str,
        _content: &str,
        _message: &str,
        branch: &str,
    ) -> Result<String> {
        self.record("create_or_update_file", format!("{} {}", path, branch))?;
        Ok(format!("commit-{}", path))
    }

    async fn create_blob(&self, content: &str) -> Result<String> {
        self.record("create_blob", String::new())?;
        Ok(format!("blob-{}", content.len()))
    }

    async fn get_commit_tree(&self, commit_sha: &str) -> Result<String> {
        self.record("get_commit_tree", commit_sha.to_string())?;
        Ok(format!("tree-of-{}", commit_sha))
    }

    async fn create_tree(&self, base_tree: &str, entries: &[TreeEntry]) -> Result<String> {
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        self.record("create_tree", format!("{} {}", base_tree, paths.join(",")))?;
        Ok("new-tree".to_string())
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parents: &[String],
    ) -> Result<String> {
        self.record(
            "create_commit",
            format!("{} {} {}", tree_sha, parents.join(","), message),
        )?;
        Ok("new-commit".to_string())
    }

    async fn update_branch(&self, branch: &str, sha: &str) -> Result<()> {
        self.record("update_branch", format!("{} {}", branch, sha))
    }

    async fn create_pull_request(&self, request: &NewPullRequest) -> Result<PullRequestRef> {
        self.record(
            "create_pull_request",
            format!("{} {}", request.head, request.base),
        )?;
        self.pull_requests.lock().unwrap().push(request.clone());
        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        Ok(PullRequestRef {
            number,
            url: format!("https://github.com/acme/site/pull/{}", number),
        })
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        self.record("add_labels", format!("{} {}", number, labels.join(",")))
    }

    async fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()> {
        self.record(
            "request_reviewers",
            format!("{} {}", number, reviewers.join(",")),
        )
    }

    async fn merge_pull_request(
        &self,
        number: u64,
        strategy: MergeStrategy,
        _commit_title: Option<&str>,
    ) -> Result<String> {
        self.record("merge_pull_request", format!("{} {}", number, strategy))?;
        Ok(format!("merge-{}", number))
    }
}
