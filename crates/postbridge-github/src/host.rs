//! Repository host abstraction
//!
//! The publisher only needs a handful of primitives from the hosting
//! provider. Each is a single network call; `commit_files` composes them
//! into a multi-file commit.

use async_trait::async_trait;
use futures::future::try_join_all;
use postbridge_core::{MergeStrategy, PullRequestRef, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// File mode for regular (non-executable) blobs
pub const FILE_MODE: &str = "100644";

/// A file to write in a multi-file commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub content: String,
}

impl FileChange {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A blob entry of a git tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FILE_MODE.to_string(),
            kind: "blob".to_string(),
            sha: sha.into(),
        }
    }
}

/// Parameters of a pull request to open
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// SHA of the commit at the tip of a branch
    async fn get_branch_head(&self, branch: &str) -> Result<String>;

    /// Create a branch pointing at a commit
    async fn create_branch(&self, branch: &str, from_sha: &str) -> Result<()>;

    /// Blob SHA of a file on a branch, `None` when it does not exist
    async fn get_file_sha(&self, path: &str, branch: &str) -> Result<Option<String>>;

    /// Write one file as its own commit, returning the commit SHA
    async fn create_or_update_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> Result<String>;

    /// Upload a blob, returning its SHA
    async fn create_blob(&self, content: &str) -> Result<String>;

    /// Tree SHA of a commit
    async fn get_commit_tree(&self, commit_sha: &str) -> Result<String>;

    /// Create a tree on top of `base_tree`, returning its SHA
    async fn create_tree(&self, base_tree: &str, entries: &[TreeEntry]) -> Result<String>;

    /// Create a commit object, returning its SHA
    async fn create_commit(&self, message: &str, tree_sha: &str, parents: &[String])
        -> Result<String>;

    /// Move a branch to a commit (fast-forward only)
    async fn update_branch(&self, branch: &str, sha: &str) -> Result<()>;

    async fn create_pull_request(&self, request: &NewPullRequest) -> Result<PullRequestRef>;

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    async fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()>;

    /// Merge a pull request, returning the merge commit SHA
    async fn merge_pull_request(
        &self,
        number: u64,
        strategy: MergeStrategy,
        commit_title: Option<&str>,
    ) -> Result<String>;

    /// Commit several files to a branch at once.
    ///
    /// Blobs are uploaded concurrently; tree, commit and ref update follow
    /// strictly in order because each needs the previous SHA.
    async fn commit_files(&self, branch: &str, files: &[FileChange], message: &str) -> Result<String> {
        let head = self.get_branch_head(branch).await?;
        let base_tree = self.get_commit_tree(&head).await?;

        let blob_shas = try_join_all(files.iter().map(|f| self.create_blob(&f.content))).await?;
        debug!(branch = %branch, blobs = blob_shas.len(), "Uploaded blobs");

        let entries: Vec<TreeEntry> = files
            .iter()
            .zip(blob_shas)
            .map(|(file, sha)| TreeEntry::blob(file.path.clone(), sha))
            .collect();

        let tree = self.create_tree(&base_tree, &entries).await?;
        let commit = self.create_commit(message, &tree, &[head]).await?;
        self.update_branch(branch, &commit).await?;

        Ok(commit)
    }
}
