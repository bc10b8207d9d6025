//! GitHub REST API client
//!
//! Uses the secrecy crate to protect the access token in memory. Calls are
//! made once; a non-2xx response is reported as `Error::Provider` carrying
//! GitHub's own message.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use postbridge_core::{Error, GitHubConfig, MergeStrategy, PullRequestRef, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::host::{NewPullRequest, RepositoryHost, TreeEntry};

/// Default timeout for API requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const API_VERSION: &str = "2022-11-28";

/// Configuration for the GitHub client
pub struct GitHubClientConfig {
    /// Base URL for the API
    pub api_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            api_url: postbridge_core::config::DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: 10,
            user_agent: concat!("postbridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// GitHub API client scoped to one repository
pub struct GitHubClient {
    api_url: String,
    owner: String,
    repo: String,
    token: SecretString,
    http: reqwest::Client,
}

impl GitHubClient {
    /// Create a client for `owner/repo`
    pub fn with_config(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
        config: GitHubClientConfig,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token: SecretString::new(token.into()),
            http,
        })
    }

    /// Create a client from the `github` section of the service configuration
    pub fn from_config(config: &GitHubConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| Error::Config("GitHub token is required".to_string()))?;

        Self::with_config(
            config.owner.clone(),
            config.repo.clone(),
            token,
            GitHubClientConfig {
                api_url: config.api_url.clone(),
                ..Default::default()
            },
        )
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, self.owner, self.repo, path
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.repo_url(path))
            .bearer_auth(self.token.expose_secret())
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", API_VERSION)
    }

    /// Send a request and decode a JSON response
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.execute(request).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Http(format!("Invalid response body: {}", e)))
    }

    /// Send a request whose response body is not needed
    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        self.execute(request).await.map(|_| ())
    }

    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(provider_error(status, &body))
    }
}

/// Build a provider error from a failed response, preferring GitHub's `message`
fn provider_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string());

    Error::Provider {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn get_branch_head(&self, branch: &str) -> Result<String> {
        debug!(repo = %self.full_name(), branch = %branch, "Fetching branch head");
        let reference: GitRef = self
            .send(self.request(Method::GET, &format!("git/ref/heads/{}", branch)))
            .await?;
        Ok(reference.object.sha)
    }

    async fn create_branch(&self, branch: &str, from_sha: &str) -> Result<()> {
        debug!(branch = %branch, sha = %from_sha, "Creating branch");
        let body = CreateRefRequest {
            reference: format!("refs/heads/{}", branch),
            sha: from_sha.to_string(),
        };
        self.send_empty(self.request(Method::POST, "git/refs").json(&body))
            .await
    }

    async fn get_file_sha(&self, path: &str, branch: &str) -> Result<Option<String>> {
        let request = self
            .request(Method::GET, &format!("contents/{}", path))
            .query(&[("ref", branch)]);

        match self.send::<ContentFile>(request).await {
            Ok(file) => Ok(Some(file.sha)),
            Err(Error::Provider { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_or_update_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> Result<String> {
        let existing = self.get_file_sha(path, branch).await?;
        debug!(
            path = %path,
            branch = %branch,
            update = existing.is_some(),
            "Writing file"
        );

        let body = PutContentRequest {
            message: message.to_string(),
            content: STANDARD.encode(content.as_bytes()),
            branch: branch.to_string(),
            sha: existing,
        };
        let response: PutContentResponse = self
            .send(
                self.request(Method::PUT, &format!("contents/{}", path))
                    .json(&body),
            )
            .await?;
        Ok(response.commit.sha)
    }

    async fn create_blob(&self, content: &str) -> Result<String> {
        let body = CreateBlobRequest {
            content: content.to_string(),
            encoding: "utf-8".to_string(),
        };
        let blob: ShaObject = self
            .send(self.request(Method::POST, "git/blobs").json(&body))
            .await?;
        Ok(blob.sha)
    }

    async fn get_commit_tree(&self, commit_sha: &str) -> Result<String> {
        let commit: GitCommit = self
            .send(self.request(Method::GET, &format!("git/commits/{}", commit_sha)))
            .await?;
        Ok(commit.tree.sha)
    }

    async fn create_tree(&self, base_tree: &str, entries: &[TreeEntry]) -> Result<String> {
        let body = CreateTreeRequest {
            base_tree: base_tree.to_string(),
            tree: entries.to_vec(),
        };
        let tree: ShaObject = self
            .send(self.request(Method::POST, "git/trees").json(&body))
            .await?;
        Ok(tree.sha)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parents: &[String],
    ) -> Result<String> {
        let body = CreateCommitRequest {
            message: message.to_string(),
            tree: tree_sha.to_string(),
            parents: parents.to_vec(),
        };
        let commit: ShaObject = self
            .send(self.request(Method::POST, "git/commits").json(&body))
            .await?;
        Ok(commit.sha)
    }

    async fn update_branch(&self, branch: &str, sha: &str) -> Result<()> {
        let body = UpdateRefRequest {
            sha: sha.to_string(),
            force: false,
        };
        self.send_empty(
            self.request(Method::PATCH, &format!("git/refs/heads/{}", branch))
                .json(&body),
        )
        .await
    }

    async fn create_pull_request(&self, request: &NewPullRequest) -> Result<PullRequestRef> {
        let pr: PullRequestResponse = self
            .send(self.request(Method::POST, "pulls").json(request))
            .await?;

        info!(
            repo = %self.full_name(),
            number = pr.number,
            head = %request.head,
            "Opened pull request"
        );

        Ok(PullRequestRef {
            number: pr.number,
            url: pr.html_url,
        })
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        let body = LabelsRequest {
            labels: labels.to_vec(),
        };
        self.send_empty(
            self.request(Method::POST, &format!("issues/{}/labels", number))
                .json(&body),
        )
        .await
    }

    async fn request_reviewers(&self, number: u64, reviewers: &[String]) -> Result<()> {
        let body = ReviewersRequest {
            reviewers: reviewers.to_vec(),
        };
        self.send_empty(
            self.request(
                Method::POST,
                &format!("pulls/{}/requested_reviewers", number),
            )
            .json(&body),
        )
        .await
    }

    async fn merge_pull_request(
        &self,
        number: u64,
        strategy: MergeStrategy,
        commit_title: Option<&str>,
    ) -> Result<String> {
        let body = MergeRequest {
            merge_method: strategy.as_str().to_string(),
            commit_title: commit_title.map(str::to_string),
        };
        let merge: MergeResponse = self
            .send(
                self.request(Method::PUT, &format!("pulls/{}/merge", number))
                    .json(&body),
            )
            .await?;

        if !merge.merged {
            return Err(Error::Provider {
                status: StatusCode::OK.as_u16(),
                message: merge
                    .message
                    .unwrap_or_else(|| format!("Pull request #{} was not merged", number)),
            });
        }

        info!(number = number, strategy = %strategy, "Merged pull request");
        Ok(merge.sha.unwrap_or_default())
    }
}

// GitHub API request/response types

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ShaObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: ShaObject,
}

#[derive(Debug, Deserialize)]
struct GitCommit {
    tree: ShaObject,
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutContentResponse {
    commit: ShaObject,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    number: u64,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct MergeResponse {
    sha: Option<String>,
    merged: bool,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateRefRequest {
    #[serde(rename = "ref")]
    reference: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct UpdateRefRequest {
    sha: String,
    force: bool,
}

#[derive(Debug, Serialize)]
struct PutContentRequest {
    message: String,
    content: String,
    branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateBlobRequest {
    content: String,
    encoding: String,
}

#[derive(Debug, Serialize)]
struct CreateTreeRequest {
    base_tree: String,
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Serialize)]
struct CreateCommitRequest {
    message: String,
    tree: String,
    parents: Vec<String>,
}

#[derive(Debug, Serialize)]
struct LabelsRequest {
    labels: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ReviewersRequest {
    reviewers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MergeRequest {
    merge_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit_title: Option<String>,
}
