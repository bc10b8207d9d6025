//! Publishing workflow
//!
//! Turns validated posts into branches, commits and pull requests on the
//! repository host. Separate mode opens one pull request per post and waits
//! a fixed delay between posts to stay under provider rate limits. Batch mode
//! puts every post into a single multi-file commit and pull request.
//!
//! There is no retry and no rollback: the first failing call stops the run
//! and anything already created (branches, pull requests) stays in place.

use postbridge_core::{
    post_path, render_document, BlogPost, Config, Error, MergeStrategy, PublishMode,
    PullRequestRef, Result,
};
use postbridge_github::{FileChange, NewPullRequest, RepositoryHost};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Publisher settings derived from the service configuration
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub base_branch: String,
    pub content_dir: String,
    pub branch_prefix: String,
    pub title_prefix: String,
    pub labels: Vec<String>,
    pub delay: Duration,
    pub merge_strategy: MergeStrategy,
    pub max_posts: usize,
}

impl PublishSettings {
    pub fn from_config(config: &Config) -> Self {
        let publishing = &config.publishing;
        Self {
            base_branch: config.github.base_branch.clone(),
            content_dir: publishing.content_dir.clone(),
            branch_prefix: publishing.branch_prefix.clone(),
            title_prefix: publishing.title_prefix.clone(),
            labels: publishing.labels.clone(),
            delay: Duration::from_millis(publishing.delay_ms),
            merge_strategy: publishing.merge_strategy,
            max_posts: publishing.max_posts,
        }
    }
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Per-request publishing options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PublishOptions {
    pub reviewers: Vec<String>,
    pub labels: Vec<String>,
    #[serde(alias = "base_branch")]
    pub base_branch: Option<String>,
    #[serde(alias = "auto_merge")]
    pub auto_merge: bool,
    #[serde(alias = "batch_mode", alias = "batch")]
    pub batch_mode: bool,
}

impl PublishOptions {
    pub fn mode(&self) -> PublishMode {
        if self.batch_mode {
            PublishMode::Batch
        } else {
            PublishMode::Separate
        }
    }
}

/// Outcome for one submitted post
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostResult {
    pub title: String,
    pub slug: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    pub merged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PostResult {
    fn for_post(post: &BlogPost, content_dir: &str) -> Self {
        let slug = post.slug();
        Self {
            title: post.title.clone(),
            path: post_path(content_dir, &slug),
            slug,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a publish request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    pub success: bool,
    pub mode: PublishMode,
    pub results: Vec<PostResult>,
    /// Posts not attempted because an earlier post failed
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishReport {
    /// Pull request URLs in submission order, without repeats
    pub fn pull_request_urls(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.results
            .iter()
            .filter_map(|r| r.pr_url.as_deref())
            .filter(|url| seen.insert(*url))
            .collect()
    }
}

/// A rendered post that has not been pushed anywhere
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderedPost {
    pub slug: String,
    pub path: String,
    pub markdown: String,
}

pub struct Publisher {
    host: Arc<dyn RepositoryHost>,
    settings: PublishSettings,
}

impl Publisher {
    pub fn new(host: Arc<dyn RepositoryHost>, settings: PublishSettings) -> Self {
        Self { host, settings }
    }

    /// Check the submission shape before any provider call
    pub fn validate(&self, posts: &[BlogPost], mode: PublishMode) -> Result<()> {
        if posts.is_empty() {
            return Err(Error::Validation("At least one post is required".to_string()));
        }

        if posts.len() > self.settings.max_posts {
            return Err(Error::Validation(format!(
                "Too many posts: {} (maximum {})",
                posts.len(),
                self.settings.max_posts
            )));
        }

        for (index, post) in posts.iter().enumerate() {
            post.validate().map_err(|e| match e {
                Error::Validation(msg) => Error::Validation(format!("posts[{}]: {}", index, msg)),
                other => other,
            })?;
        }

        // One tree cannot hold two files at the same path
        if mode == PublishMode::Batch {
            let mut seen = HashSet::new();
            for post in posts {
                let slug = post.slug();
                if !seen.insert(slug.clone()) {
                    return Err(Error::Validation(format!(
                        "Duplicate slug '{}' in batch",
                        slug
                    )));
                }
            }
        }

        Ok(())
    }

    /// Render posts to Markdown without publishing them
    pub fn render(&self, posts: &[BlogPost]) -> Result<Vec<RenderedPost>> {
        self.validate(posts, PublishMode::Separate)?;
        posts
            .iter()
            .map(|post| -> Result<RenderedPost> {
                let slug = post.slug();
                Ok(RenderedPost {
                    path: post_path(&self.settings.content_dir, &slug),
                    markdown: render_document(post)?,
                    slug,
                })
            })
            .collect()
    }

    /// Publish posts.
    ///
    /// Returns `Err` only for validation failures. Provider failures are
    /// reported inside the returned report with `success == false`.
    pub async fn publish(
        &self,
        posts: &[BlogPost],
        options: &PublishOptions,
    ) -> Result<PublishReport> {
        let mode = options.mode();
        self.validate(posts, mode)?;

        info!(
            posts = posts.len(),
            mode = ?mode,
            auto_merge = options.auto_merge,
            "Publishing posts"
        );

        let report = match mode {
            PublishMode::Separate => self.publish_separate(posts, options).await,
            PublishMode::Batch => self.publish_batch(posts, options).await,
        };

        if report.success {
            info!(urls = ?report.pull_request_urls(), "Publishing finished");
        } else {
            warn!(error = ?report.error, skipped = report.skipped, "Publishing failed");
        }

        Ok(report)
    }

    async fn publish_separate(&self, posts: &[BlogPost], options: &PublishOptions) -> PublishReport {
        let mut results = Vec::with_capacity(posts.len());
        let mut error = None;

        for (index, post) in posts.iter().enumerate() {
            if index > 0 && !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }

            let mut result = PostResult::for_post(post, &self.settings.content_dir);
            if let Err(e) = self.publish_post(post, options, &mut result).await {
                warn!(title = %post.title, error = %e, "Failed to publish post");
                result.error = Some(e.to_string());
                error = Some(e.to_string());
                results.push(result);
                break;
            }
            results.push(result);
        }

        PublishReport {
            success: error.is_none(),
            mode: PublishMode::Separate,
            skipped: posts.len() - results.len(),
            results,
            error,
        }
    }

    async fn publish_post(
        &self,
        post: &BlogPost,
        options: &PublishOptions,
        result: &mut PostResult,
    ) -> Result<()> {
        let base = self.base_branch(options);
        let document = render_document(post)?;
        let branch = format!(
            "{}/{}-{}",
            self.settings.branch_prefix, result.slug, short_id()
        );

        let head = self.host.get_branch_head(base).await?;
        self.host.create_branch(&branch, &head).await?;
        result.branch = Some(branch.clone());

        self.host
            .create_or_update_file(
                &result.path,
                &document,
                &format!("Add blog post: {}", post.title),
                &branch,
            )
            .await?;

        let title = self.pr_title(&post.title);
        let pr = self
            .host
            .create_pull_request(&NewPullRequest {
                title: title.clone(),
                head: branch,
                base: base.to_string(),
                body: single_post_body(post, &result.path),
            })
            .await?;
        result.pr_number = Some(pr.number);
        result.pr_url = Some(pr.url.clone());

        result.merged = self.finish_pull_request(&pr, &title, options).await?;
        Ok(())
    }

    async fn publish_batch(&self, posts: &[BlogPost], options: &PublishOptions) -> PublishReport {
        let mut results: Vec<PostResult> = posts
            .iter()
            .map(|p| PostResult::for_post(p, &self.settings.content_dir))
            .collect();

        let outcome = self.publish_batch_inner(posts, options, &mut results).await;
        let error = outcome.err().map(|e| {
            warn!(error = %e, "Failed to publish batch");
            e.to_string()
        });

        if let Some(message) = &error {
            for result in &mut results {
                result.error = Some(message.clone());
            }
        }

        PublishReport {
            success: error.is_none(),
            mode: PublishMode::Batch,
            results,
            skipped: 0,
            error,
        }
    }

    async fn publish_batch_inner(
        &self,
        posts: &[BlogPost],
        options: &PublishOptions,
        results: &mut [PostResult],
    ) -> Result<()> {
        let base = self.base_branch(options);
        let files = posts
            .iter()
            .zip(results.iter())
            .map(|(post, result)| -> Result<FileChange> {
                Ok(FileChange::new(result.path.clone(), render_document(post)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let branch = format!("{}/batch-{}", self.settings.branch_prefix, short_id());
        let head = self.host.get_branch_head(base).await?;
        self.host.create_branch(&branch, &head).await?;
        for result in results.iter_mut() {
            result.branch = Some(branch.clone());
        }

        self.host
            .commit_files(&branch, &files, &format!("Add {}", count_posts(posts.len())))
            .await?;

        let title = self.pr_title(&format!("Publish {}", count_posts(posts.len())));
        let pr = self
            .host
            .create_pull_request(&NewPullRequest {
                title: title.clone(),
                head: branch,
                base: base.to_string(),
                body: batch_body(posts, results),
            })
            .await?;
        for result in results.iter_mut() {
            result.pr_number = Some(pr.number);
            result.pr_url = Some(pr.url.clone());
        }

        let merged = self.finish_pull_request(&pr, &title, options).await?;
        for result in results.iter_mut() {
            result.merged = merged;
        }

        Ok(())
    }

    /// Labels, reviewers and the optional merge; returns whether it merged
    async fn finish_pull_request(
        &self,
        pr: &PullRequestRef,
        title: &str,
        options: &PublishOptions,
    ) -> Result<bool> {
        let labels = merge_labels(&self.settings.labels, &options.labels);
        if !labels.is_empty() {
            self.host.add_labels(pr.number, &labels).await?;
        }

        if !options.reviewers.is_empty() {
            self.host
                .request_reviewers(pr.number, &options.reviewers)
                .await?;
        }

        if !options.auto_merge {
            return Ok(false);
        }

        self.host
            .merge_pull_request(pr.number, self.settings.merge_strategy, Some(title))
            .await?;
        Ok(true)
    }

    fn base_branch<'a>(&'a self, options: &'a PublishOptions) -> &'a str {
        options
            .base_branch
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(&self.settings.base_branch)
    }

    fn pr_title(&self, title: &str) -> String {
        let prefix = self.settings.title_prefix.trim();
        if prefix.is_empty() {
            title.to_string()
        } else {
            format!("{} {}", prefix, title)
        }
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn count_posts(n: usize) -> String {
    if n == 1 {
        "1 post".to_string()
    } else {
        format!("{} posts", n)
    }
}

/// Configured labels first, then request labels, without repeats
fn merge_labels(defaults: &[String], requested: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    defaults
        .iter()
        .chain(requested)
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .filter(|l| seen.insert(l.to_string()))
        .map(str::to_string)
        .collect()
}

fn single_post_body(post: &BlogPost, path: &str) -> String {
    let mut body = String::from("Adds a new blog post.\n\n");
    body.push_str(&format!("- **Title:** {}\n", post.title));
    if !post.author.is_empty() {
        body.push_str(&format!("- **Author:** {}\n", post.author));
    }
    body.push_str(&format!("- **Date:** {}\n", post.date));
    body.push_str(&format!("- **Published:** {}\n", post.published));
    body.push_str(&format!("- **File:** `{}`\n", path));
    if !post.description.is_empty() {
        body.push_str(&format!("\n> {}\n", post.description));
    }
    body
}

fn batch_body(posts: &[BlogPost], results: &[PostResult]) -> String {
    let mut body = format!("Adds {}.\n\n", count_posts(posts.len()));
    for (post, result) in posts.iter().zip(results) {
        body.push_str(&format!("- **{}** (`{}`)", post.title, result.path));
        if !post.author.is_empty() {
            body.push_str(&format!(" by {}", post.author));
        }
        body.push('\n');
    }
    body
}
