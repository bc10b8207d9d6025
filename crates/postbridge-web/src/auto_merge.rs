//! Auto-merge rules for pull request webhook events
//!
//! A pull request is merged only when its title carries the configured
//! prefix, it has the configured label, and its author is an allowed login.

use postbridge_core::AutoMergeConfig;
use serde::Deserialize;

/// Actions after which the rules are evaluated
pub const TRIGGER_ACTIONS: &[&str] = &[
    "opened",
    "reopened",
    "labeled",
    "synchronize",
    "ready_for_review",
];

/// The subset of a `pull_request` webhook payload the rules look at
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: PullRequestPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub merged: bool,
    pub user: Option<Actor>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

impl PullRequestPayload {
    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDecision {
    Merge,
    Skip(String),
}

impl MergeDecision {
    fn skip(reason: impl Into<String>) -> Self {
        MergeDecision::Skip(reason.into())
    }
}

/// Decide whether a pull request event should trigger a merge
pub fn evaluate(config: &AutoMergeConfig, event: &PullRequestEvent) -> MergeDecision {
    if !config.enabled {
        return MergeDecision::skip("auto-merge disabled");
    }

    if !TRIGGER_ACTIONS.contains(&event.action.as_str()) {
        return MergeDecision::skip(format!("action '{}' does not trigger auto-merge", event.action));
    }

    let pr = &event.pull_request;
    if pr.merged {
        return MergeDecision::skip("already merged");
    }
    if pr.state != "open" {
        return MergeDecision::skip(format!("pull request is {}", pr.state));
    }
    if pr.draft {
        return MergeDecision::skip("pull request is a draft");
    }

    let prefix = config.title_prefix.trim();
    if prefix.is_empty() || !pr.title.starts_with(prefix) {
        return MergeDecision::skip(format!("title does not start with '{}'", prefix));
    }

    if config.label.trim().is_empty() || !pr.has_label(config.label.trim()) {
        return MergeDecision::skip(format!("missing label '{}'", config.label));
    }

    match pr.author() {
        Some(author) if config.authors.iter().any(|a| a.eq_ignore_ascii_case(author)) => {
            MergeDecision::Merge
        }
        Some(author) => MergeDecision::skip(format!("author '{}' is not allowed", author)),
        None => MergeDecision::skip("pull request has no author"),
    }
}
