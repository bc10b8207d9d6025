//! Postbridge Web - HTTP service
//!
//! This crate provides:
//! - The publishing workflow (branches, commits, pull requests)
//! - REST API for publishing and previewing posts
//! - GitHub webhook receiver with auto-merge rules

pub mod api;
pub mod auto_merge;
pub mod publisher;
pub mod webhook;

#[cfg(test)]
mod test_support;

pub use api::{create_api_router, create_router, router_from_config, ApiError, AppState};
pub use auto_merge::{evaluate, MergeDecision, PullRequestEvent};
pub use publisher::{
    PostResult, PublishOptions, PublishReport, PublishSettings, Publisher, RenderedPost,
};
pub use webhook::{github_webhook_handler, WebhookResponse, WebhookSettings, WebhookState};
