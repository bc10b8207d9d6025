//! Postbridge Core - Domain types for publishing blog posts
//!
//! This crate provides the fundamental types shared by the service:
//! - Blog post submissions and validation
//! - Slug generation
//! - Markdown documents with YAML frontmatter
//! - Content catalog with identity-based deduplication
//! - Service configuration

pub mod catalog;
pub mod config;
pub mod error;
pub mod markdown;
pub mod post;
pub mod pr;
pub mod slug;

pub use catalog::{Catalog, CatalogEntry, ContentSource, Duplicate};
pub use config::{AutoMergeConfig, Config, GitHubConfig, PublishingConfig, ServerConfig, WebhookConfig};
pub use error::{Error, Result};
pub use markdown::{parse_document, post_path, render_document, FrontMatter};
pub use post::BlogPost;
pub use pr::{MergeStrategy, PublishMode, PullRequestRef};
pub use slug::{is_valid_slug, slugify};
