//! Postbridge GitHub - GitHub API integration
//!
//! This crate provides the hosting-provider side of publishing:
//! - Branch and ref management
//! - Single-file commits through the contents API
//! - Multi-file commits through blobs, trees and commits
//! - Pull request creation, labels, reviewers and merging

pub mod client;
pub mod host;

pub use client::{GitHubClient, GitHubClientConfig};
pub use host::{FileChange, NewPullRequest, RepositoryHost, TreeEntry};
