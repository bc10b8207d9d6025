//! Pull request types shared by the client and the publisher

use serde::{Deserialize, Serialize};
use std::fmt;

/// Merge strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Squash all commits
    #[default]
    Squash,
    /// Rebase onto target
    Rebase,
    /// Merge commit
    Merge,
}

impl MergeStrategy {
    /// Value of GitHub's `merge_method` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Squash => "squash",
            MergeStrategy::Rebase => "rebase",
            MergeStrategy::Merge => "merge",
        }
    }

    /// Parse from string representation
    pub fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "squash" => Ok(MergeStrategy::Squash),
            "rebase" => Ok(MergeStrategy::Rebase),
            "merge" => Ok(MergeStrategy::Merge),
            _ => Err(crate::Error::Config(format!(
                "Unknown merge strategy: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pull request opened on the hosting provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub url: String,
}

/// How a submission is turned into pull requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// One branch, commit and pull request per post
    #[default]
    Separate,
    /// All posts in a single branch, commit and pull request
    Batch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_strategy_parse() {
        assert_eq!(MergeStrategy::from_str("squash").unwrap(), MergeStrategy::Squash);
        assert_eq!(MergeStrategy::from_str("rebase").unwrap(), MergeStrategy::Rebase);
        assert_eq!(MergeStrategy::from_str("merge").unwrap(), MergeStrategy::Merge);
        assert!(MergeStrategy::from_str("fast-forward").is_err());
    }

    #[test]
    fn test_merge_strategy_serde() {
        let strategy: MergeStrategy = serde_yaml::from_str("rebase").unwrap();
        assert_eq!(strategy, MergeStrategy::Rebase);
        assert_eq!(MergeStrategy::default().to_string(), "squash");
    }

    #[test]
    fn test_publish_mode_serde() {
        assert_eq!(
            serde_json::to_string(&PublishMode::Batch).unwrap(),
            "\"batch\""
        );
        assert_eq!(PublishMode::default(), PublishMode::Separate);
    }
}
