//! Service configuration
//!
//! Loaded from a YAML file with `${VAR}` environment substitution. Every
//! section and field has a default so partial files are accepted; the
//! GitHub coordinates are checked by [`Config::validate`] before anything
//! talks to the provider.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::pr::MergeStrategy;
use crate::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

static ENV_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub publishing: PublishingConfig,
    pub webhook: WebhookConfig,
    pub server: ServerConfig,
}

/// Target repository and credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub base_branch: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            owner: String::new(),
            repo: String::new(),
            token: None,
            base_branch: "main".to_string(),
        }
    }
}

/// How posts become branches, files and pull requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublishingConfig {
    /// Directory inside the repository that receives Markdown files
    pub content_dir: String,
    pub branch_prefix: String,
    /// Prefix of every pull request title
    pub title_prefix: String,
    /// Labels added to every pull request
    pub labels: Vec<String>,
    /// Pause between independent per-post publishing runs
    pub delay_ms: u64,
    pub merge_strategy: MergeStrategy,
    pub max_posts: usize,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            content_dir: "content/blog".to_string(),
            branch_prefix: "blog".to_string(),
            title_prefix: "Blog:".to_string(),
            labels: Vec::new(),
            delay_ms: 1000,
            merge_strategy: MergeStrategy::Squash,
            max_posts: 50,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook secret for signature verification
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    pub auto_merge: AutoMergeConfig,
}

/// Conditions under which the webhook merges a pull request.
///
/// All three must hold: title prefix, label presence and author identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutoMergeConfig {
    pub enabled: bool,
    pub title_prefix: String,
    pub label: String,
    pub authors: Vec<String>,
}

impl Default for AutoMergeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title_prefix: "Blog:".to_string(),
            label: "automerge".to_string(),
            authors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let yaml = substitute_env_vars(yaml);
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&yaml)
            .map_err(|e| Error::Config(format!("Failed to parse YAML config: {}", e)))
    }

    /// Check that the provider coordinates are present
    pub fn validate(&self) -> Result<()> {
        if self.github.owner.trim().is_empty() {
            return Err(Error::Config("github.owner is required".to_string()));
        }
        if self.github.repo.trim().is_empty() {
            return Err(Error::Config("github.repo is required".to_string()));
        }
        if self
            .github
            .token
            .as_deref()
            .map_or(true, |t| t.trim().is_empty())
        {
            return Err(Error::Config("github.token is required".to_string()));
        }
        if self.github.base_branch.trim().is_empty() {
            return Err(Error::Config("github.base_branch cannot be empty".to_string()));
        }
        if self.publishing.max_posts == 0 {
            return Err(Error::Config("publishing.max_posts must be positive".to_string()));
        }
        Ok(())
    }
}

/// Substitute `${VAR_NAME}` references with environment values.
///
/// Unset variables keep their placeholder.
fn substitute_env_vars(yaml: &str) -> String {
    ENV_VAR
        .replace_all(yaml, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.github.api_url, DEFAULT_API_URL);
        assert_eq!(config.github.base_branch, "main");
        assert_eq!(config.publishing.content_dir, "content/blog");
        assert_eq!(config.publishing.delay_ms, 1000);
        assert_eq!(config.publishing.merge_strategy, MergeStrategy::Squash);
        assert_eq!(config.webhook.auto_merge.label, "automerge");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_config_empty_yaml() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
github:
  owner: acme
  repo: website
  token: ghp_example
  base_branch: develop
publishing:
  content_dir: src/posts
  labels: [blog, content]
  delay_ms: 250
  merge_strategy: rebase
webhook:
  secret: hook-secret
  auto_merge:
    title_prefix: "[blog]"
    authors: [publisher-bot]
server:
  port: 9000
"#;

        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.github.owner, "acme");
        assert_eq!(config.github.repo, "website");
        assert_eq!(config.github.token.as_deref(), Some("ghp_example"));
        assert_eq!(config.github.base_branch, "develop");
        assert_eq!(config.github.api_url, DEFAULT_API_URL);
        assert_eq!(config.publishing.content_dir, "src/posts");
        assert_eq!(config.publishing.labels, vec!["blog", "content"]);
        assert_eq!(config.publishing.delay_ms, 250);
        assert_eq!(config.publishing.merge_strategy, MergeStrategy::Rebase);
        assert_eq!(config.publishing.branch_prefix, "blog");
        assert_eq!(config.webhook.secret.as_deref(), Some("hook-secret"));
        assert_eq!(config.webhook.auto_merge.title_prefix, "[blog]");
        assert_eq!(config.webhook.auto_merge.label, "automerge");
        assert_eq!(config.webhook.auto_merge.authors, vec!["publisher-bot"]);
        assert!(config.webhook.auto_merge.enabled);
        assert_eq!(config.server.port, 9000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_env_var_substitution() {
        std::env::set_var("POSTBRIDGE_TEST_TOKEN", "token-from-env");

        let yaml = r#"
github:
  owner: acme
  repo: site
  token: ${POSTBRIDGE_TEST_TOKEN}
"#;

        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.github.token.as_deref(), Some("token-from-env"));

        std::env::remove_var("POSTBRIDGE_TEST_TOKEN");
    }

    #[test]
    fn test_config_missing_env_var_keeps_placeholder() {
        std::env::remove_var("POSTBRIDGE_NONEXISTENT_VAR");

        let yaml = "webhook:\n  secret: ${POSTBRIDGE_NONEXISTENT_VAR}\n";
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.webhook.secret.as_deref(),
            Some("${POSTBRIDGE_NONEXISTENT_VAR}")
        );
    }

    #[test]
    fn test_config_invalid_yaml() {
        let err = Config::from_yaml_str("github: [not, a, map]").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_requires_coordinates() {
        let mut config = Config::default();
        assert!(config.validate().unwrap_err().to_string().contains("owner"));

        config.github.owner = "acme".into();
        assert!(config.validate().unwrap_err().to_string().contains("repo"));

        config.github.repo = "site".into();
        assert!(config.validate().unwrap_err().to_string().contains("token"));

        config.github.token = Some("t".into());
        assert!(config.validate().is_ok());

        config.github.base_branch = "  ".into();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("github.base_branch cannot be empty"));

        config.github.base_branch = "main".into();
        config.publishing.max_posts = 0;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("publishing.max_posts must be positive"));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postbridge.yaml");
        std::fs::write(&path, "publishing:\n  branch_prefix: posts\n").unwrap();

        let config = Config::from_yaml_file(&path).unwrap();
        assert_eq!(config.publishing.branch_prefix, "posts");

        let missing = Config::from_yaml_file(dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
