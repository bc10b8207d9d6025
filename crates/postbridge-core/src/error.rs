//! Error types for postbridge-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("GitHub API error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Input validation failures, as opposed to provider or transport failures
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// HTTP status returned by the provider, if the error came from one
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            Error::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_category() {
        assert!(Error::Validation("empty title".into()).is_validation());
        assert!(!Error::Http("connection refused".into()).is_validation());
    }

    #[test]
    fn test_provider_error_display() {
        let err = Error::Provider {
            status: 422,
            message: "Reference already exists".into(),
        };
        assert_eq!(err.provider_status(), Some(422));
        assert_eq!(
            err.to_string(),
            "GitHub API error (422): Reference already exists"
        );
    }
}
