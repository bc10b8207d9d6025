//! GitHub webhook receiver
//!
//! Verifies the delivery signature and runs pull request events through the
//! auto-merge rules.

use crate::auto_merge::{evaluate, MergeDecision, PullRequestEvent};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use postbridge_core::{AutoMergeConfig, Config, MergeStrategy};
use postbridge_github::RepositoryHost;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Webhook configuration
pub struct WebhookSettings {
    /// GitHub webhook secret for HMAC verification
    pub secret: Option<SecretString>,
    pub auto_merge: AutoMergeConfig,
    pub merge_strategy: MergeStrategy,
}

impl WebhookSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secret: config.webhook.secret.clone().map(SecretString::new),
            auto_merge: config.webhook.auto_merge.clone(),
            merge_strategy: config.publishing.merge_strategy,
        }
    }
}

/// Webhook handler state
pub struct WebhookState {
    pub settings: WebhookSettings,
    pub host: Arc<dyn RepositoryHost>,
}

impl WebhookState {
    pub fn new(settings: WebhookSettings, host: Arc<dyn RepositoryHost>) -> Self {
        Self { settings, host }
    }
}

/// Webhook response
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
}

impl WebhookResponse {
    fn new(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
            pr_number: None,
        }
    }

    fn for_pull_request(status: &str, message: impl Into<String>, number: u64) -> Self {
        Self {
            pr_number: Some(number),
            ..Self::new(status, message)
        }
    }
}

fn reply(status: StatusCode, response: WebhookResponse) -> (StatusCode, Json<WebhookResponse>) {
    (status, Json(response))
}

/// GitHub webhook handler
pub async fn github_webhook_handler(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event_type = match headers.get("x-github-event").map(|v| v.to_str()) {
        Some(Ok(v)) => v.to_string(),
        Some(Err(_)) => {
            warn!("Invalid X-GitHub-Event header");
            return reply(
                StatusCode::BAD_REQUEST,
                WebhookResponse::new("error", "Invalid X-GitHub-Event header"),
            );
        }
        None => {
            warn!("Missing X-GitHub-Event header");
            return reply(
                StatusCode::BAD_REQUEST,
                WebhookResponse::new("error", "Missing X-GitHub-Event header"),
            );
        }
    };

    let delivery_id = headers
        .get("x-github-delivery")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    debug!(
        event_type = %event_type,
        delivery_id = ?delivery_id,
        "Received GitHub webhook"
    );

    if let Some(ref secret) = state.settings.secret {
        let signature = match headers.get("x-hub-signature-256").map(|v| v.to_str()) {
            Some(Ok(v)) => v,
            Some(Err(_)) => {
                warn!("Invalid X-Hub-Signature-256 header");
                return reply(
                    StatusCode::UNAUTHORIZED,
                    WebhookResponse::new("error", "Invalid signature"),
                );
            }
            None => {
                warn!("Missing X-Hub-Signature-256 header");
                return reply(
                    StatusCode::UNAUTHORIZED,
                    WebhookResponse::new("error", "Missing signature"),
                );
            }
        };

        if !verify_signature(secret.expose_secret(), &body, signature) {
            error!(delivery_id = ?delivery_id, "Invalid webhook signature");
            return reply(
                StatusCode::UNAUTHORIZED,
                WebhookResponse::new("error", "Invalid signature"),
            );
        }
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Failed to parse webhook payload");
            return reply(
                StatusCode::BAD_REQUEST,
                WebhookResponse::new("error", format!("Invalid JSON payload: {}", e)),
            );
        }
    };

    if event_type != "pull_request" {
        debug!(event_type = %event_type, "Ignoring non pull_request event");
        return reply(
            StatusCode::OK,
            WebhookResponse::new("ignored", format!("Event '{}' ignored", event_type)),
        );
    }

    let event: PullRequestEvent = match serde_json::from_value(payload) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "Malformed pull_request payload");
            return reply(
                StatusCode::BAD_REQUEST,
                WebhookResponse::new("error", format!("Invalid pull_request payload: {}", e)),
            );
        }
    };
    let number = event.pull_request.number;

    if !crate::auto_merge::TRIGGER_ACTIONS.contains(&event.action.as_str()) {
        return reply(
            StatusCode::OK,
            WebhookResponse::for_pull_request(
                "ignored",
                format!("Action '{}' ignored", event.action),
                number,
            ),
        );
    }

    match evaluate(&state.settings.auto_merge, &event) {
        MergeDecision::Skip(reason) => {
            info!(pr = number, reason = %reason, "Auto-merge skipped");
            reply(
                StatusCode::OK,
                WebhookResponse::for_pull_request("skipped", reason, number),
            )
        }
        MergeDecision::Merge => {
            let strategy = state.settings.merge_strategy;
            match state
                .host
                .merge_pull_request(number, strategy, Some(event.pull_request.title.as_str()))
                .await
            {
                Ok(sha) => {
                    info!(pr = number, sha = %sha, strategy = %strategy, "Pull request auto-merged");
                    reply(
                        StatusCode::OK,
                        WebhookResponse::for_pull_request(
                            "merged",
                            format!("Merged with {}", strategy),
                            number,
                        ),
                    )
                }
                Err(e) => {
                    error!(pr = number, error = %e, "Auto-merge failed");
                    reply(
                        StatusCode::BAD_GATEWAY,
                        WebhookResponse::for_pull_request("error", e.to_string(), number),
                    )
                }
            }
        }
    }
}

/// Verify GitHub webhook signature using HMAC-SHA256
///
/// GitHub sends the signature in the format: "sha256=<hex-encoded-hmac>"
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let Some(signature) = signature.strip_prefix("sha256=") else {
        warn!("Signature doesn't start with 'sha256='");
        return false;
    };

    let expected = match hex::decode(signature) {
        Ok(sig) => sig,
        Err(e) => {
            warn!(error = %e, "Failed to decode signature hex");
            return false;
        }
    };

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "Failed to create HMAC");
            return false;
        }
    };
    mac.update(payload);

    mac.verify_slice(&expected).is_ok()
}
