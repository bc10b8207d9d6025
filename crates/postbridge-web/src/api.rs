//! REST API endpoints with authentication and validation

use crate::publisher::{PublishOptions, PublishReport, PublishSettings, Publisher, RenderedPost};
use crate::webhook::{github_webhook_handler, WebhookSettings, WebhookState};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use postbridge_core::{BlogPost, Config, Error};
use postbridge_github::RepositoryHost;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "provider_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl ApiError {
    fn unauthorized() -> Self {
        Self {
            error: "Invalid or missing API key".to_string(),
            code: "unauthorized".to_string(),
        }
    }

    fn validation(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "validation_error".to_string(),
        }
    }

    fn provider(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "provider_error".to_string(),
        }
    }

    fn internal(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: "internal_error".to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => ApiError::validation(msg),
            Error::Provider { .. } | Error::Http(_) => ApiError::provider(err.to_string()),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

/// Application state
pub struct AppState {
    pub publisher: Publisher,
    pub api_key: Option<SecretString>,
}

impl AppState {
    /// Create new app state with optional API key authentication
    pub fn new(publisher: Publisher, api_key: Option<String>) -> Self {
        Self {
            publisher,
            api_key: api_key.map(SecretString::new),
        }
    }
}

/// Authentication middleware
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // If no API key configured, allow all requests
    let Some(ref expected_key) = state.api_key else {
        return Ok(next.run(request).await);
    };

    let headers = request.headers();
    let provided_key = headers
        .get("x-api-key")
        .or_else(|| headers.get("authorization"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.strip_prefix("Bearer ").unwrap_or(s));

    match provided_key {
        Some(key) if key == expected_key.expose_secret() => Ok(next.run(request).await),
        _ => {
            warn!(path = %request.uri().path(), "Rejected request with invalid API key");
            Err(ApiError::unauthorized())
        }
    }
}

/// Create the API router (API endpoints only)
pub fn create_api_router(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/api/publish", post(publish_posts))
        .route("/api/preview", post(preview_posts))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let public_routes = Router::new().route("/api/health", get(health_check));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .with_state(state)
}

/// Create the full router with the API and the GitHub webhook receiver
pub fn create_router(state: Arc<AppState>, webhook_state: Arc<WebhookState>) -> Router {
    let webhook_router = Router::new()
        .route("/webhooks/github", post(github_webhook_handler))
        .with_state(webhook_state);

    Router::new()
        .merge(create_api_router(state))
        .merge(webhook_router)
        .layer(TraceLayer::new_for_http())
}

/// Wire a router for a repository host from the service configuration
pub fn router_from_config(host: Arc<dyn RepositoryHost>, config: &Config) -> Router {
    let publisher = Publisher::new(host.clone(), PublishSettings::from_config(config));
    let state = Arc::new(AppState::new(publisher, config.server.api_key.clone()));
    let webhook_state = Arc::new(WebhookState::new(WebhookSettings::from_config(config), host));
    create_router(state, webhook_state)
}

// ==================== Handlers ====================

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn publish_posts(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;

    let report = state.publisher.publish(&req.posts, &req.options).await?;

    if report.success {
        return Ok((StatusCode::OK, Json(report)).into_response());
    }

    error!(error = ?report.error, "Publish request failed at the provider");
    Ok((
        StatusCode::BAD_GATEWAY,
        Json(PublishFailure {
            code: "provider_error".to_string(),
            report,
        }),
    )
        .into_response())
}

async fn preview_posts(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<Json<Vec<RenderedPost>>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(state.publisher.render(&req.posts)?))
}

// ==================== Request/Response Types ====================

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub posts: Vec<BlogPost>,
    #[serde(default)]
    pub options: PublishOptions,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub posts: Vec<BlogPost>,
}

/// Body of a 502 response: the partial report plus an error code
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishFailure {
    pub code: String,
    #[serde(flatten)]
    pub report: PublishReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
