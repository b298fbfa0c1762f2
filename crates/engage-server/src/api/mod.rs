mod calculate;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use engage_core::{AppConfig, ProfileSource};
use engage_metrics::CalculateError;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState};

/// Whether the platform session needs credentials, and whether they exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRequirement {
    Anonymous,
    Configured,
    MissingCredentials,
}

impl LoginRequirement {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        match (config.require_login, config.credentials()) {
            (false, _) => Self::Anonymous,
            (true, Some(_)) => Self::Configured,
            (true, None) => Self::MissingCredentials,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn ProfileSource>,
    pub login: LoginRequirement,
}

/// Failure classes surfaced by the HTTP layer, each with a fixed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidRequest,
    Lookup,
    NoPostsProcessed,
}

impl ErrorKind {
    fn status(self) -> StatusCode {
        match self {
            ErrorKind::NoPostsProcessed => StatusCode::BAD_REQUEST,
            ErrorKind::Configuration | ErrorKind::InvalidRequest | ErrorKind::Lookup => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

impl ApiError {
    pub fn new(kind: ErrorKind, request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            request_id: request_id.into(),
        }
    }

    pub(super) fn from_calculate(request_id: String, error: &CalculateError) -> Self {
        let kind = match error {
            CalculateError::Lookup(_) => ErrorKind::Lookup,
            CalculateError::NoPostsProcessed => ErrorKind::NoPostsProcessed,
        };
        Self::new(kind, request_id, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.kind.status();
        if status.is_server_error() {
            tracing::error!(
                request_id = %self.request_id,
                kind = ?self.kind,
                error = %self.message,
                "request failed"
            );
        } else {
            tracing::warn!(
                request_id = %self.request_id,
                kind = ?self.kind,
                error = %self.message,
                "request rejected"
            );
        }
        (
            status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let limited = Router::new()
        .route("/calculate", post(calculate::calculate_engagement))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(limited)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthData { status: "ok" }))
}
