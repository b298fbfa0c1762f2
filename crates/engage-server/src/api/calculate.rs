use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use engage_metrics::{calculate, EngagementResult, DEFAULT_SAMPLE_SIZE};
use serde::Deserialize;

use super::{ApiError, AppState, ErrorKind, LoginRequirement};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct CalculateRequest {
    username: Option<String>,
    post_limit: Option<i64>,
}

/// `POST /calculate`
///
/// Checks run in a fixed order: session configuration, request body,
/// handle lookup, then sampling.
pub(super) async fn calculate_engagement(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<EngagementResult>, ApiError> {
    if state.login == LoginRequirement::MissingCredentials {
        return Err(ApiError::new(
            ErrorKind::Configuration,
            req_id.0,
            "Instagram credentials not set",
        ));
    }

    let Json(request) = body.map_err(|rejection| {
        ApiError::new(ErrorKind::InvalidRequest, req_id.0.clone(), rejection.body_text())
    })?;

    let username = request
        .username
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| {
            ApiError::new(
                ErrorKind::InvalidRequest,
                req_id.0.clone(),
                "username is required",
            )
        })?;

    let sample_size = match request.post_limit {
        None => DEFAULT_SAMPLE_SIZE,
        Some(limit) => usize::try_from(limit).map_err(|_| {
            ApiError::new(
                ErrorKind::InvalidRequest,
                req_id.0.clone(),
                format!("post_limit must be a non-negative integer, got {limit}"),
            )
        })?,
    };

    tracing::info!(
        request_id = %req_id.0,
        handle = %username,
        sample_size,
        "calculating engagement"
    );

    let stats = calculate(state.source.as_ref(), &username, sample_size)
        .await
        .map_err(|e| ApiError::from_calculate(req_id.0.clone(), &e))?;

    tracing::info!(
        request_id = %req_id.0,
        handle = %stats.handle,
        processed = stats.processed_posts,
        skipped = stats.skipped_posts,
        "engagement calculated"
    );

    Ok(Json(stats.to_result()))
}
