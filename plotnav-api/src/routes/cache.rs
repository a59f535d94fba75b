//! Cache REST API Routes
//!
//! Axum handlers for the summary cache: submit a build, poll its job,
//! fetch a cached summary, and trigger a reconciliation sweep.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use plotnav_core::{JobId, JobStatus, Summary};
use plotnav_storage::{decode_summary, CacheKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    reconcile::{sweep, SweepReport},
    state::AppState,
};

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SubmitCacheRequest {
    pub repository: String,
    pub collection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SubmitCacheResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub job_id: JobId,
}

/// Polling response: `result` stays empty until the job is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct JobStatusResponse {
    pub status: JobStatus,
    pub result: String,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct FetchSummaryParams {
    pub repository: String,
    pub collection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReconcileRequest {
    pub repository: String,
    #[serde(default)]
    pub dry_run: bool,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// PUT /api/v1/cache - Submit a summary build
#[utoipa::path(
    put,
    path = "/api/v1/cache",
    tag = "Cache",
    request_body = SubmitCacheRequest,
    responses(
        (status = 202, description = "Build queued or coalesced onto an in-flight job", body = SubmitCacheResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Repository not registered", body = ApiError),
        (status = 503, description = "Build queue unavailable", body = ApiError),
    )
)]
pub async fn submit_build(
    State(state): State<AppState>,
    Json(req): Json<SubmitCacheRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.repository.trim().is_empty() {
        return Err(ApiError::missing_field("repository"));
    }
    if req.collection.trim().is_empty() {
        return Err(ApiError::missing_field("collection"));
    }
    if !state.pool.is_registered(&req.repository) {
        return Err(ApiError::repository_not_registered(&req.repository));
    }

    let job_id = state.jobs.submit(req.repository, req.collection)?;
    Ok((StatusCode::ACCEPTED, Json(SubmitCacheResponse { job_id })))
}

/// GET /api/v1/cache/jobs/{id} - Poll a build job
#[utoipa::path(
    get,
    path = "/api/v1/cache/jobs/{id}",
    tag = "Cache",
    params(
        ("id" = Uuid, Path, description = "Job id returned by submit")
    ),
    responses(
        (status = 200, description = "Current job state", body = JobStatusResponse),
        (status = 404, description = "Unknown job id", body = ApiError),
    )
)]
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state.jobs.status(id)?;
    Ok(Json(JobStatusResponse {
        status: job.status,
        result: job.result.unwrap_or_default(),
    }))
}

/// GET /api/v1/cache/summary - Fetch a cached summary
#[utoipa::path(
    get,
    path = "/api/v1/cache/summary",
    tag = "Cache",
    params(FetchSummaryParams),
    responses(
        (status = 200, description = "Decompressed summary document", body = Summary),
        (status = 404, description = "No cached summary for this collection", body = ApiError),
        (status = 503, description = "Object store unavailable", body = ApiError),
    )
)]
pub async fn fetch_summary(
    State(state): State<AppState>,
    Query(params): Query<FetchSummaryParams>,
) -> ApiResult<Json<Summary>> {
    if !state.pool.is_registered(&params.repository) {
        return Err(ApiError::repository_not_registered(&params.repository));
    }

    let key = CacheKey::new(params.repository.clone(), params.collection.clone());
    let payload = state
        .store
        .get(&key.encode())
        .await?
        .ok_or_else(|| ApiError::summary_not_found(&params.repository, &params.collection))?;

    let summary = decode_summary(&payload).map_err(|e| {
        tracing::error!(key = %key, error = %e, "Cached summary payload is corrupt");
        ApiError::from(e)
    })?;
    Ok(Json(summary))
}

/// POST /api/v1/cache/reconcile - Run a reconciliation sweep
#[utoipa::path(
    post,
    path = "/api/v1/cache/reconcile",
    tag = "Cache",
    request_body = ReconcileRequest,
    responses(
        (status = 200, description = "Sweep report", body = SweepReport),
        (status = 404, description = "Repository not registered", body = ApiError),
        (status = 503, description = "Store or registry unavailable, sweep aborted", body = ApiError),
    )
)]
pub async fn reconcile(
    State(state): State<AppState>,
    Json(req): Json<ReconcileRequest>,
) -> ApiResult<Json<SweepReport>> {
    if !state.pool.is_registered(&req.repository) {
        return Err(ApiError::repository_not_registered(&req.repository));
    }

    let registry = state.pool.get(&req.repository)?;
    let report = sweep(
        state.store.as_ref(),
        registry.as_ref(),
        &req.repository,
        req.dry_run,
    )
    .await?;
    Ok(Json(report))
}

/// Build the cache route tree.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/cache", put(submit_build))
        .route("/api/v1/cache/jobs/:id", get(job_status))
        .route("/api/v1/cache/summary", get(fetch_summary))
        .route("/api/v1/cache/reconcile", post(reconcile))
}
