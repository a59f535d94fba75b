//! OpenAPI document for the plotnav API.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "plotnav API",
        description = "Collection-summary cache for pipeline-run plot artifacts: \
                       asynchronous builds, cached summary reads, and reconciliation."
    ),
    paths(
        crate::routes::cache::submit_build,
        crate::routes::cache::job_status,
        crate::routes::cache::fetch_summary,
        crate::routes::cache::reconcile,
        crate::routes::health::ping,
    ),
    components(schemas(
        crate::routes::cache::SubmitCacheRequest,
        crate::routes::cache::SubmitCacheResponse,
        crate::routes::cache::JobStatusResponse,
        crate::routes::cache::ReconcileRequest,
        crate::routes::health::PingResponse,
        crate::error::ApiError,
        crate::error::ErrorCode,
        crate::reconcile::SweepReport,
        crate::reconcile::SweepRecord,
        plotnav_core::JobStatus,
        plotnav_core::Summary,
        plotnav_core::DatasetRefSummary,
    )),
    tags(
        (name = "Cache", description = "Summary cache build, poll, fetch, and reconcile"),
        (name = "Health", description = "Liveness endpoints"),
    )
)]
pub struct ApiDoc;
