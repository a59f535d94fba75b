//! REST API Routes Module
//!
//! Route handlers for the summary cache service:
//! - submit / poll / fetch on the cache surface
//! - the operator-facing reconciliation sweep
//! - health check and OpenAPI document

pub mod cache;
pub mod health;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

// Re-export route creation functions for convenience
pub use cache::create_router as cache_router;
pub use health::create_router as health_router;

/// Handler for the /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

/// Assemble the full application router.
pub fn create_api_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(cache::create_router())
        .merge(health::create_router());

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", axum::routing::get(openapi_json));

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
