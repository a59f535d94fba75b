//! Health Check Endpoints
//!
//! No authentication, no dependencies: `/health/ping` answers as long as
//! the process is serving requests.

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PingResponse {
    pub status: String,
}

/// GET /health/ping - Liveness check
#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = PingResponse),
    )
)]
pub async fn ping() -> impl IntoResponse {
    Json(PingResponse {
        status: "ok".to_string(),
    })
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/health/ping", get(ping))
}
