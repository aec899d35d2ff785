//! Tracking snapshot API
//!
//! | Path | Method | Role |
//! |------|--------|------|
//! | /api/tracking/tickets/{id} | GET | any |
//! | /api/tracking/jobs/{id} | GET | any |
//!
//! Visibility is decided per viewer by the disclosure policy; callers with
//! no standing on the ticket get `PermissionDenied`.

use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    routing::get,
};
use shared::job::TrackingSnapshot;
use shared::util::now_millis;

use crate::auth::middleware::ANY_ROLE;
use crate::auth::{CurrentUser, require_role};
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new().nest(
        "/api/tracking",
        Router::new()
            .route("/tickets/{id}", get(ticket_snapshot))
            .route("/jobs/{id}", get(job_snapshot))
            .layer(middleware::from_fn(require_role(ANY_ROLE))),
    )
}

/// GET /api/tracking/tickets/{id}
pub async fn ticket_snapshot(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<TrackingSnapshot>>> {
    let snapshot = state
        .feed
        .ticket_snapshot(id, &user.to_actor(), now_millis())
        .await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

/// GET /api/tracking/jobs/{id}
pub async fn job_snapshot(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<TrackingSnapshot>>> {
    let snapshot = state
        .feed
        .job_snapshot(id, &user.to_actor(), now_millis())
        .await?;
    Ok(Json(ApiResponse::success(snapshot)))
}
