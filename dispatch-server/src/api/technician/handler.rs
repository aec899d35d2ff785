//! Technician handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::job::{Availability, TechnicianAvailability, TechnicianPosition, TrackingSnapshot};
use shared::util::now_millis;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::geo::PositionUpdate;
use crate::utils::validation::validate_payload;
use crate::utils::{ApiResponse, AppResult, ErrorCode};

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub status: Availability,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LocationUpdateRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    /// Device capture time; the server clock when absent
    pub captured_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationUpdateResponse {
    /// False when an equal or newer fix was already stored
    pub applied: bool,
    /// Jobs whose last position changed
    pub jobs_updated: Vec<i64>,
}

/// GET /api/technician/status - the caller's duty status
pub async fn get_status(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<TechnicianAvailability>>> {
    let record = state.jobs.get_availability(&user.id)?;
    Ok(Json(ApiResponse::success(record)))
}

/// PUT /api/technician/status - go on or off duty
///
/// Off duty hides offers and blocks claims; bound jobs continue.
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<AvailabilityRequest>,
) -> AppResult<Json<ApiResponse<TechnicianAvailability>>> {
    let record = state.jobs.set_availability(&user.to_actor(), payload.status)?;
    Ok(Json(ApiResponse::success(record)))
}

/// PUT /api/technician/location - report the device position
///
/// Out-of-order fixes are acknowledged but not applied.
pub async fn update_location(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<LocationUpdateRequest>,
) -> AppResult<Json<ApiResponse<LocationUpdateResponse>>> {
    validate_payload(&payload)?;
    let now = now_millis();
    let position = TechnicianPosition {
        lat: payload.lat,
        lng: payload.lng,
        captured_at: payload.captured_at.unwrap_or(now),
    };

    let position = match state.positions.update(&user.id, position, now)? {
        PositionUpdate::Applied(position) => position,
        PositionUpdate::Stale { .. } => {
            return Ok(Json(ApiResponse::success(LocationUpdateResponse {
                applied: false,
                jobs_updated: vec![],
            })));
        }
    };

    let jobs_updated = state.jobs.record_position(&user.id, position)?;
    for &job_id in &jobs_updated {
        if let Err(e) = state.feed.refresh_eta(job_id, now).await {
            tracing::warn!(job_id, error = %e, "ETA refresh after position update failed");
        }
    }

    Ok(Json(ApiResponse::success(LocationUpdateResponse {
        applied: true,
        jobs_updated,
    })))
}

/// GET /api/technician/jobs/offered - open offers, teaser fields only
pub async fn offered_jobs(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<TrackingSnapshot>>>> {
    let actor = user.to_actor();
    let now = now_millis();
    let mut offers = Vec::new();
    for job in state.jobs.get_offered_jobs(&user.id)? {
        match state.feed.job_snapshot(job.id, &actor, now).await {
            Ok(snapshot) => offers.push(snapshot),
            // claimed by someone else since the listing
            Err(e) if e.code == ErrorCode::PermissionDenied => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Json(ApiResponse::success(offers)))
}

/// GET /api/technician/jobs/assigned - the caller's live jobs
pub async fn assigned_jobs(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<TrackingSnapshot>>>> {
    let actor = user.to_actor();
    let now = now_millis();
    let mut jobs = Vec::new();
    for job in state.jobs.get_assigned_jobs(&user.id)? {
        jobs.push(state.feed.job_snapshot(job.id, &actor, now).await?);
    }
    Ok(Json(ApiResponse::success(jobs)))
}
