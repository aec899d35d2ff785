//! Operator handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::job::{Job, TechnicianRef, Ticket, TimelineEvent};
use validator::Validate;

use crate::api::tickets::{CorrectAddressRequest, apply_address_correction};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::jobs::NewOffer;
use crate::tracking::{MapEntry, technician_map};
use crate::utils::validation::validate_payload;
use crate::utils::{ApiResponse, AppError, AppResult};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct OfferRequest {
    /// Technician ids; empty offers the job to every technician
    #[serde(default)]
    #[validate(length(max = 50))]
    pub candidates: Vec<String>,
    /// Checklist step names; the configured default when absent
    pub checklist: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignRequest {
    #[validate(length(min = 1, max = 100))]
    pub technician_id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 100))]
    pub phone: Option<String>,
}

/// Job with its full timeline (declines and checklist events included)
#[derive(Debug, Serialize, Deserialize)]
pub struct JobDetail {
    pub job: Job,
    pub timeline: Vec<TimelineEvent>,
}

/// GET /api/admin/triage - tickets without a live job, oldest first
pub async fn triage(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<Ticket>>>> {
    let tickets = state.jobs.list_triage()?;
    Ok(Json(ApiResponse::success(tickets)))
}

/// POST /api/admin/tickets/{id}/offer - dispatch a ticket as an offer
pub async fn offer(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    payload: Option<Json<OfferRequest>>,
) -> AppResult<Json<ApiResponse<Job>>> {
    let Json(payload) = payload.unwrap_or_default();
    validate_payload(&payload)?;
    if payload.candidates.iter().any(|c| c.trim().is_empty()) {
        return Err(AppError::validation("Candidate ids must not be empty"));
    }

    let job = state.jobs.offer_job(
        &user.to_actor(),
        id,
        NewOffer {
            candidates: payload.candidates,
            checklist: payload.checklist,
        },
    )?;
    Ok(Json(ApiResponse::success(job)))
}

/// PUT /api/admin/tickets/{id}/address
pub async fn correct_address(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CorrectAddressRequest>,
) -> AppResult<Json<ApiResponse<Ticket>>> {
    apply_address_correction(&state, &user, id, payload).await
}

/// GET /api/admin/jobs/{id}
pub async fn job_detail(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<JobDetail>>> {
    let (job, timeline) = state.jobs.get_job_with_timeline(id)?;
    Ok(Json(ApiResponse::success(JobDetail { job, timeline })))
}

/// POST /api/admin/jobs/{id}/assign - bind an offer to a named technician
pub async fn assign(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<AssignRequest>,
) -> AppResult<Json<ApiResponse<Job>>> {
    validate_payload(&payload)?;
    let technician = TechnicianRef {
        id: payload.technician_id,
        name: payload.name,
        phone: payload.phone,
    };
    let job = state.jobs.assign(id, technician, &user.to_actor())?;
    let job = state.seed_position(job)?;
    Ok(Json(ApiResponse::success(job)))
}

/// GET /api/admin/map - latest position of every tracked technician
pub async fn map(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<MapEntry>>>> {
    let entries = technician_map(&state.jobs, &state.positions)?;
    Ok(Json(ApiResponse::success(entries)))
}
