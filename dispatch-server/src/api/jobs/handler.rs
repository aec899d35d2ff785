//! Job workflow handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::job::{ChecklistItem, EtaView, Job, JobStatus};
use shared::util::now_millis;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::validation::{MAX_NOTE_LEN, validate_payload, validate_required_text};
use crate::utils::{ApiResponse, AppError, AppResult};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusUpdateRequest {
    pub status: JobStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HoldRequest {
    pub reason: String,
}

/// Minutes from now; range checked by the estimator
#[derive(Debug, Deserialize)]
pub struct ManualEtaRequest {
    pub eta_minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct WaiveRequest {
    pub reason: String,
}

/// Result of a job mutation
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdateResponse {
    pub job_id: i64,
    pub ticket_id: i64,
    pub status: JobStatus,
    pub status_label: String,
    pub updated_at: i64,
}

impl JobUpdateResponse {
    fn new(job: &Job, user: &CurrentUser) -> Self {
        Self {
            job_id: job.id,
            ticket_id: job.ticket_id,
            status: job.status,
            status_label: job.status.label(user.role).to_string(),
            updated_at: job.updated_at,
        }
    }
}

type JobResponse = AppResult<Json<ApiResponse<JobUpdateResponse>>>;

fn respond(job: &Job, user: &CurrentUser) -> JobResponse {
    Ok(Json(ApiResponse::success(JobUpdateResponse::new(job, user))))
}

/// POST /api/jobs/{id}/accept - claim an offer (first accept wins)
pub async fn accept(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> JobResponse {
    let job = state.jobs.claim(id, &user.to_actor())?;
    let job = state.seed_position(job)?;
    respond(&job, &user)
}

/// POST /api/jobs/{id}/reject - decline (candidate) or reject (operator) an offer
pub async fn reject(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    payload: Option<Json<RejectRequest>>,
) -> JobResponse {
    let Json(payload) = payload.unwrap_or_default();
    validate_payload(&payload)?;
    let job = state.jobs.reject(id, &user.to_actor(), payload.reason)?;
    respond(&job, &user)
}

/// PUT /api/jobs/{id}/status - move the job along the transition graph
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<StatusUpdateRequest>,
) -> JobResponse {
    validate_payload(&payload)?;
    let job = state
        .jobs
        .transition(id, payload.status, &user.to_actor(), payload.note)?;
    let job = state.seed_position(job)?;
    respond(&job, &user)
}

/// POST /api/jobs/{id}/on-hold - suspend with a reason
pub async fn hold(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<HoldRequest>,
) -> JobResponse {
    validate_required_text(&payload.reason, "reason", MAX_NOTE_LEN)?;
    let job = state.jobs.transition(
        id,
        JobStatus::OnHold,
        &user.to_actor(),
        Some(payload.reason.trim().to_string()),
    )?;
    respond(&job, &user)
}

/// PUT /api/jobs/{id}/eta - technician-entered arrival estimate
pub async fn set_manual_eta(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ManualEtaRequest>,
) -> AppResult<Json<ApiResponse<EtaView>>> {
    let now = now_millis();
    let job = state.jobs.get_job(id)?;
    let record = state
        .eta
        .set_manual(&job, &user.to_actor(), payload.eta_minutes, now)
        .await?;
    Ok(Json(ApiResponse::success(state.eta.view(&record, now))))
}

/// GET /api/jobs/{id}/checklist
pub async fn checklist(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<ChecklistItem>>>> {
    let job = state.jobs.get_job(id)?;
    if !user.is_operator() && !job.is_assigned_to(&user.id) {
        return Err(AppError::permission_denied(format!(
            "Job {} is not assigned to you",
            id
        )));
    }
    Ok(Json(ApiResponse::success(job.checklist)))
}

/// POST /api/jobs/{id}/checklist/{item_id}/complete - idempotent
pub async fn complete_checklist_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path((id, item_id)): Path<(i64, u32)>,
) -> AppResult<Json<ApiResponse<Vec<ChecklistItem>>>> {
    let job = state
        .jobs
        .complete_checklist_item(id, item_id, &user.to_actor())?;
    Ok(Json(ApiResponse::success(job.checklist)))
}

/// POST /api/jobs/{id}/checklist/{item_id}/waive - operator only, idempotent
pub async fn waive_checklist_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path((id, item_id)): Path<(i64, u32)>,
    Json(payload): Json<WaiveRequest>,
) -> AppResult<Json<ApiResponse<Vec<ChecklistItem>>>> {
    validate_required_text(&payload.reason, "reason", MAX_NOTE_LEN)?;
    let job = state.jobs.waive_checklist_item(
        id,
        item_id,
        payload.reason.trim().to_string(),
        &user.to_actor(),
    )?;
    Ok(Json(ApiResponse::success(job.checklist)))
}
