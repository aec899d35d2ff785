//! Customer ticket handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::job::{CustomerContact, DeviceDescriptor, Ticket};
use validator::Validate;

use crate::api::convert::{CoordinatesInput, resolve_service_address};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::jobs::NewTicket;
use crate::utils::validation::{validate_payload, validate_preferred_date};
use crate::utils::{ApiResponse, AppResult};

#[derive(Debug, Deserialize, Validate)]
pub struct ContactInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub phone: String,
    #[validate(email, length(max = 254))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeviceInput {
    #[validate(length(min = 1, max = 100))]
    pub device_type: String,
    #[validate(length(min = 1, max = 200))]
    pub brand: String,
    #[validate(length(max = 200))]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(nested)]
    pub contact: ContactInput,
    #[validate(nested)]
    pub device: DeviceInput,
    #[validate(length(min = 1, max = 2000))]
    pub issue: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(nested)]
    pub coordinates: Option<CoordinatesInput>,
    pub preferred_date: Option<String>,
    #[validate(length(max = 50))]
    pub preferred_time: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CorrectAddressRequest {
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(nested)]
    pub coordinates: Option<CoordinatesInput>,
}

/// POST /api/customer/tickets - submit a service request
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateTicketRequest>,
) -> AppResult<Json<ApiResponse<Ticket>>> {
    validate_payload(&payload)?;
    validate_preferred_date(&payload.preferred_date)?;

    let service =
        resolve_service_address(&state, payload.address, payload.coordinates).await?;

    let draft = NewTicket {
        contact: CustomerContact {
            name: payload.contact.name,
            phone: payload.contact.phone,
            email: payload.contact.email,
        },
        device: DeviceDescriptor {
            device_type: payload.device.device_type,
            brand: payload.device.brand,
            model: payload.device.model,
        },
        issue: payload.issue,
        address: service.address,
        address_resolved: service.resolved,
        coordinates: service.coordinates,
        preferred_date: payload.preferred_date,
        preferred_time: payload.preferred_time,
    };

    let ticket = state.jobs.create_ticket(&user.to_actor(), draft)?;
    Ok(Json(ApiResponse::success(ticket)))
}

/// GET /api/customer/tickets - the caller's tickets, newest first
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Ticket>>>> {
    let tickets = state.jobs.list_customer_tickets(&user.id)?;
    Ok(Json(ApiResponse::success(tickets)))
}

/// PUT /api/customer/tickets/{id}/address - correct the service address
pub async fn correct_address(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<CorrectAddressRequest>,
) -> AppResult<Json<ApiResponse<Ticket>>> {
    apply_address_correction(&state, &user, id, payload).await
}

/// Shared with the operator route
pub(crate) async fn apply_address_correction(
    state: &ServerState,
    user: &CurrentUser,
    ticket_id: i64,
    payload: CorrectAddressRequest,
) -> AppResult<Json<ApiResponse<Ticket>>> {
    validate_payload(&payload)?;
    let service = resolve_service_address(state, payload.address, payload.coordinates).await?;
    let ticket = state.jobs.correct_address(
        &user.to_actor(),
        ticket_id,
        service.address,
        service.resolved,
        service.coordinates,
    )?;
    Ok(Json(ApiResponse::success(ticket)))
}
