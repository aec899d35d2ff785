//! Job workflow API
//!
//! | Path | Method | Role |
//! |------|--------|------|
//! | /api/jobs/{id}/accept | POST | technician |
//! | /api/jobs/{id}/reject | POST | technician, operator |
//! | /api/jobs/{id}/status | PUT | technician, operator |
//! | /api/jobs/{id}/on-hold | POST | technician, operator |
//! | /api/jobs/{id}/eta | PUT | technician, operator |
//! | /api/jobs/{id}/checklist | GET | technician, operator |
//! | /api/jobs/{id}/checklist/{item_id}/complete | POST | technician |
//! | /api/jobs/{id}/checklist/{item_id}/waive | POST | operator |
//!
//! Capability checks beyond the role gate happen in the jobs manager.

mod handler;

pub use handler::{
    HoldRequest, JobUpdateResponse, ManualEtaRequest, RejectRequest, StatusUpdateRequest,
    WaiveRequest,
};

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::middleware::FIELD_STAFF;
use crate::auth::require_role;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/jobs", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/{id}/accept", post(handler::accept))
        .route("/{id}/reject", post(handler::reject))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/on-hold", post(handler::hold))
        .route("/{id}/eta", put(handler::set_manual_eta))
        .route("/{id}/checklist", get(handler::checklist))
        .route(
            "/{id}/checklist/{item_id}/complete",
            post(handler::complete_checklist_item),
        )
        .route(
            "/{id}/checklist/{item_id}/waive",
            post(handler::waive_checklist_item),
        )
        .layer(middleware::from_fn(require_role(FIELD_STAFF)))
}
