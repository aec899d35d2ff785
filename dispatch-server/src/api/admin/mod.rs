//! Operator API
//!
//! | Path | Method |
//! |------|--------|
//! | /api/admin/triage | GET |
//! | /api/admin/tickets/{id}/offer | POST |
//! | /api/admin/tickets/{id}/address | PUT |
//! | /api/admin/jobs/{id} | GET |
//! | /api/admin/jobs/{id}/assign | POST |
//! | /api/admin/map | GET |
//!
//! Status changes, rejection, waivers and manual ETAs go through `/api/jobs`.

mod handler;

pub use handler::{AssignRequest, JobDetail, OfferRequest};

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::middleware::OPERATOR;
use crate::auth::require_role;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/admin", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/triage", get(handler::triage))
        .route("/tickets/{id}/offer", post(handler::offer))
        .route("/tickets/{id}/address", put(handler::correct_address))
        .route("/jobs/{id}", get(handler::job_detail))
        .route("/jobs/{id}/assign", post(handler::assign))
        .route("/map", get(handler::map))
        .layer(middleware::from_fn(require_role(OPERATOR)))
}
