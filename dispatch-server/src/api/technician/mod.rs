//! Technician API
//!
//! | Path | Method | Role |
//! |------|--------|------|
//! | /api/technician/status | GET, PUT | technician |
//! | /api/technician/location | PUT | technician |
//! | /api/technician/jobs/offered | GET | technician |
//! | /api/technician/jobs/assigned | GET | technician |

mod handler;

pub use handler::{AvailabilityRequest, LocationUpdateRequest, LocationUpdateResponse};

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::middleware::TECHNICIAN;
use crate::auth::require_role;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/technician", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/status",
            get(handler::get_status).put(handler::update_status),
        )
        .route("/location", put(handler::update_location))
        .route("/jobs/offered", get(handler::offered_jobs))
        .route("/jobs/assigned", get(handler::assigned_jobs))
        .layer(middleware::from_fn(require_role(TECHNICIAN)))
}
