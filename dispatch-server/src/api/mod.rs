//! HTTP API
//!
//! # Structure
//!
//! - [`health`] - liveness and component checks (public)
//! - [`tickets`] - customer ticket submission, address correction
//! - [`technician`] - position updates, offered / assigned job lists
//! - [`jobs`] - claim, decline, status, ETA, checklist, hold
//! - [`tracking`] - tracking snapshots by ticket or job
//! - [`admin`] - triage, offers, assignment, full timelines
//! - [`geo`] - reverse geocoding
//!
//! Every `/api/` route requires a bearer token; responses use the
//! [`ApiResponse`](crate::utils::ApiResponse) envelope.

pub mod admin;
pub mod convert;
pub mod geo;
pub mod health;
pub mod jobs;
pub mod technician;
pub mod tickets;
pub mod tracking;

use axum::Router;

use crate::core::ServerState;

pub use crate::utils::{ApiResponse, AppResult};

/// All routes, unauthenticated; `build_router` adds the auth layer
pub fn router() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(tickets::router())
        .merge(technician::router())
        .merge(jobs::router())
        .merge(tracking::router())
        .merge(admin::router())
        .merge(geo::router())
}
