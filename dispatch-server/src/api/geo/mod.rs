//! Geocoding API
//!
//! | Path | Method | Role |
//! |------|--------|------|
//! | /api/geo/resolve?lat=&lng= | GET | any |

use axum::{
    Json, Router,
    extract::{Query, State},
    middleware,
    routing::get,
};
use shared::job::Coordinates;

use crate::api::convert::CoordinatesInput;
use crate::auth::middleware::ANY_ROLE;
use crate::auth::require_role;
use crate::core::ServerState;
use crate::geo::ResolvedAddress;
use crate::utils::validation::validate_payload;
use crate::utils::{ApiResponse, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new().nest(
        "/api/geo",
        Router::new()
            .route("/resolve", get(resolve))
            .layer(middleware::from_fn(require_role(ANY_ROLE))),
    )
}

/// GET /api/geo/resolve - reverse geocode, falling back to `"lat, lng"`
pub async fn resolve(
    State(state): State<ServerState>,
    Query(query): Query<CoordinatesInput>,
) -> AppResult<Json<ApiResponse<ResolvedAddress>>> {
    validate_payload(&query)?;
    let resolved = state.resolver.resolve(Coordinates::from(query)).await;
    Ok(Json(ApiResponse::success(resolved)))
}
