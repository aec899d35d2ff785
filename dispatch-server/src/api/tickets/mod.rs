//! Customer ticket API
//!
//! | Path | Method | Role |
//! |------|--------|------|
//! | /api/customer/tickets | POST | customer |
//! | /api/customer/tickets | GET | customer |
//! | /api/customer/tickets/{id}/address | PUT | customer |

mod handler;

pub use handler::{CorrectAddressRequest, CreateTicketRequest};
pub(crate) use handler::apply_address_correction;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::middleware::CUSTOMER;
use crate::auth::require_role;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/customer/tickets", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}/address", put(handler::correct_address))
        .layer(middleware::from_fn(require_role(CUSTOMER)))
}
