//! Shared types for the dispatch engine
//!
//! Wire and domain types used by the server and by any client that renders
//! tracking data: job statuses and their transition graph, ticket/job models,
//! timeline and domain events, the tracking snapshot contract and the unified
//! error system.

pub mod error;
pub mod job;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use job::{JobStatus, Role, TicketStatus};
