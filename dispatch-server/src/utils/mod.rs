//! Utilities
//!
//! - [`AppError`] / [`ApiResponse`] - unified error and response types (from `shared::error`)
//! - [`logger`] - tracing setup
//! - [`validation`] - request validation helpers

pub mod logger;
pub mod validation;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
