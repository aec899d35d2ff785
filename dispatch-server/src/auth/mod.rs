//! Authentication
//!
//! - [`JwtService`] - bearer token validation
//! - [`CurrentUser`] - caller identity extracted on every protected handler
//! - [`require_auth`] / [`require_role`] - router middleware

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{require_auth, require_role};
