//! Arrival estimates for travelling technicians
//!
//! - **estimator**: recompute policy, manual fallback, rendering
//! - **routing**: distance / duration collaborator (HTTP or disabled)

pub mod estimator;
pub mod routing;

pub use estimator::{EtaError, EtaEstimator, EtaReading, MANUAL_ETA_MINUTES, arrival_window};
pub use routing::{DisabledRouting, HttpRoutingService, Route, RoutingError, RoutingService};
