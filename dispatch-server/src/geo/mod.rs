//! Geolocation
//!
//! - **positions**: last known fix per technician (monotonic by `captured_at`)
//! - **resolver**: coordinate acquisition and coordinate → address resolution
//! - **geocoder**: reverse geocoding collaborator (HTTP or disabled)
//!
//! Acquisition failures ([`GeoError::Unavailable`], [`GeoError::Timeout`])
//! are reported to the caller. Resolution failures never are: the resolver
//! falls back to a `"lat, lng"` address and flags it as unresolved.

pub mod geocoder;
pub mod positions;
pub mod resolver;

pub use geocoder::{DisabledGeocoder, Geocoder, HttpGeocoder};
pub use positions::{PositionTracker, PositionUpdate};
pub use resolver::{GeolocationResolver, PositionSource, ReportedFix, ResolvedAddress};

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeoError {
    /// Device could not produce a fix (permission denied, no signal)
    #[error("Geolocation unavailable: {0}")]
    Unavailable(String),

    #[error("Geolocation timed out after {0} ms")]
    Timeout(u64),

    #[error("Address resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("Coordinates out of range: {lat}, {lng}")]
    OutOfRange { lat: f64, lng: f64 },

    #[error("Position captured in the future: {captured_at} > {now}")]
    InFuture { captured_at: i64, now: i64 },
}

impl From<GeoError> for AppError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::Unavailable(reason) => {
                AppError::with_message(ErrorCode::GeolocationUnavailable, reason)
            }
            GeoError::Timeout(ms) => {
                AppError::new(ErrorCode::GeolocationTimeout).with_detail("timeout_ms", ms)
            }
            GeoError::ResolutionFailed(reason) => {
                AppError::with_message(ErrorCode::AddressResolutionFailed, reason)
            }
            GeoError::OutOfRange { lat, lng } => AppError::new(ErrorCode::PositionOutOfRange)
                .with_detail("lat", lat)
                .with_detail("lng", lng),
            GeoError::InFuture { captured_at, now } => AppError::new(ErrorCode::PositionInFuture)
                .with_detail("captured_at", captured_at)
                .with_detail("now", now),
        }
    }
}
