//! Request fragments shared by several handlers

use serde::Deserialize;
use shared::job::Coordinates;
use validator::Validate;

use crate::core::ServerState;
use crate::geo::ReportedFix;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct CoordinatesInput {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

impl From<CoordinatesInput> for Coordinates {
    fn from(input: CoordinatesInput) -> Self {
        Coordinates::new(input.lat, input.lng)
    }
}

/// Address as stored on the ticket, with its resolution flag
pub struct ServiceAddress {
    pub address: String,
    pub resolved: bool,
    pub coordinates: Option<Coordinates>,
}

/// Use the typed address when given, else reverse geocode the device fix
///
/// Geocoding failure is absorbed: the address becomes `"lat, lng"` and
/// `resolved` is false.
pub async fn resolve_service_address(
    state: &ServerState,
    address: Option<String>,
    coordinates: Option<CoordinatesInput>,
) -> AppResult<ServiceAddress> {
    let coordinates = coordinates.map(Coordinates::from);
    let typed = address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    match (typed, coordinates) {
        (Some(address), coordinates) => Ok(ServiceAddress {
            address,
            resolved: true,
            coordinates,
        }),
        (None, Some(coordinates)) => {
            let fix = ReportedFix {
                lat: coordinates.lat,
                lng: coordinates.lng,
            };
            let resolved = state.resolver.locate(&fix).await?;
            Ok(ServiceAddress {
                address: resolved.address,
                resolved: resolved.resolved,
                coordinates: Some(resolved.coordinates),
            })
        }
        (None, None) => Err(AppError::validation(
            "Either address or coordinates is required",
        )),
    }
}
