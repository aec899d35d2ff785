//! Geolocation resolver
//!
//! Acquisition produces a coordinate pair from a [`PositionSource`] within
//! the acquisition timeout. Resolution turns coordinates into an address and
//! never fails: on any geocoder error the coordinates themselves become the
//! address.

use super::GeoError;
use super::geocoder::Geocoder;
use async_trait::async_trait;
use serde::Serialize;
use shared::job::Coordinates;
use std::sync::Arc;
use std::time::Duration;

/// Something that can produce the device's current coordinates
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn acquire(&self) -> Result<Coordinates, GeoError>;
}

/// A fix already taken on the device and reported over the API
#[derive(Debug, Clone, Copy)]
pub struct ReportedFix {
    pub lat: f64,
    pub lng: f64,
}

#[async_trait]
impl PositionSource for ReportedFix {
    async fn acquire(&self) -> Result<Coordinates, GeoError> {
        let coordinates = Coordinates::new(self.lat, self.lng);
        if !coordinates.is_valid() {
            return Err(GeoError::OutOfRange {
                lat: self.lat,
                lng: self.lng,
            });
        }
        Ok(coordinates)
    }
}

/// Address for a coordinate pair
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAddress {
    pub address: String,
    pub coordinates: Coordinates,
    /// False when `address` is the coordinate fallback
    pub resolved: bool,
}

pub struct GeolocationResolver {
    geocoder: Arc<dyn Geocoder>,
    acquisition_timeout: Duration,
    resolution_timeout: Duration,
}

impl std::fmt::Debug for GeolocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeolocationResolver")
            .field("geocoder", &"<dyn Geocoder>")
            .field("acquisition_timeout", &self.acquisition_timeout)
            .field("resolution_timeout", &self.resolution_timeout)
            .finish()
    }
}

impl GeolocationResolver {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        acquisition_timeout: Duration,
        resolution_timeout: Duration,
    ) -> Self {
        Self {
            geocoder,
            acquisition_timeout,
            resolution_timeout,
        }
    }

    /// Acquire coordinates, bounded by the acquisition timeout
    pub async fn acquire(&self, source: &dyn PositionSource) -> Result<Coordinates, GeoError> {
        match tokio::time::timeout(self.acquisition_timeout, source.acquire()).await {
            Ok(result) => result,
            Err(_) => Err(GeoError::Timeout(self.acquisition_timeout.as_millis() as u64)),
        }
    }

    /// Resolve coordinates to an address, falling back to `"lat, lng"`
    pub async fn resolve(&self, coordinates: Coordinates) -> ResolvedAddress {
        let outcome =
            match tokio::time::timeout(self.resolution_timeout, self.geocoder.reverse(coordinates))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(GeoError::ResolutionFailed(format!(
                    "Geocoder timed out after {} ms",
                    self.resolution_timeout.as_millis()
                ))),
            };

        match outcome {
            Ok(address) if !address.trim().is_empty() => ResolvedAddress {
                address,
                coordinates,
                resolved: true,
            },
            Ok(_) => Self::fallback(coordinates, "empty address"),
            Err(e) => Self::fallback(coordinates, &e.to_string()),
        }
    }

    /// Acquire then resolve; only acquisition errors reach the caller
    pub async fn locate(&self, source: &dyn PositionSource) -> Result<ResolvedAddress, GeoError> {
        let coordinates = self.acquire(source).await?;
        Ok(self.resolve(coordinates).await)
    }

    fn fallback(coordinates: Coordinates, reason: &str) -> ResolvedAddress {
        tracing::warn!(
            lat = coordinates.lat,
            lng = coordinates.lng,
            reason,
            "Address resolution failed, using coordinates"
        );
        ResolvedAddress {
            address: coordinates.fallback_address(),
            coordinates,
            resolved: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::DisabledGeocoder;

    struct FixedGeocoder(&'static str);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn reverse(&self, _coordinates: Coordinates) -> Result<String, GeoError> {
            Ok(self.0.to_string())
        }
    }

    struct SlowGeocoder;

    #[async_trait]
    impl Geocoder for SlowGeocoder {
        async fn reverse(&self, _coordinates: Coordinates) -> Result<String, GeoError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    struct DeniedSource;

    #[async_trait]
    impl PositionSource for DeniedSource {
        async fn acquire(&self) -> Result<Coordinates, GeoError> {
            Err(GeoError::Unavailable("User denied geolocation".to_string()))
        }
    }

    struct HangingSource;

    #[async_trait]
    impl PositionSource for HangingSource {
        async fn acquire(&self) -> Result<Coordinates, GeoError> {
            std::future::pending().await
        }
    }

    fn resolver(geocoder: Arc<dyn Geocoder>) -> GeolocationResolver {
        GeolocationResolver::new(geocoder, Duration::from_secs(10), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_resolves_address() {
        let resolver = resolver(Arc::new(FixedGeocoder("12 Mabini St, Quezon City")));
        let resolved = resolver.resolve(Coordinates::new(14.6, 121.0)).await;
        assert!(resolved.resolved);
        assert_eq!(resolved.address, "12 Mabini St, Quezon City");
    }

    #[tokio::test]
    async fn test_resolution_failure_falls_back_to_coordinates() {
        let resolver = resolver(Arc::new(DisabledGeocoder));
        let resolved = resolver.resolve(Coordinates::new(14.5995, 120.9842)).await;
        assert!(!resolved.resolved);
        assert_eq!(resolved.address, "14.599500, 120.984200");
    }

    #[tokio::test]
    async fn test_blank_address_falls_back() {
        let resolver = resolver(Arc::new(FixedGeocoder("  ")));
        let resolved = resolver.resolve(Coordinates::new(1.0, 2.0)).await;
        assert!(!resolved.resolved);
        assert!(!resolved.address.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_geocoder_falls_back() {
        let resolver = resolver(Arc::new(SlowGeocoder));
        let resolved = resolver.resolve(Coordinates::new(1.0, 2.0)).await;
        assert!(!resolved.resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_errors_are_distinct() {
        let resolver = resolver(Arc::new(DisabledGeocoder));

        assert_eq!(
            resolver.locate(&HangingSource).await,
            Err(GeoError::Timeout(10_000))
        );
        assert!(matches!(
            resolver.locate(&DeniedSource).await,
            Err(GeoError::Unavailable(_))
        ));

        // resolution failure is absorbed
        let located = resolver
            .locate(&ReportedFix { lat: 14.6, lng: 121.0 })
            .await
            .unwrap();
        assert!(!located.resolved);
    }

    #[tokio::test]
    async fn test_reported_fix_validates_range() {
        assert!(matches!(
            ReportedFix { lat: 95.0, lng: 0.0 }.acquire().await,
            Err(GeoError::OutOfRange { .. })
        ));
    }
}
