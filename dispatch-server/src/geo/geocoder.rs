//! Reverse geocoding collaborator

use super::GeoError;
use async_trait::async_trait;
use serde::Deserialize;
use shared::job::Coordinates;
use std::time::Duration;

/// Resolve a coordinate pair to a postal address
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, coordinates: Coordinates) -> Result<String, GeoError>;
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

/// Geocoding API over HTTP (`?latlng=lat,lng&key=...` → `results[0].formatted_address`)
pub struct HttpGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGeocoder {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Geocoder client build failed, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn reverse(&self, coordinates: Coordinates) -> Result<String, GeoError> {
        let latlng = format!("{},{}", coordinates.lat, coordinates.lng);
        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("latlng", latlng.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| GeoError::ResolutionFailed(format!("Geocoder request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(GeoError::ResolutionFailed(format!(
                "Geocoder returned {}",
                resp.status()
            )));
        }

        let body: GeocodeResponse = resp
            .json()
            .await
            .map_err(|e| GeoError::ResolutionFailed(format!("Invalid geocoder response: {}", e)))?;

        body.results
            .into_iter()
            .map(|result| result.formatted_address)
            .find(|address| !address.trim().is_empty())
            .ok_or_else(|| {
                GeoError::ResolutionFailed(format!(
                    "No address found (status {})",
                    body.status.as_deref().unwrap_or("unknown")
                ))
            })
    }
}

/// Used when no geocoder is configured; every lookup fails over to coordinates
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn reverse(&self, _coordinates: Coordinates) -> Result<String, GeoError> {
        Err(GeoError::ResolutionFailed(
            "Geocoder not configured".to_string(),
        ))
    }
}
