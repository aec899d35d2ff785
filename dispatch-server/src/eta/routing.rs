//! Routing / distance collaborator

use async_trait::async_trait;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::job::Coordinates;
use std::time::Duration;
use thiserror::Error;

/// Longest travel time accepted from a routing service (one week)
pub const MAX_ROUTE_DURATION_S: f64 = 7.0 * 24.0 * 3600.0;

/// Road distance and travel time between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Route {
    pub distance_m: f64,
    pub duration_s: f64,
}

impl Route {
    /// Reject negative, non-finite or implausibly long routes
    pub fn checked(self) -> Result<Route, RoutingError> {
        let plausible = self.distance_m.is_finite()
            && self.distance_m >= 0.0
            && self.duration_s.is_finite()
            && (0.0..=MAX_ROUTE_DURATION_S).contains(&self.duration_s);
        if plausible {
            Ok(self)
        } else {
            Err(RoutingError::Implausible {
                distance_m: self.distance_m,
                duration_s: self.duration_s,
            })
        }
    }

    /// Travel time in whole milliseconds
    pub fn travel_ms(&self) -> i64 {
        (self.duration_s.clamp(0.0, MAX_ROUTE_DURATION_S) * 1000.0).round() as i64
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoutingError {
    #[error("Routing service unavailable: {0}")]
    Unavailable(String),

    #[error("Routing request timed out after {0} ms")]
    Timeout(u64),

    #[error("No route between origin and destination")]
    NoRoute,

    #[error("Implausible route: {distance_m} m in {duration_s} s")]
    Implausible { distance_m: f64, duration_s: f64 },
}

impl From<RoutingError> for AppError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::Timeout(ms) => {
                AppError::new(ErrorCode::RoutingTimeout).with_detail("timeout_ms", ms)
            }
            other => AppError::with_message(ErrorCode::RoutingUnavailable, other.to_string()),
        }
    }
}

#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn route(&self, origin: Coordinates, destination: Coordinates)
    -> Result<Route, RoutingError>;
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
}

/// OSRM-compatible `/route/v1/driving/{lng},{lat};{lng},{lat}` endpoint
pub struct HttpRoutingService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRoutingService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Routing client build failed, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn route_url(&self, origin: Coordinates, destination: Coordinates) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.base_url, origin.lng, origin.lat, destination.lng, destination.lat
        )
    }
}

#[async_trait]
impl RoutingService for HttpRoutingService {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Route, RoutingError> {
        let resp = self
            .client
            .get(self.route_url(origin, destination))
            .query(&[("overview", "false")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RoutingError::Timeout(0)
                } else {
                    RoutingError::Unavailable(e.to_string())
                }
            })?;
        if !resp.status().is_success() {
            return Err(RoutingError::Unavailable(format!(
                "Routing service returned {}",
                resp.status()
            )));
        }

        let body: OsrmResponse = resp
            .json()
            .await
            .map_err(|e| RoutingError::Unavailable(format!("Invalid routing response: {}", e)))?;
        if body.code != "Ok" {
            return Err(RoutingError::NoRoute);
        }
        body.routes
            .first()
            .map(|route| Route {
                distance_m: route.distance,
                duration_s: route.duration,
            })
            .ok_or(RoutingError::NoRoute)?
            .checked()
    }
}

/// Used when no routing service is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRouting;

#[async_trait]
impl RoutingService for DisabledRouting {
    async fn route(
        &self,
        _origin: Coordinates,
        _destination: Coordinates,
    ) -> Result<Route, RoutingError> {
        Err(RoutingError::Unavailable(
            "Routing service not configured".to_string(),
        ))
    }
}
