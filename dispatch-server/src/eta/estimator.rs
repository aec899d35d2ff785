//! ETA estimator
//!
//! Estimates are ephemeral: one [`EtaState`] per in-transit job, dropped as
//! soon as the job leaves `en_route` / `component_pickup`.
//!
//! # Recompute policy
//!
//! ```text
//! current(job)
//!     ├─ not in transit                  → forget state, no estimate
//!     ├─ lock per-job state (single flight; concurrent readers wait)
//!     ├─ recompute if: no estimate
//!     │                | age ≥ refresh interval
//!     │                | technician moved > min displacement
//!     │   └─ skipped while backing off after a failed attempt
//!     ├─ routing (bounded by timeout) ─ ok  → computed estimate, EtaUpdated
//!     │                               └ err → attempt counted, backoff
//!     └─ attempts exhausted + grace elapsed + no manual estimate → NeedsManualEta
//! ```

use super::routing::{Route, RoutingError, RoutingService};
use crate::core::config::EtaConfig;
use crate::jobs::Actor;
use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use shared::error::{AppError, ErrorCode};
use shared::job::{
    ArrivalWindow, Coordinates, DomainEvent, EtaRecord, EtaSource, EtaView, Job, JobStatus,
};
use shared::util::haversine_m;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};

const MINUTE_MS: i64 = 60_000;

/// Manual estimates are accepted in this range (minutes)
pub const MANUAL_ETA_MINUTES: std::ops::RangeInclusive<u32> = 1..=600;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EtaError {
    #[error("Job is not travelling ({0})")]
    NotInTransit(JobStatus),

    #[error("Manual ETA must be between 1 and 600 minutes, got {0}")]
    InvalidMinutes(u32),

    #[error("Only the assigned technician or an operator may set the ETA")]
    Unauthorized,
}

impl From<EtaError> for AppError {
    fn from(err: EtaError) -> Self {
        match err {
            EtaError::NotInTransit(status) => {
                AppError::with_message(ErrorCode::InvalidRequest, err.to_string())
                    .with_detail("status", status.as_str())
            }
            EtaError::InvalidMinutes(minutes) => {
                AppError::with_message(ErrorCode::ValueOutOfRange, err.to_string())
                    .with_detail("eta_minutes", minutes)
            }
            EtaError::Unauthorized => AppError::permission_denied(err.to_string()),
        }
    }
}

/// Estimate as seen by one reader
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EtaReading {
    pub record: Option<EtaRecord>,
    pub needs_manual: bool,
}

impl EtaReading {
    /// In transit without a usable estimate ("calculating")
    pub fn is_pending(&self) -> bool {
        self.record.is_none()
    }
}

#[derive(Debug)]
struct EtaState {
    record: Option<EtaRecord>,
    failed_attempts: u32,
    first_failure_at: Option<i64>,
    retry_at: i64,
    manual_signalled: bool,
}

impl EtaState {
    fn new() -> Self {
        Self {
            record: None,
            failed_attempts: 0,
            first_failure_at: None,
            retry_at: 0,
            manual_signalled: false,
        }
    }
}

pub struct EtaEstimator {
    routing: Arc<dyn RoutingService>,
    config: EtaConfig,
    timezone: Tz,
    states: DashMap<i64, Arc<Mutex<EtaState>>>,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl std::fmt::Debug for EtaEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtaEstimator")
            .field("routing", &"<dyn RoutingService>")
            .field("config", &self.config)
            .field("timezone", &self.timezone)
            .field("tracked_jobs", &self.states.len())
            .finish()
    }
}

impl EtaEstimator {
    pub fn new(
        routing: Arc<dyn RoutingService>,
        config: EtaConfig,
        timezone: Tz,
        event_tx: broadcast::Sender<DomainEvent>,
    ) -> Self {
        Self {
            routing,
            config,
            timezone,
            states: DashMap::new(),
            event_tx,
        }
    }

    fn slot(&self, job_id: i64) -> Arc<Mutex<EtaState>> {
        self.states
            .entry(job_id)
            .or_insert_with(|| Arc::new(Mutex::new(EtaState::new())))
            .clone()
    }

    /// Drop all estimator state for a job
    pub fn forget(&self, job_id: i64) {
        if self.states.remove(&job_id).is_some() {
            tracing::debug!(job_id, "ETA state dropped");
        }
    }

    /// Number of jobs with estimator state
    pub fn tracked_jobs(&self) -> usize {
        self.states.len()
    }

    /// Current estimate for `job`, recomputing it when due
    ///
    /// `job` and its `last_position` must come from one consistent read.
    /// `destination` is the ticket's service coordinates.
    pub async fn current(
        &self,
        job: &Job,
        destination: Option<Coordinates>,
        now: i64,
    ) -> EtaReading {
        if !job.status.is_in_transit() {
            self.forget(job.id);
            return EtaReading::default();
        }

        let slot = self.slot(job.id);
        let mut state = slot.lock().await;

        if !state.record.is_some_and(|record| self.is_usable(&record, now)) {
            state.record = None;
        }
        if self.recompute_due(&state, job, now) && now >= state.retry_at {
            self.recompute(job, destination, &mut state, now).await;
        }

        let needs_manual = self.needs_manual(&state, now);
        if needs_manual && !state.manual_signalled {
            state.manual_signalled = true;
            tracing::warn!(
                job_id = job.id,
                attempts = state.failed_attempts,
                "No ETA could be computed, manual estimate needed"
            );
            self.publish(DomainEvent::NeedsManualEta {
                job_id: job.id,
                at: now,
            });
        }

        EtaReading {
            record: state.record,
            needs_manual,
        }
    }

    /// Record a technician-supplied estimate of `minutes` from now
    pub async fn set_manual(
        &self,
        job: &Job,
        actor: &Actor,
        minutes: u32,
        now: i64,
    ) -> Result<EtaRecord, EtaError> {
        let assigned = actor.is_technician() && job.is_assigned_to(&actor.id);
        if !assigned && !actor.is_operator() {
            return Err(EtaError::Unauthorized);
        }
        if !MANUAL_ETA_MINUTES.contains(&minutes) {
            return Err(EtaError::InvalidMinutes(minutes));
        }
        if !job.status.is_in_transit() {
            return Err(EtaError::NotInTransit(job.status));
        }

        let record = EtaRecord {
            source: EtaSource::Manual,
            distance_m: None,
            window: arrival_window(now, i64::from(minutes) * MINUTE_MS),
            computed_at: now,
            position_captured_at: None,
            origin: None,
        };

        let slot = self.slot(job.id);
        let mut state = slot.lock().await;
        state.record = Some(record);
        state.manual_signalled = false;
        drop(state);

        tracing::info!(job_id = job.id, minutes, by = %actor.id, "Manual ETA set");
        self.publish(DomainEvent::EtaUpdated {
            job_id: job.id,
            eta: record,
        });
        Ok(record)
    }

    /// Computed estimates expire with the refresh interval; manual ones once
    /// their window has passed
    fn is_usable(&self, record: &EtaRecord, now: i64) -> bool {
        match record.source {
            EtaSource::Computed => record.age(now) < self.config.refresh_interval_ms as i64,
            EtaSource::Manual => now <= record.window.latest_at,
        }
    }

    fn recompute_due(&self, state: &EtaState, job: &Job, now: i64) -> bool {
        let Some(record) = state.record else {
            return true;
        };
        if record.age(now) >= self.config.refresh_interval_ms as i64 {
            return true;
        }
        match (record.origin, job.last_position) {
            (Some(origin), Some(position)) => {
                let moved = haversine_m(origin.lat, origin.lng, position.lat, position.lng);
                moved > self.config.min_displacement_m
            }
            _ => false,
        }
    }

    async fn recompute(
        &self,
        job: &Job,
        destination: Option<Coordinates>,
        state: &mut EtaState,
        now: i64,
    ) {
        let (Some(position), Some(destination)) = (job.last_position, destination) else {
            self.record_failure(job.id, state, now, "position or destination unknown");
            return;
        };
        let origin = position.coordinates();

        let timeout = Duration::from_millis(self.config.routing_timeout_ms);
        let outcome = match tokio::time::timeout(timeout, self.routing.route(origin, destination))
            .await
        {
            Ok(result) => result.and_then(Route::checked),
            Err(_) => Err(RoutingError::Timeout(self.config.routing_timeout_ms)),
        };

        match outcome {
            Ok(route) => {
                let computed_at = now.max(position.captured_at);
                let travel_ms = route.travel_ms();
                let record = EtaRecord {
                    source: EtaSource::Computed,
                    distance_m: Some(route.distance_m),
                    window: arrival_window(computed_at, travel_ms),
                    computed_at,
                    position_captured_at: Some(position.captured_at),
                    origin: Some(origin),
                };
                state.record = Some(record);
                state.failed_attempts = 0;
                state.first_failure_at = None;
                state.retry_at = 0;
                state.manual_signalled = false;

                tracing::debug!(
                    job_id = job.id,
                    distance_m = route.distance_m,
                    duration_s = route.duration_s,
                    "ETA computed"
                );
                self.publish(DomainEvent::EtaUpdated {
                    job_id: job.id,
                    eta: record,
                });
            }
            Err(e) => self.record_failure(job.id, state, now, &e.to_string()),
        }
    }

    fn record_failure(&self, job_id: i64, state: &mut EtaState, now: i64, reason: &str) {
        state.failed_attempts += 1;
        state.first_failure_at.get_or_insert(now);
        state.retry_at = now + self.config.retry_backoff_ms as i64;
        tracing::warn!(
            job_id,
            attempt = state.failed_attempts,
            reason,
            "ETA computation failed"
        );
    }

    fn needs_manual(&self, state: &EtaState, now: i64) -> bool {
        if state.record.is_some() || state.failed_attempts < self.config.max_attempts {
            return false;
        }
        state
            .first_failure_at
            .is_some_and(|since| now - since >= self.config.manual_grace_ms as i64)
    }

    fn publish(&self, event: DomainEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("ETA event dropped: no active receivers");
        }
    }

    /// Render an estimate for display at `now`
    pub fn view(&self, record: &EtaRecord, now: i64) -> EtaView {
        EtaView {
            source: record.source,
            distance_m: record.distance_m.map(|m| m.round()),
            distance_km: record.distance_m.map(|m| (m / 100.0).round() / 10.0),
            eta_text: eta_text(record.window.minutes_until(now)),
            arrival_window: record.window,
            window_label: self.window_label(&record.window),
            computed_at: record.computed_at,
        }
    }

    fn window_label(&self, window: &ArrivalWindow) -> String {
        format!(
            "{} - {}",
            clock_time(window.earliest_at, self.timezone),
            clock_time(window.latest_at, self.timezone)
        )
    }
}

/// Window around the predicted arrival `departure + travel_ms`
///
/// Half-width is 15% of the travel time, between 2 and 15 minutes, and the
/// window never starts before `departure`.
pub fn arrival_window(departure: i64, travel_ms: i64) -> ArrivalWindow {
    let travel_ms = travel_ms.max(0);
    let arrival = departure.saturating_add(travel_ms);
    let half_width = (travel_ms.saturating_mul(15) / 100).clamp(2 * MINUTE_MS, 15 * MINUTE_MS);
    ArrivalWindow {
        earliest_at: arrival.saturating_sub(half_width).max(departure),
        latest_at: arrival.saturating_add(half_width),
    }
}

fn eta_text(minutes: i64) -> String {
    match minutes {
        m if m <= 1 => "Arriving now".to_string(),
        m if m < 60 => format!("About {} min", m),
        m if m % 60 == 0 => format!("About {} h", m / 60),
        m => format!("About {} h {} min", m / 60, m % 60),
    }
}

fn clock_time(millis: i64, timezone: Tz) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(at) => at.with_timezone(&timezone).format("%H:%M").to_string(),
        None => "--:--".to_string(),
    }
}
