//! Shared server state
//!
//! Every handler receives a clone of [`ServerState`]; all members are
//! reference counted.

use shared::job::Job;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::JwtService;
use crate::core::tasks::{self, BackgroundTasks, TaskKind};
use crate::core::{Config, ServerError};
use crate::eta::{DisabledRouting, EtaEstimator, HttpRoutingService, RoutingService};
use crate::geo::{DisabledGeocoder, GeolocationResolver, Geocoder, HttpGeocoder, PositionTracker};
use crate::jobs::{JobStorage, JobsManager, ManagerResult};
use crate::tracking::TrackingFeed;

#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub jobs: Arc<JobsManager>,
    pub positions: Arc<PositionTracker>,
    pub eta: Arc<EtaEstimator>,
    pub resolver: Arc<GeolocationResolver>,
    pub feed: Arc<TrackingFeed>,
    pub jwt_service: Arc<JwtService>,
    pub started_at: Instant,
}

impl ServerState {
    /// Open the on-disk database under `work_dir` and wire every service
    pub fn initialize(config: &Config) -> Result<Self, ServerError> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let storage = JobStorage::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Job database opened");
        Ok(Self::with_storage(config, storage))
    }

    /// State over an in-memory database
    pub fn in_memory(config: &Config) -> Result<Self, ServerError> {
        Ok(Self::with_storage(config, JobStorage::open_in_memory()?))
    }

    pub fn with_storage(config: &Config, storage: JobStorage) -> Self {
        let jobs = Arc::new(JobsManager::with_storage(storage, config.dispatch.clone()));

        let routing: Arc<dyn RoutingService> = match &config.eta.routing_url {
            Some(url) => Arc::new(HttpRoutingService::new(
                url.clone(),
                Duration::from_millis(config.eta.routing_timeout_ms),
            )),
            None => {
                tracing::warn!("ROUTING_URL not set, ETAs will need manual entry");
                Arc::new(DisabledRouting)
            }
        };
        let geocoder: Arc<dyn Geocoder> = match &config.geo.geocoder_url {
            Some(url) => Arc::new(HttpGeocoder::new(
                url.clone(),
                config.geo.geocoder_api_key.clone(),
                Duration::from_millis(config.geo.geocoder_timeout_ms),
            )),
            None => Arc::new(DisabledGeocoder),
        };

        let eta = Arc::new(EtaEstimator::new(
            routing,
            config.eta.clone(),
            config.timezone,
            jobs.event_sender(),
        ));
        let resolver = Arc::new(GeolocationResolver::new(
            geocoder,
            Duration::from_millis(config.geo.acquisition_timeout_ms),
            Duration::from_millis(config.geo.geocoder_timeout_ms),
        ));
        let feed = Arc::new(TrackingFeed::new(
            jobs.clone(),
            eta.clone(),
            config.tracking.clone(),
        ));

        Self {
            config: config.clone(),
            jobs,
            positions: Arc::new(PositionTracker::new()),
            eta,
            resolver,
            feed,
            jwt_service: Arc::new(JwtService::with_config(config.jwt.clone())),
            started_at: Instant::now(),
        }
    }

    /// Copy the technician's last tracked fix into a job that has none yet
    ///
    /// Covers fixes reported before the job was bound. Returns the job as
    /// stored afterwards.
    pub fn seed_position(&self, job: Job) -> ManagerResult<Job> {
        if job.last_position.is_some() || !job.status.is_live() {
            return Ok(job);
        }
        let Some(technician_id) = job.technician.as_ref().map(|t| t.id.clone()) else {
            return Ok(job);
        };
        let Some(position) = self.positions.get(&technician_id) else {
            return Ok(job);
        };

        let updated = self.jobs.record_position(&technician_id, position)?;
        if !updated.contains(&job.id) {
            return Ok(job);
        }
        tracing::debug!(
            job_id = job.id,
            technician_id = %technician_id,
            captured_at = position.captured_at,
            "Job seeded with last known position"
        );
        self.jobs.get_job(job.id)
    }

    pub fn jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Start the offer sweeper and the domain event listener
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut background = BackgroundTasks::new();

        background.spawn(
            "offer_sweeper",
            TaskKind::Periodic,
            tasks::run_offer_sweeper(
                self.jobs.clone(),
                Duration::from_millis(self.config.dispatch.offer_sweep_interval_ms),
                background.shutdown_token(),
            ),
        );
        background.spawn(
            "domain_event_listener",
            TaskKind::Listener,
            tasks::run_event_listener(
                self.jobs.subscribe(),
                self.eta.clone(),
                background.shutdown_token(),
            ),
        );

        background.log_summary();
        background
    }
}
