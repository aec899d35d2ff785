//! Tracking snapshot assembly
//!
//! ```text
//! snapshot(ticket | job, actor)
//!     ├─ 1. Read ticket, job and timeline (job + timeline from one read txn)
//!     ├─ 2. Classify viewer               → PermissionDenied if unrelated
//!     ├─ 3. visible_fields(status, viewer)
//!     ├─ 4. ETA (in transit only, recomputed when due)
//!     └─ 5. Shape TrackingSnapshot, stamp generatedAt
//! ```

use super::poll::recommended_poll_interval;
use crate::core::config::TrackingConfig;
use crate::disclosure::{Field, Viewer, visible_fields};
use crate::eta::EtaEstimator;
use crate::jobs::{Actor, JobsManager};
use shared::error::{AppError, AppResult};
use shared::job::{
    Job, TechnicianView, Ticket, TicketStatus, TicketView, TimelineEntry, TimelineEvent,
    TrackingSnapshot,
};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct TrackingFeed {
    manager: Arc<JobsManager>,
    estimator: Arc<EtaEstimator>,
    config: TrackingConfig,
}

impl std::fmt::Debug for TrackingFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingFeed")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TrackingFeed {
    pub fn new(
        manager: Arc<JobsManager>,
        estimator: Arc<EtaEstimator>,
        config: TrackingConfig,
    ) -> Self {
        Self {
            manager,
            estimator,
            config,
        }
    }

    /// Snapshot of a ticket (and its current job, if any)
    pub async fn ticket_snapshot(
        &self,
        ticket_id: i64,
        actor: &Actor,
        now: i64,
    ) -> AppResult<TrackingSnapshot> {
        let ticket = self.manager.get_ticket(ticket_id)?;
        let job = match ticket.current_job_id {
            Some(job_id) => Some(self.manager.get_job_with_timeline(job_id)?),
            None => None,
        };
        self.assemble(ticket, job, actor, now).await
    }

    /// Snapshot addressed by job id
    pub async fn job_snapshot(
        &self,
        job_id: i64,
        actor: &Actor,
        now: i64,
    ) -> AppResult<TrackingSnapshot> {
        let (job, timeline) = self.manager.get_job_with_timeline(job_id)?;
        let ticket = self.manager.get_ticket(job.ticket_id)?;
        self.assemble(ticket, Some((job, timeline)), actor, now).await
    }

    /// Recompute the estimate of an in-transit job ahead of the next poll
    pub async fn refresh_eta(&self, job_id: i64, now: i64) -> AppResult<()> {
        let job = self.manager.get_job(job_id)?;
        if !job.status.is_in_transit() {
            self.estimator.forget(job_id);
            return Ok(());
        }
        let ticket = self.manager.get_ticket(job.ticket_id)?;
        self.estimator.current(&job, ticket.coordinates, now).await;
        Ok(())
    }

    async fn assemble(
        &self,
        ticket: Ticket,
        job: Option<(Job, Vec<TimelineEvent>)>,
        actor: &Actor,
        now: i64,
    ) -> AppResult<TrackingSnapshot> {
        let job_ref = job.as_ref().map(|(job, _)| job);
        let viewer = Viewer::of(actor, &ticket, job_ref).ok_or_else(|| {
            AppError::permission_denied(format!("No access to ticket {}", ticket.id))
        })?;
        let role = viewer.role();

        // derived from the job read, not the stored ticket status
        let job_status = job_ref.map(|job| job.status);
        let status = TicketStatus::derive(job_status);
        let fields = visible_fields(job_status, viewer);

        let mut snapshot = TrackingSnapshot {
            ticket_id: ticket.id,
            job_id: job_ref.map(|job| job.id),
            status,
            status_label: status.label(role).to_string(),
            eta: None,
            eta_pending: false,
            needs_manual_eta: false,
            technician: None,
            position: None,
            timeline: Vec::new(),
            recommended_poll_interval_ms: recommended_poll_interval(status, &self.config),
            generated_at: now,
            ticket: ticket_view(&ticket, &fields),
            checklist: None,
            on_hold_reason: None,
            viewer_role: role,
        };

        let Some((job, timeline)) = job else {
            return Ok(snapshot);
        };

        if let Some(technician) = &job.technician {
            let view = TechnicianView {
                id: fields
                    .contains(&Field::TechnicianId)
                    .then(|| technician.id.clone()),
                name: fields
                    .contains(&Field::TechnicianName)
                    .then(|| technician.name.clone()),
                phone: fields
                    .contains(&Field::TechnicianPhone)
                    .then(|| technician.phone.clone())
                    .flatten(),
            };
            if !view.is_empty() {
                snapshot.technician = Some(view);
            }
        }

        if job.status.is_in_transit() {
            if fields.contains(&Field::Position) {
                snapshot.position = job.last_position;
            }
            if fields.contains(&Field::Eta) {
                let reading = self.estimator.current(&job, ticket.coordinates, now).await;
                snapshot.eta = reading
                    .record
                    .map(|record| self.estimator.view(&record, now));
                snapshot.eta_pending = reading.is_pending();
                snapshot.needs_manual_eta = reading.needs_manual && viewer != Viewer::Customer;
            }
        }

        if fields.contains(&Field::Timeline) {
            snapshot.timeline = timeline
                .iter()
                .filter(|event| event.is_status_change())
                .map(|event| TimelineEntry {
                    sequence: event.sequence,
                    status: event.status,
                    status_label: event.status.label(role).to_string(),
                    actor_role: event.actor.role,
                    timestamp: event.timestamp,
                    note: event.note.clone(),
                })
                .collect();
        }

        if fields.contains(&Field::Checklist) && !job.checklist.is_empty() {
            snapshot.checklist = Some(job.checklist.clone());
        }
        if fields.contains(&Field::OnHoldReason) {
            snapshot.on_hold_reason = job.on_hold_reason.clone();
        }

        Ok(snapshot)
    }
}

fn ticket_view(ticket: &Ticket, fields: &BTreeSet<Field>) -> TicketView {
    let show = |field: Field| fields.contains(&field);
    TicketView {
        device_type: show(Field::DeviceType).then(|| ticket.device.device_type.clone()),
        brand: show(Field::Brand).then(|| ticket.device.brand.clone()),
        model: show(Field::Model)
            .then(|| ticket.device.model.clone())
            .flatten(),
        issue: show(Field::Issue).then(|| ticket.issue.clone()),
        address: show(Field::Address).then(|| ticket.address.clone()),
        coordinates: show(Field::Coordinates)
            .then_some(ticket.coordinates)
            .flatten(),
        preferred_date: show(Field::PreferredSchedule)
            .then(|| ticket.preferred_date.clone())
            .flatten(),
        preferred_time: show(Field::PreferredSchedule)
            .then(|| ticket.preferred_time.clone())
            .flatten(),
        customer_name: show(Field::CustomerName).then(|| ticket.contact.name.clone()),
        customer_phone: show(Field::CustomerPhone).then(|| ticket.contact.phone.clone()),
        customer_email: show(Field::CustomerEmail)
            .then(|| ticket.contact.email.clone())
            .flatten(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{DispatchConfig, EtaConfig};
    use crate::eta::{Route, RoutingError, RoutingService};
    use crate::jobs::{JobStorage, NewOffer, NewTicket};
    use async_trait::async_trait;
    use shared::error::ErrorCode;
    use shared::job::{
        Coordinates, CustomerContact, DeviceDescriptor, EtaSource, JobStatus, Role,
        TechnicianPosition,
    };
    use shared::util::{haversine_m, now_millis};

    struct StraightLine;

    #[async_trait]
    impl RoutingService for StraightLine {
        async fn route(
            &self,
            origin: Coordinates,
            destination: Coordinates,
        ) -> Result<Route, RoutingError> {
            let distance_m = haversine_m(origin.lat, origin.lng, destination.lat, destination.lng);
            Ok(Route {
                distance_m,
                duration_s: distance_m / 10.0,
            })
        }
    }

    struct Fixture {
        manager: Arc<JobsManager>,
        feed: TrackingFeed,
        customer: Actor,
        tech: Actor,
        job_id: i64,
        ticket_id: i64,
    }

    fn fixture() -> Fixture {
        let storage = JobStorage::open_in_memory().unwrap();
        let manager = Arc::new(JobsManager::with_storage(storage, DispatchConfig::default()));
        let estimator = Arc::new(EtaEstimator::new(
            Arc::new(StraightLine),
            EtaConfig::default(),
            chrono_tz::UTC,
            manager.event_sender(),
        ));
        let feed = TrackingFeed::new(manager.clone(), estimator, TrackingConfig::default());

        let customer = Actor::new("cust-1", "Ana Cruz", Role::Customer);
        let tech = Actor::new("tech-a", "Ben Reyes", Role::Technician).with_phone("+63 917 555 0101");
        let operator = Actor::new("op-1", "Dispatcher", Role::Operator);

        let ticket = manager
            .create_ticket(
                &customer,
                NewTicket {
                    contact: CustomerContact {
                        name: "Ana Cruz".to_string(),
                        phone: "+63 900 000 0000".to_string(),
                        email: None,
                    },
                    device: DeviceDescriptor {
                        device_type: "aircon".to_string(),
                        brand: "Koldair".to_string(),
                        model: Some("K-12".to_string()),
                    },
                    issue: "Leaking water".to_string(),
                    address: "12 Mabini St".to_string(),
                    address_resolved: true,
                    coordinates: Some(Coordinates::new(14.6760, 121.0437)),
                    preferred_date: None,
                    preferred_time: None,
                },
            )
            .unwrap();
        let job = manager
            .offer_job(&operator, ticket.id, NewOffer::default())
            .unwrap();

        Fixture {
            manager,
            feed,
            customer,
            tech,
            job_id: job.id,
            ticket_id: ticket.id,
        }
    }

    #[tokio::test]
    async fn test_offered_snapshot_for_candidate_is_a_teaser() {
        let f = fixture();
        let snapshot = f.feed.job_snapshot(f.job_id, &f.tech, now_millis()).await.unwrap();

        assert_eq!(snapshot.ticket.device_type.as_deref(), Some("aircon"));
        assert_eq!(snapshot.ticket.issue.as_deref(), Some("Leaking water"));
        assert!(snapshot.ticket.address.is_none());
        assert!(snapshot.ticket.customer_phone.is_none());
        assert!(snapshot.ticket.customer_name.is_none());
        assert!(snapshot.timeline.is_empty());
        assert_eq!(snapshot.status_label, "Offered");
    }

    #[tokio::test]
    async fn test_customer_snapshot_while_offered() {
        let f = fixture();
        let snapshot = f
            .feed
            .ticket_snapshot(f.ticket_id, &f.customer, now_millis())
            .await
            .unwrap();

        assert_eq!(snapshot.status, TicketStatus::Job(JobStatus::Offered));
        assert_eq!(snapshot.status_label, "Pending Review");
        assert!(snapshot.technician.is_none());
        assert_eq!(snapshot.timeline.len(), 1);
        assert_eq!(snapshot.recommended_poll_interval_ms, Some(300_000));
    }

    #[tokio::test]
    async fn test_en_route_snapshot_has_position_and_eta() {
        let f = fixture();
        f.manager.claim(f.job_id, &f.tech).unwrap();
        f.manager
            .transition(f.job_id, JobStatus::EnRoute, &f.tech, None)
            .unwrap();
        let now = now_millis();
        f.manager
            .record_position(
                "tech-a",
                TechnicianPosition {
                    lat: 14.60,
                    lng: 121.0437,
                    captured_at: now,
                },
            )
            .unwrap();

        let snapshot = f.feed.ticket_snapshot(f.ticket_id, &f.customer, now).await.unwrap();
        let technician = snapshot.technician.unwrap();
        assert_eq!(technician.name.as_deref(), Some("Ben Reyes"));
        assert_eq!(technician.phone.as_deref(), Some("+63 917 555 0101"));
        assert!(snapshot.position.is_some());
        let eta = snapshot.eta.unwrap();
        assert_eq!(eta.source, EtaSource::Computed);
        assert!(!snapshot.eta_pending);
        assert_eq!(snapshot.recommended_poll_interval_ms, Some(30_000));

        // timeline oldest first
        let statuses: Vec<JobStatus> = snapshot.timeline.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![JobStatus::Offered, JobStatus::Accepted, JobStatus::EnRoute]
        );

        // the assigned technician now sees the customer
        let tech_view = f.feed.job_snapshot(f.job_id, &f.tech, now).await.unwrap();
        assert_eq!(tech_view.ticket.customer_phone.as_deref(), Some("+63 900 000 0000"));
        assert_eq!(tech_view.ticket.address.as_deref(), Some("12 Mabini St"));
    }

    #[tokio::test]
    async fn test_en_route_without_position_is_pending() {
        let f = fixture();
        f.manager.claim(f.job_id, &f.tech).unwrap();
        f.manager
            .transition(f.job_id, JobStatus::EnRoute, &f.tech, None)
            .unwrap();

        let snapshot = f
            .feed
            .ticket_snapshot(f.ticket_id, &f.customer, now_millis())
            .await
            .unwrap();
        assert!(snapshot.eta.is_none());
        assert!(snapshot.eta_pending);
        assert!(snapshot.position.is_none());
    }

    #[tokio::test]
    async fn test_eta_and_position_dropped_after_arrival() {
        let f = fixture();
        f.manager.claim(f.job_id, &f.tech).unwrap();
        f.manager
            .transition(f.job_id, JobStatus::EnRoute, &f.tech, None)
            .unwrap();
        let now = now_millis();
        f.manager
            .record_position(
                "tech-a",
                TechnicianPosition {
                    lat: 14.67,
                    lng: 121.04,
                    captured_at: now,
                },
            )
            .unwrap();
        f.feed.refresh_eta(f.job_id, now).await.unwrap();
        f.manager
            .transition(f.job_id, JobStatus::Arrived, &f.tech, None)
            .unwrap();

        let snapshot = f.feed.ticket_snapshot(f.ticket_id, &f.customer, now).await.unwrap();
        assert!(snapshot.eta.is_none());
        assert!(!snapshot.eta_pending);
        assert!(snapshot.position.is_none());
        assert_eq!(snapshot.recommended_poll_interval_ms, Some(300_000));
    }

    #[tokio::test]
    async fn test_unrelated_viewers_are_denied() {
        let f = fixture();
        let stranger = Actor::new("cust-2", "Other", Role::Customer);
        let err = f
            .feed
            .ticket_snapshot(f.ticket_id, &stranger, now_millis())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        f.manager.claim(f.job_id, &f.tech).unwrap();
        let other_tech = Actor::new("tech-b", "Other Tech", Role::Technician);
        let err = f
            .feed
            .job_snapshot(f.job_id, &other_tech, now_millis())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_cancelled_job_stops_polling() {
        let f = fixture();
        f.manager.claim(f.job_id, &f.tech).unwrap();
        let operator = Actor::new("op-1", "Dispatcher", Role::Operator);
        f.manager
            .transition(f.job_id, JobStatus::Cancelled, &operator, Some("Duplicate".into()))
            .unwrap();

        let snapshot = f
            .feed
            .ticket_snapshot(f.ticket_id, &f.customer, now_millis())
            .await
            .unwrap();
        assert_eq!(snapshot.recommended_poll_interval_ms, None);
        assert_eq!(snapshot.timeline.last().unwrap().note.as_deref(), Some("Duplicate"));
    }
}
