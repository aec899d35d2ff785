//! JobsManager - the job state machine
//!
//! Owns every mutation of ticket and job records:
//! - Ticket submission and address correction
//! - Offers, claims, assignment and declines
//! - Status transitions with capability and precondition checks
//! - Checklist completion / waiver
//! - Technician duty status
//! - Technician position fan-out into live jobs
//! - Offer expiry
//!
//! # Mutation Flow
//!
//! ```text
//! transition(job_id, target, actor)
//!     ├─ 1. Begin write transaction (serializes all writers)
//!     ├─ 2. Load job                       → JobNotFound
//!     ├─ 3. Edge check                     → IllegalTransition
//!     ├─ 4. Capability check               → Unauthorized
//!     ├─ 5. State-entry preconditions      → ChecklistIncomplete / HoldReasonRequired
//!     ├─ 6. Update job, indexes, ticket status, append timeline event
//!     ├─ 7. Commit transaction
//!     └─ 8. Broadcast domain event(s)
//! ```
//!
//! Any error before step 7 drops the transaction, so nothing is written.

mod error;
pub use error::*;

#[cfg(test)]
mod tests;

use super::actor::Actor;
use super::storage::{JOB_ID_KEY, JobStorage, StorageError, TICKET_ID_KEY};
use super::transitions;
use crate::core::config::DispatchConfig;
use redb::WriteTransaction;
use shared::job::{
    Availability, Coordinates, CustomerContact, DeviceDescriptor, DomainEvent, Job, JobStatus,
    Role, TechnicianAvailability, TechnicianPosition, TechnicianRef, Ticket, TicketStatus,
    TimelineEvent, TimelineKind,
};
use shared::util::now_millis;
use std::path::Path;
use tokio::sync::broadcast;

/// Domain event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Ticket fields supplied at submission; the address is already resolved
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub contact: CustomerContact,
    pub device: DeviceDescriptor,
    pub issue: String,
    pub address: String,
    pub address_resolved: bool,
    pub coordinates: Option<Coordinates>,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
}

/// Offer parameters
#[derive(Debug, Clone, Default)]
pub struct NewOffer {
    /// Empty means open to every technician
    pub candidates: Vec<String>,
    /// Overrides the default checklist template
    pub checklist: Option<Vec<String>>,
}

pub struct JobsManager {
    storage: JobStorage,
    event_tx: broadcast::Sender<DomainEvent>,
    config: DispatchConfig,
    /// Unique per process start; clients use it to detect restarts
    epoch: String,
}

impl std::fmt::Debug for JobsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobsManager")
            .field("storage", &"<JobStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl JobsManager {
    /// Open the job database at `db_path`
    pub fn open(db_path: impl AsRef<Path>, config: DispatchConfig) -> ManagerResult<Self> {
        let storage = JobStorage::open(db_path)?;
        Ok(Self::with_storage(storage, config))
    }

    pub fn with_storage(storage: JobStorage, config: DispatchConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "JobsManager started with new epoch");
        Self {
            storage,
            event_tx,
            config,
            epoch,
        }
    }

    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    pub fn storage(&self) -> &JobStorage {
        &self.storage
    }

    /// Subscribe to domain events
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Sender for components that publish derived events (ETA)
    pub fn event_sender(&self) -> broadcast::Sender<DomainEvent> {
        self.event_tx.clone()
    }

    fn broadcast(&self, events: Vec<DomainEvent>) {
        for event in events {
            if self.event_tx.send(event).is_err() {
                tracing::debug!("Domain event dropped: no active receivers");
                break;
            }
        }
    }

    // ========== Tickets ==========

    /// Submit a service request on behalf of the calling customer
    pub fn create_ticket(&self, actor: &Actor, draft: NewTicket) -> ManagerResult<Ticket> {
        if actor.role != Role::Customer {
            return Err(ManagerError::Unauthorized(
                "Only customers submit tickets".to_string(),
            ));
        }
        if draft.issue.trim().is_empty() {
            return Err(ManagerError::Invalid("Issue description is required".into()));
        }

        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let id = self.storage.next_id(&txn, TICKET_ID_KEY)?;
        let ticket = Ticket {
            id,
            customer_id: actor.id.clone(),
            contact: draft.contact,
            device: draft.device,
            issue: draft.issue,
            address: draft.address,
            address_resolved: draft.address_resolved,
            coordinates: draft.coordinates,
            preferred_date: draft.preferred_date,
            preferred_time: draft.preferred_time,
            status: TicketStatus::PendingTriage,
            current_job_id: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.store_ticket(&txn, &ticket)?;
        self.storage.link_customer_ticket(&txn, &actor.id, id)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(ticket_id = id, customer_id = %actor.id, "Ticket created");
        Ok(ticket)
    }

    /// Correct the service address until the technician has arrived
    pub fn correct_address(
        &self,
        actor: &Actor,
        ticket_id: i64,
        address: String,
        address_resolved: bool,
        coordinates: Option<Coordinates>,
    ) -> ManagerResult<Ticket> {
        let txn = self.storage.begin_write()?;
        let mut ticket = self
            .storage
            .get_ticket_txn(&txn, ticket_id)?
            .ok_or(ManagerError::TicketNotFound(ticket_id))?;

        let allowed = match actor.role {
            Role::Operator => true,
            Role::Customer => ticket.customer_id == actor.id,
            Role::Technician => false,
        };
        if !allowed {
            return Err(ManagerError::Unauthorized(
                "Only the ticket owner or an operator may change the address".to_string(),
            ));
        }

        if let Some(job_id) = ticket.current_job_id {
            let locked = self
                .storage
                .get_job_txn(&txn, job_id)?
                .is_some_and(|job| address_locked(&job));
            if locked {
                return Err(ManagerError::AddressLocked(ticket_id));
            }
        }

        ticket.address = address;
        ticket.address_resolved = address_resolved;
        if coordinates.is_some() {
            ticket.coordinates = coordinates;
        }
        ticket.updated_at = now_millis();
        self.storage.store_ticket(&txn, &ticket)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(ticket_id, resolved = address_resolved, "Ticket address corrected");
        Ok(ticket)
    }

    pub fn get_ticket(&self, ticket_id: i64) -> ManagerResult<Ticket> {
        self.storage
            .get_ticket(ticket_id)?
            .ok_or(ManagerError::TicketNotFound(ticket_id))
    }

    /// Tickets of one customer, newest first
    pub fn list_customer_tickets(&self, customer_id: &str) -> ManagerResult<Vec<Ticket>> {
        let mut tickets = Vec::new();
        for id in self.storage.get_customer_ticket_ids(customer_id)? {
            if let Some(ticket) = self.storage.get_ticket(id)? {
                tickets.push(ticket);
            }
        }
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tickets)
    }

    /// Tickets waiting for an operator decision, oldest first
    pub fn list_triage(&self) -> ManagerResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .storage
            .get_all_tickets()?
            .into_iter()
            .filter(|ticket| ticket.status == TicketStatus::PendingTriage)
            .collect();
        tickets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tickets)
    }

    // ========== Offers ==========

    /// Create a job in `offered` for a ticket without a live job
    pub fn offer_job(&self, actor: &Actor, ticket_id: i64, offer: NewOffer) -> ManagerResult<Job> {
        if !actor.is_operator() {
            return Err(ManagerError::Unauthorized(
                "Only operators dispatch jobs".to_string(),
            ));
        }

        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let mut ticket = self
            .storage
            .get_ticket_txn(&txn, ticket_id)?
            .ok_or(ManagerError::TicketNotFound(ticket_id))?;

        for candidate in &offer.candidates {
            if !self.is_on_duty_txn(&txn, candidate)? {
                return Err(ManagerError::TechnicianOffDuty(candidate.clone()));
            }
        }

        if let Some(job_id) = ticket.current_job_id {
            let live = self
                .storage
                .get_job_txn(&txn, job_id)?
                .is_some_and(|existing| existing.status.is_live());
            if live {
                return Err(ManagerError::TicketHasActiveJob { ticket_id, job_id });
            }
        }

        let id = self.storage.next_id(&txn, JOB_ID_KEY)?;
        let checklist_template = offer
            .checklist
            .filter(|steps| !steps.is_empty())
            .unwrap_or_else(|| self.config.default_checklist.clone());
        let mut job = Job {
            id,
            ticket_id,
            technician: None,
            candidates: offer.candidates,
            declined: vec![],
            status: JobStatus::Offered,
            suspended_from: None,
            on_hold_reason: None,
            checklist: vec![],
            checklist_template,
            last_position: None,
            offer_expires_at: now + self.config.offer_ttl_ms as i64,
            created_at: now,
            updated_at: now,
            last_sequence: 0,
        };

        self.append_event(
            &txn,
            &mut job,
            TimelineKind::StatusChanged {
                from: None,
                to: JobStatus::Offered,
            },
            actor,
            None,
            now,
        )?;
        self.storage.store_job(&txn, &job)?;
        self.storage.mark_offered(&txn, id, job.offer_expires_at)?;

        ticket.current_job_id = Some(id);
        ticket.status = TicketStatus::derive(Some(JobStatus::Offered));
        ticket.updated_at = now;
        self.storage.store_ticket(&txn, &ticket)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            job_id = id,
            ticket_id,
            candidates = job.candidates.len(),
            expires_at = job.offer_expires_at,
            "Job offered"
        );
        self.broadcast(vec![DomainEvent::StatusChanged {
            job_id: id,
            ticket_id,
            from: None,
            to: JobStatus::Offered,
            actor_id: actor.id.clone(),
            at: now,
        }]);
        Ok(job)
    }

    /// Claim an offered job (first accept wins)
    pub fn claim(&self, job_id: i64, actor: &Actor) -> ManagerResult<Job> {
        self.bind(job_id, actor.to_technician_ref(), actor, true)
    }

    /// Operator assigns an offered job to a named technician
    pub fn assign(
        &self,
        job_id: i64,
        technician: TechnicianRef,
        actor: &Actor,
    ) -> ManagerResult<Job> {
        self.bind(job_id, technician, actor, false)
    }

    /// Compare-and-swap `(offered, nobody) -> (accepted, technician)`
    fn bind(
        &self,
        job_id: i64,
        technician: TechnicianRef,
        actor: &Actor,
        is_claim: bool,
    ) -> ManagerResult<Job> {
        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let mut job = self
            .storage
            .get_job_txn(&txn, job_id)?
            .ok_or(ManagerError::JobNotFound(job_id))?;

        if job.status != JobStatus::Offered {
            if job
                .technician
                .as_ref()
                .is_some_and(|bound| bound.id != technician.id)
            {
                return Err(ManagerError::AlreadyClaimed(job_id));
            }
            return Err(ManagerError::IllegalTransition {
                from: job.status,
                to: JobStatus::Accepted,
            });
        }

        if is_claim {
            transitions::authorize(&job, JobStatus::Accepted, actor)?;
            if !job.is_candidate(&actor.id) {
                return Err(ManagerError::NotACandidate(job_id));
            }
        } else if !actor.is_operator() {
            return Err(ManagerError::Unauthorized(
                "Only operators assign jobs".to_string(),
            ));
        }

        if !self.is_on_duty_txn(&txn, &technician.id)? {
            return Err(ManagerError::TechnicianOffDuty(technician.id));
        }

        if job.offer_expired(now) {
            return Err(ManagerError::OfferExpired(job_id));
        }

        let technician_id = technician.id.clone();
        job.technician = Some(technician);
        let event = self.apply_status(&txn, &mut job, JobStatus::Accepted, actor, None, now)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(job_id, technician_id = %technician_id, by = %actor.id, "Job claimed");
        self.broadcast(vec![event]);
        Ok(job)
    }

    /// Decline (candidate technician) or reject (operator) an offer
    ///
    /// A candidate's decline is recorded on the timeline; the job moves to
    /// `rejected` once no eligible candidate remains.
    pub fn reject(&self, job_id: i64, actor: &Actor, reason: Option<String>) -> ManagerResult<Job> {
        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let mut job = self
            .storage
            .get_job_txn(&txn, job_id)?
            .ok_or(ManagerError::JobNotFound(job_id))?;

        let mut events = Vec::new();
        match actor.role {
            Role::Operator => {
                transitions::authorize(&job, JobStatus::Rejected, actor)?;
                events.push(self.apply_status(
                    &txn,
                    &mut job,
                    JobStatus::Rejected,
                    actor,
                    reason,
                    now,
                )?);
            }
            Role::Technician => {
                if job.status != JobStatus::Offered {
                    return Err(ManagerError::IllegalTransition {
                        from: job.status,
                        to: JobStatus::Rejected,
                    });
                }
                if job.declined.contains(&actor.id) {
                    tracing::debug!(job_id, technician_id = %actor.id, "Offer already declined");
                    return Ok(job);
                }
                if !job.is_candidate(&actor.id) {
                    return Err(ManagerError::NotACandidate(job_id));
                }

                job.declined.push(actor.id.clone());
                self.append_event(
                    &txn,
                    &mut job,
                    TimelineKind::OfferDeclined {
                        technician_id: actor.id.clone(),
                    },
                    actor,
                    reason,
                    now,
                )?;
                if job.has_remaining_candidates() {
                    self.storage.store_job(&txn, &job)?;
                } else {
                    events.push(self.apply_status(
                        &txn,
                        &mut job,
                        JobStatus::Rejected,
                        actor,
                        Some("All candidates declined".to_string()),
                        now,
                    )?);
                }
            }
            Role::Customer => {
                return Err(ManagerError::Unauthorized(
                    "Customers cannot reject offers".to_string(),
                ));
            }
        }
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(job_id, by = %actor.id, status = %job.status, "Offer rejected");
        self.broadcast(events);
        Ok(job)
    }

    /// Move expired offers to `expired`; returns the affected job ids
    pub fn expire_offers(&self, now: i64) -> ManagerResult<Vec<i64>> {
        let system = Actor::system();
        let mut expired = Vec::new();

        for (job_id, expires_at) in self.storage.get_offered()? {
            if expires_at > now {
                continue;
            }
            let txn = self.storage.begin_write()?;
            let Some(mut job) = self.storage.get_job_txn(&txn, job_id)? else {
                self.storage.clear_offered(&txn, job_id)?;
                txn.commit().map_err(StorageError::from)?;
                continue;
            };
            // claimed or rejected since the index was read
            if job.status != JobStatus::Offered {
                self.storage.clear_offered(&txn, job_id)?;
                txn.commit().map_err(StorageError::from)?;
                continue;
            }
            if !job.offer_expired(now) {
                continue;
            }

            let event = self.apply_status(
                &txn,
                &mut job,
                JobStatus::Expired,
                &system,
                Some("Offer expired".to_string()),
                now,
            )?;
            txn.commit().map_err(StorageError::from)?;
            tracing::info!(job_id, "Offer expired");
            self.broadcast(vec![event]);
            expired.push(job_id);
        }
        Ok(expired)
    }

    // ========== Transitions ==========

    /// Move a job along the transition graph
    ///
    /// `offered -> accepted` by a technician is a claim.
    pub fn transition(
        &self,
        job_id: i64,
        target: JobStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> ManagerResult<Job> {
        if target == JobStatus::Accepted && actor.is_technician() {
            return self.claim(job_id, actor);
        }

        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let mut job = self
            .storage
            .get_job_txn(&txn, job_id)?
            .ok_or(ManagerError::JobNotFound(job_id))?;

        if let Err(denial) = transitions::authorize(&job, target, actor) {
            tracing::debug!(job_id, from = %job.status, to = %target, by = %actor.id, ?denial, "Transition refused");
            return Err(denial.into());
        }

        match target {
            JobStatus::Completed => {
                let open = job.open_checklist_items();
                if !open.is_empty() {
                    return Err(ManagerError::ChecklistIncomplete(open));
                }
            }
            JobStatus::OnHold => {
                let has_reason = note
                    .as_deref()
                    .is_some_and(|reason| !reason.trim().is_empty());
                if !has_reason {
                    return Err(ManagerError::HoldReasonRequired);
                }
            }
            _ => {}
        }

        let from = job.status;
        let event = self.apply_status(&txn, &mut job, target, actor, note, now)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(job_id, from = %from, to = %target, by = %actor.id, "Job status changed");
        self.broadcast(vec![event]);
        Ok(job)
    }

    /// Apply a validated status change inside `txn` and persist the job
    fn apply_status(
        &self,
        txn: &WriteTransaction,
        job: &mut Job,
        to: JobStatus,
        actor: &Actor,
        note: Option<String>,
        now: i64,
    ) -> ManagerResult<DomainEvent> {
        let from = job.status;

        if from == JobStatus::OnHold {
            job.suspended_from = None;
            job.on_hold_reason = None;
        }
        if to == JobStatus::OnHold {
            job.suspended_from = Some(from);
            job.on_hold_reason = note.clone();
        }
        job.status = to;

        if to == JobStatus::Diagnosing {
            job.seed_checklist();
        }
        if from == JobStatus::Offered {
            self.storage.clear_offered(txn, job.id)?;
        }
        if let Some(technician) = &job.technician {
            if to == JobStatus::Accepted {
                self.storage.bind_technician_job(txn, &technician.id, job.id)?;
            } else if to.is_terminal() {
                self.storage
                    .unbind_technician_job(txn, &technician.id, job.id)?;
            }
        }

        self.append_event(
            txn,
            job,
            TimelineKind::StatusChanged {
                from: Some(from),
                to,
            },
            actor,
            note,
            now,
        )?;
        self.storage.store_job(txn, job)?;

        if let Some(mut ticket) = self.storage.get_ticket_txn(txn, job.ticket_id)? {
            ticket.status = TicketStatus::derive(Some(to));
            ticket.updated_at = now;
            self.storage.store_ticket(txn, &ticket)?;
        }

        Ok(DomainEvent::StatusChanged {
            job_id: job.id,
            ticket_id: job.ticket_id,
            from: Some(from),
            to,
            actor_id: actor.id.clone(),
            at: now,
        })
    }

    fn append_event(
        &self,
        txn: &WriteTransaction,
        job: &mut Job,
        kind: TimelineKind,
        actor: &Actor,
        note: Option<String>,
        now: i64,
    ) -> ManagerResult<()> {
        let sequence = job.last_sequence + 1;
        let event = TimelineEvent {
            sequence,
            job_id: job.id,
            kind,
            status: job.status,
            actor: actor.to_ref(),
            timestamp: now,
            note,
        };
        self.storage.append_timeline(txn, &event)?;
        job.last_sequence = sequence;
        job.updated_at = now;
        Ok(())
    }

    // ========== Checklist ==========

    /// Mark a checklist item completed; completing it again is a no-op
    pub fn complete_checklist_item(
        &self,
        job_id: i64,
        item_id: u32,
        actor: &Actor,
    ) -> ManagerResult<Job> {
        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let mut job = self
            .storage
            .get_job_txn(&txn, job_id)?
            .ok_or(ManagerError::JobNotFound(job_id))?;

        let assigned = actor.is_technician() && job.is_assigned_to(&actor.id);
        if !assigned && !actor.is_operator() {
            return Err(ManagerError::Unauthorized(
                "Only the assigned technician may complete checklist items".to_string(),
            ));
        }
        if job.status.is_terminal() {
            return Err(ManagerError::Invalid(format!("Job {} is closed", job_id)));
        }

        let item = job
            .checklist
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(ManagerError::ChecklistItemNotFound { job_id, item_id })?;
        if item.completed {
            tracing::debug!(job_id, item_id, "Checklist item already completed");
            return Ok(job);
        }
        item.completed = true;
        item.completed_at = Some(now);

        self.append_event(
            &txn,
            &mut job,
            TimelineKind::ChecklistItemCompleted { item_id },
            actor,
            None,
            now,
        )?;
        self.storage.store_job(&txn, &job)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(job_id, item_id, "Checklist item completed");
        self.broadcast(vec![DomainEvent::ChecklistItemCompleted {
            job_id,
            item_id,
            at: now,
        }]);
        Ok(job)
    }

    /// Operator waives a checklist item so the job may complete
    pub fn waive_checklist_item(
        &self,
        job_id: i64,
        item_id: u32,
        reason: String,
        actor: &Actor,
    ) -> ManagerResult<Job> {
        if !actor.is_operator() {
            return Err(ManagerError::Unauthorized(
                "Only operators waive checklist items".to_string(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(ManagerError::Invalid("Waive reason is required".into()));
        }

        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let mut job = self
            .storage
            .get_job_txn(&txn, job_id)?
            .ok_or(ManagerError::JobNotFound(job_id))?;
        if job.status.is_terminal() {
            return Err(ManagerError::Invalid(format!("Job {} is closed", job_id)));
        }

        let item = job
            .checklist
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(ManagerError::ChecklistItemNotFound { job_id, item_id })?;
        if item.is_settled() {
            return Ok(job);
        }
        item.waived = true;
        item.waive_reason = Some(reason.clone());

        self.append_event(
            &txn,
            &mut job,
            TimelineKind::ChecklistItemWaived { item_id },
            actor,
            Some(reason),
            now,
        )?;
        self.storage.store_job(&txn, &job)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(job_id, item_id, "Checklist item waived");
        Ok(job)
    }

    // ========== Availability ==========

    /// Technician toggles their own duty status
    pub fn set_availability(
        &self,
        actor: &Actor,
        status: Availability,
    ) -> ManagerResult<TechnicianAvailability> {
        if !actor.is_technician() {
            return Err(ManagerError::Unauthorized(
                "Only technicians report duty status".to_string(),
            ));
        }

        let record = TechnicianAvailability {
            technician_id: actor.id.clone(),
            status,
            updated_at: now_millis(),
        };
        let txn = self.storage.begin_write()?;
        self.storage.store_availability(&txn, &record)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(technician_id = %actor.id, status = status.as_str(), "Duty status changed");
        Ok(record)
    }

    pub fn get_availability(&self, technician_id: &str) -> ManagerResult<TechnicianAvailability> {
        Ok(self
            .storage
            .get_availability(technician_id)?
            .unwrap_or_else(|| TechnicianAvailability::unreported(technician_id)))
    }

    fn is_on_duty_txn(&self, txn: &WriteTransaction, technician_id: &str) -> ManagerResult<bool> {
        Ok(self
            .storage
            .get_availability_txn(txn, technician_id)?
            .is_none_or(|record| record.status.is_on_duty()))
    }

    // ========== Positions ==========

    /// Copy a technician fix into every live job bound to them
    ///
    /// Jobs already holding a newer or equal fix are left untouched.
    pub fn record_position(
        &self,
        technician_id: &str,
        position: TechnicianPosition,
    ) -> ManagerResult<Vec<i64>> {
        let txn = self.storage.begin_write()?;
        let mut updated = Vec::new();
        for job_id in self.storage.get_technician_job_ids_txn(&txn, technician_id)? {
            let Some(mut job) = self.storage.get_job_txn(&txn, job_id)? else {
                continue;
            };
            if job.status.is_terminal() {
                continue;
            }
            if job
                .last_position
                .is_some_and(|last| last.captured_at >= position.captured_at)
            {
                continue;
            }
            job.last_position = Some(position);
            self.storage.store_job(&txn, &job)?;
            updated.push(job_id);
        }
        if updated.is_empty() {
            return Ok(updated);
        }
        txn.commit().map_err(StorageError::from)?;
        Ok(updated)
    }

    // ========== Queries ==========

    pub fn get_job(&self, job_id: i64) -> ManagerResult<Job> {
        self.storage
            .get_job(job_id)?
            .ok_or(ManagerError::JobNotFound(job_id))
    }

    /// Job and timeline read from one consistent snapshot
    pub fn get_job_with_timeline(&self, job_id: i64) -> ManagerResult<(Job, Vec<TimelineEvent>)> {
        self.storage
            .get_job_with_timeline(job_id)?
            .ok_or(ManagerError::JobNotFound(job_id))
    }

    /// Offers the technician may still claim; none while off duty
    pub fn get_offered_jobs(&self, technician_id: &str) -> ManagerResult<Vec<Job>> {
        let now = now_millis();
        let mut jobs = Vec::new();
        if !self.get_availability(technician_id)?.status.is_on_duty() {
            return Ok(jobs);
        }
        for (job_id, _expires_at) in self.storage.get_offered()? {
            let Some(job) = self.storage.get_job(job_id)? else {
                continue;
            };
            if job.status == JobStatus::Offered
                && job.is_candidate(technician_id)
                && !job.offer_expired(now)
            {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    /// Live jobs bound to the technician
    pub fn get_assigned_jobs(&self, technician_id: &str) -> ManagerResult<Vec<Job>> {
        let mut jobs = Vec::new();
        for job_id in self.storage.get_technician_job_ids(technician_id)? {
            if let Some(job) = self.storage.get_job(job_id)?.filter(|job| job.status.is_live()) {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }
}

/// Address may not change once the technician has reached the site
fn address_locked(job: &Job) -> bool {
    if !job.status.is_live() {
        return false;
    }
    let effective = match job.status {
        JobStatus::OnHold => job.suspended_from.unwrap_or(JobStatus::OnHold),
        status => status,
    };
    !matches!(
        effective,
        JobStatus::Offered | JobStatus::Accepted | JobStatus::EnRoute | JobStatus::ComponentPickup
    )
}
