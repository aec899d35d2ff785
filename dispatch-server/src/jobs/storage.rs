//! redb-based storage for tickets, jobs and their timelines
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `tickets` | `ticket_id` | `Ticket` | Service requests |
//! | `jobs` | `job_id` | `Job` | Job records (current state) |
//! | `timeline` | `(job_id, sequence)` | `TimelineEvent` | Append-only job history |
//! | `customer_tickets` | `(customer_id, ticket_id)` | `()` | Tickets per customer |
//! | `technician_jobs` | `(technician_id, job_id)` | `()` | Live jobs per technician |
//! | `offered_jobs` | `job_id` | `i64` | Open offers and their deadline |
//! | `technician_status` | `technician_id` | `TechnicianAvailability` | Duty status |
//! | `counters` | name | `u64` | Id allocation |
//!
//! # Concurrency
//!
//! redb admits a single write transaction at a time. Every job mutation reads
//! and writes inside one `WriteTransaction`, so two concurrent transitions on
//! the same job are serialized and the second observes the first's result.
//! Dropping a transaction without `commit()` discards all of its writes.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::job::{Job, TechnicianAvailability, Ticket, TimelineEvent};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = ticket_id, value = JSON-serialized Ticket
const TICKETS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("tickets");

/// key = job_id, value = JSON-serialized Job
const JOBS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("jobs");

/// key = (job_id, sequence), value = JSON-serialized TimelineEvent
const TIMELINE_TABLE: TableDefinition<(i64, u64), &[u8]> = TableDefinition::new("timeline");

const CUSTOMER_TICKETS_TABLE: TableDefinition<(&str, i64), ()> =
    TableDefinition::new("customer_tickets");

const TECHNICIAN_JOBS_TABLE: TableDefinition<(&str, i64), ()> =
    TableDefinition::new("technician_jobs");

/// key = job_id, value = offer deadline (Unix millis)
const OFFERED_JOBS_TABLE: TableDefinition<i64, i64> = TableDefinition::new("offered_jobs");

/// key = technician_id, value = JSON-serialized TechnicianAvailability
const TECHNICIAN_STATUS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("technician_status");

const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

pub const TICKET_ID_KEY: &str = "ticket_id";
pub const JOB_ID_KEY: &str = "job_id";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Ticket/job storage backed by redb
#[derive(Clone)]
pub struct JobStorage {
    db: Arc<Database>,
}

impl JobStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and ephemeral runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TICKETS_TABLE)?;
            let _ = write_txn.open_table(JOBS_TABLE)?;
            let _ = write_txn.open_table(TIMELINE_TABLE)?;
            let _ = write_txn.open_table(CUSTOMER_TICKETS_TABLE)?;
            let _ = write_txn.open_table(TECHNICIAN_JOBS_TABLE)?;
            let _ = write_txn.open_table(OFFERED_JOBS_TABLE)?;
            let _ = write_txn.open_table(TECHNICIAN_STATUS_TABLE)?;
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Id allocation ==========

    /// Increment and return the named counter (within transaction)
    pub fn next_id(&self, txn: &WriteTransaction, key: &str) -> StorageResult<i64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(key)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next as i64)
    }

    // ========== Tickets ==========

    pub fn store_ticket(&self, txn: &WriteTransaction, ticket: &Ticket) -> StorageResult<()> {
        let mut table = txn.open_table(TICKETS_TABLE)?;
        let value = serde_json::to_vec(ticket)?;
        table.insert(ticket.id, value.as_slice())?;
        Ok(())
    }

    pub fn get_ticket(&self, ticket_id: i64) -> StorageResult<Option<Ticket>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TICKETS_TABLE)?;
        match table.get(ticket_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_ticket_txn(
        &self,
        txn: &WriteTransaction,
        ticket_id: i64,
    ) -> StorageResult<Option<Ticket>> {
        let table = txn.open_table(TICKETS_TABLE)?;
        match table.get(ticket_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn link_customer_ticket(
        &self,
        txn: &WriteTransaction,
        customer_id: &str,
        ticket_id: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CUSTOMER_TICKETS_TABLE)?;
        table.insert((customer_id, ticket_id), ())?;
        Ok(())
    }

    /// Ticket ids owned by a customer, ascending
    pub fn get_customer_ticket_ids(&self, customer_id: &str) -> StorageResult<Vec<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CUSTOMER_TICKETS_TABLE)?;
        let mut ids = Vec::new();
        for result in table.range((customer_id, i64::MIN)..=(customer_id, i64::MAX))? {
            let (key, _value) = result?;
            ids.push(key.value().1);
        }
        Ok(ids)
    }

    /// All tickets, ascending by id
    pub fn get_all_tickets(&self) -> StorageResult<Vec<Ticket>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TICKETS_TABLE)?;
        let mut tickets = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            tickets.push(serde_json::from_slice(value.value())?);
        }
        Ok(tickets)
    }

    // ========== Jobs ==========

    pub fn store_job(&self, txn: &WriteTransaction, job: &Job) -> StorageResult<()> {
        let mut table = txn.open_table(JOBS_TABLE)?;
        let value = serde_json::to_vec(job)?;
        table.insert(job.id, value.as_slice())?;
        Ok(())
    }

    pub fn get_job(&self, job_id: i64) -> StorageResult<Option<Job>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(JOBS_TABLE)?;
        match table.get(job_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_job_txn(&self, txn: &WriteTransaction, job_id: i64) -> StorageResult<Option<Job>> {
        let table = txn.open_table(JOBS_TABLE)?;
        match table.get(job_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Load a job together with its timeline from one read transaction
    pub fn get_job_with_timeline(
        &self,
        job_id: i64,
    ) -> StorageResult<Option<(Job, Vec<TimelineEvent>)>> {
        let read_txn = self.db.begin_read()?;
        let jobs = read_txn.open_table(JOBS_TABLE)?;
        let job: Job = match jobs.get(job_id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Ok(None),
        };

        let timeline_table = read_txn.open_table(TIMELINE_TABLE)?;
        let mut timeline = Vec::new();
        for result in timeline_table.range((job_id, 0u64)..=(job_id, u64::MAX))? {
            let (_key, value) = result?;
            timeline.push(serde_json::from_slice(value.value())?);
        }
        Ok(Some((job, timeline)))
    }

    // ========== Timeline ==========

    pub fn append_timeline(
        &self,
        txn: &WriteTransaction,
        event: &TimelineEvent,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TIMELINE_TABLE)?;
        let value = serde_json::to_vec(event)?;
        table.insert((event.job_id, event.sequence), value.as_slice())?;
        Ok(())
    }

    /// Timeline of a job, oldest first
    pub fn get_timeline(&self, job_id: i64) -> StorageResult<Vec<TimelineEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TIMELINE_TABLE)?;
        let mut events = Vec::new();
        for result in table.range((job_id, 0u64)..=(job_id, u64::MAX))? {
            let (_key, value) = result?;
            events.push(serde_json::from_slice(value.value())?);
        }
        Ok(events)
    }

    // ========== Technician index ==========

    pub fn bind_technician_job(
        &self,
        txn: &WriteTransaction,
        technician_id: &str,
        job_id: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TECHNICIAN_JOBS_TABLE)?;
        table.insert((technician_id, job_id), ())?;
        Ok(())
    }

    pub fn unbind_technician_job(
        &self,
        txn: &WriteTransaction,
        technician_id: &str,
        job_id: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TECHNICIAN_JOBS_TABLE)?;
        table.remove((technician_id, job_id))?;
        Ok(())
    }

    /// Live job ids bound to a technician
    pub fn get_technician_job_ids(&self, technician_id: &str) -> StorageResult<Vec<i64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TECHNICIAN_JOBS_TABLE)?;
        let mut ids = Vec::new();
        for result in table.range((technician_id, i64::MIN)..=(technician_id, i64::MAX))? {
            let (key, _value) = result?;
            ids.push(key.value().1);
        }
        Ok(ids)
    }

    /// Live job ids bound to a technician (within transaction)
    pub fn get_technician_job_ids_txn(
        &self,
        txn: &WriteTransaction,
        technician_id: &str,
    ) -> StorageResult<Vec<i64>> {
        let table = txn.open_table(TECHNICIAN_JOBS_TABLE)?;
        let mut ids = Vec::new();
        for result in table.range((technician_id, i64::MIN)..=(technician_id, i64::MAX))? {
            let (key, _value) = result?;
            ids.push(key.value().1);
        }
        Ok(ids)
    }

    // ========== Offers ==========

    pub fn mark_offered(
        &self,
        txn: &WriteTransaction,
        job_id: i64,
        expires_at: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(OFFERED_JOBS_TABLE)?;
        table.insert(job_id, expires_at)?;
        Ok(())
    }

    pub fn clear_offered(&self, txn: &WriteTransaction, job_id: i64) -> StorageResult<()> {
        let mut table = txn.open_table(OFFERED_JOBS_TABLE)?;
        table.remove(job_id)?;
        Ok(())
    }

    /// All open offers as `(job_id, expires_at)`
    pub fn get_offered(&self) -> StorageResult<Vec<(i64, i64)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OFFERED_JOBS_TABLE)?;
        let mut offers = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            offers.push((key.value(), value.value()));
        }
        Ok(offers)
    }

    // ========== Technician status ==========

    pub fn store_availability(
        &self,
        txn: &WriteTransaction,
        availability: &TechnicianAvailability,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TECHNICIAN_STATUS_TABLE)?;
        let value = serde_json::to_vec(availability)?;
        table.insert(availability.technician_id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_availability(
        &self,
        technician_id: &str,
    ) -> StorageResult<Option<TechnicianAvailability>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TECHNICIAN_STATUS_TABLE)?;
        match table.get(technician_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_availability_txn(
        &self,
        txn: &WriteTransaction,
        technician_id: &str,
    ) -> StorageResult<Option<TechnicianAvailability>> {
        let table = txn.open_table(TECHNICIAN_STATUS_TABLE)?;
        match table.get(technician_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Statistics ==========

    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let tickets = read_txn.open_table(TICKETS_TABLE)?;
        let jobs = read_txn.open_table(JOBS_TABLE)?;
        let timeline = read_txn.open_table(TIMELINE_TABLE)?;
        let offered = read_txn.open_table(OFFERED_JOBS_TABLE)?;

        Ok(StorageStats {
            ticket_count: tickets.len()?,
            job_count: jobs.len()?,
            timeline_event_count: timeline.len()?,
            open_offer_count: offered.len()?,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    pub ticket_count: u64,
    pub job_count: u64,
    pub timeline_event_count: u64,
    pub open_offer_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::job::{
        ActorRef, Availability, CustomerContact, DeviceDescriptor, JobStatus, TicketStatus,
        TimelineKind,
    };

    fn create_test_ticket(id: i64, customer: &str) -> Ticket {
        Ticket {
            id,
            customer_id: customer.to_string(),
            contact: CustomerContact {
                name: "Ana Cruz".to_string(),
                phone: "+63 900 000 0000".to_string(),
                email: None,
            },
            device: DeviceDescriptor {
                device_type: "refrigerator".to_string(),
                brand: "Frost".to_string(),
                model: None,
            },
            issue: "Not cooling".to_string(),
            address: "12 Mabini St".to_string(),
            address_resolved: true,
            coordinates: None,
            preferred_date: None,
            preferred_time: None,
            status: TicketStatus::PendingTriage,
            current_job_id: None,
            created_at: 1,
            updated_at: 1,
        }
    }

    fn create_test_job(id: i64, ticket_id: i64) -> Job {
        Job {
            id,
            ticket_id,
            technician: None,
            candidates: vec![],
            declined: vec![],
            status: JobStatus::Offered,
            suspended_from: None,
            on_hold_reason: None,
            checklist: vec![],
            checklist_template: vec![],
            last_position: None,
            offer_expires_at: 100,
            created_at: 1,
            updated_at: 1,
            last_sequence: 0,
        }
    }

    fn timeline_event(job_id: i64, sequence: u64, to: JobStatus) -> TimelineEvent {
        TimelineEvent {
            sequence,
            job_id,
            kind: TimelineKind::StatusChanged { from: None, to },
            status: to,
            actor: ActorRef::system(),
            timestamp: sequence as i64,
            note: None,
        }
    }

    #[test]
    fn test_store_and_get_ticket_and_job() {
        let storage = JobStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_ticket(&txn, &create_test_ticket(1, "cust-1")).unwrap();
        storage.store_job(&txn, &create_test_job(5, 1)).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_ticket(1).unwrap().unwrap().issue, "Not cooling");
        assert_eq!(storage.get_job(5).unwrap().unwrap().ticket_id, 1);
        assert!(storage.get_job(6).unwrap().is_none());
    }

    #[test]
    fn test_uncommitted_transaction_is_discarded() {
        let storage = JobStorage::open_in_memory().unwrap();
        {
            let txn = storage.begin_write().unwrap();
            storage.store_job(&txn, &create_test_job(5, 1)).unwrap();
            storage
                .append_timeline(&txn, &timeline_event(5, 1, JobStatus::Offered))
                .unwrap();
        }
        assert!(storage.get_job(5).unwrap().is_none());
        assert!(storage.get_timeline(5).unwrap().is_empty());
    }

    #[test]
    fn test_timeline_range_is_scoped_and_ordered() {
        let storage = JobStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .append_timeline(&txn, &timeline_event(2, 2, JobStatus::Accepted))
            .unwrap();
        storage
            .append_timeline(&txn, &timeline_event(2, 1, JobStatus::Offered))
            .unwrap();
        storage
            .append_timeline(&txn, &timeline_event(3, 1, JobStatus::Offered))
            .unwrap();
        txn.commit().unwrap();

        let events = storage.get_timeline(2).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[1].status, JobStatus::Accepted);
    }

    #[test]
    fn test_indexes() {
        let storage = JobStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.link_customer_ticket(&txn, "cust-1", 1).unwrap();
        storage.link_customer_ticket(&txn, "cust-1", 3).unwrap();
        storage.link_customer_ticket(&txn, "cust-10", 2).unwrap();
        storage.bind_technician_job(&txn, "tech-a", 7).unwrap();
        storage.bind_technician_job(&txn, "tech-a", 8).unwrap();
        storage.mark_offered(&txn, 9, 500).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_customer_ticket_ids("cust-1").unwrap(), vec![1, 3]);
        assert_eq!(storage.get_technician_job_ids("tech-a").unwrap(), vec![7, 8]);
        assert_eq!(storage.get_offered().unwrap(), vec![(9, 500)]);

        let txn = storage.begin_write().unwrap();
        storage.unbind_technician_job(&txn, "tech-a", 7).unwrap();
        storage.clear_offered(&txn, 9).unwrap();
        txn.commit().unwrap();
        assert_eq!(storage.get_technician_job_ids("tech-a").unwrap(), vec![8]);
        assert!(storage.get_offered().unwrap().is_empty());
    }

    #[test]
    fn test_availability_overwrites_per_technician() {
        let storage = JobStorage::open_in_memory().unwrap();
        assert!(storage.get_availability("tech-a").unwrap().is_none());

        let txn = storage.begin_write().unwrap();
        let mut record = TechnicianAvailability::unreported("tech-a");
        record.status = Availability::OffDuty;
        record.updated_at = 10;
        storage.store_availability(&txn, &record).unwrap();
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        record.status = Availability::OnDuty;
        record.updated_at = 20;
        storage.store_availability(&txn, &record).unwrap();
        assert_eq!(
            storage.get_availability_txn(&txn, "tech-a").unwrap().unwrap().updated_at,
            20
        );
        txn.commit().unwrap();

        let stored = storage.get_availability("tech-a").unwrap().unwrap();
        assert_eq!(stored.status, Availability::OnDuty);
        assert!(storage.get_availability("tech-b").unwrap().is_none());
    }

    #[test]
    fn test_next_id_increments() {
        let storage = JobStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_id(&txn, TICKET_ID_KEY).unwrap(), 1);
        assert_eq!(storage.next_id(&txn, TICKET_ID_KEY).unwrap(), 2);
        assert_eq!(storage.next_id(&txn, JOB_ID_KEY).unwrap(), 1);
        txn.commit().unwrap();
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.redb");
        {
            let storage = JobStorage::open(&path).unwrap();
            let txn = storage.begin_write().unwrap();
            storage.store_ticket(&txn, &create_test_ticket(4, "cust-1")).unwrap();
            txn.commit().unwrap();
        }
        let storage = JobStorage::open(&path).unwrap();
        assert!(storage.get_ticket(4).unwrap().is_some());
        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.ticket_count, 1);
    }
}
