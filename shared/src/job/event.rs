//! Job timeline and domain events

use super::status::JobStatus;
use super::types::{ActorRef, EtaRecord};
use serde::{Deserialize, Serialize};

/// Timeline event - immutable audit record appended by a successful mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEvent {
    /// Per-job sequence number, starting at 1
    pub sequence: u64,
    pub job_id: i64,
    pub kind: TimelineKind,
    /// Job status after the event
    pub status: JobStatus,
    pub actor: ActorRef,
    /// Server timestamp (Unix millis)
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TimelineEvent {
    pub fn is_status_change(&self) -> bool {
        matches!(self.kind, TimelineKind::StatusChanged { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineKind {
    /// `from` is `None` for the event that created the job
    StatusChanged {
        from: Option<JobStatus>,
        to: JobStatus,
    },
    ChecklistItemCompleted {
        item_id: u32,
    },
    ChecklistItemWaived {
        item_id: u32,
    },
    OfferDeclined {
        technician_id: String,
    },
}

/// Domain event published to subscribers (notifications, logging)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    StatusChanged {
        job_id: i64,
        ticket_id: i64,
        from: Option<JobStatus>,
        to: JobStatus,
        actor_id: String,
        at: i64,
    },
    ChecklistItemCompleted {
        job_id: i64,
        item_id: u32,
        at: i64,
    },
    EtaUpdated {
        job_id: i64,
        eta: EtaRecord,
    },
    NeedsManualEta {
        job_id: i64,
        at: i64,
    },
}

impl DomainEvent {
    pub fn job_id(&self) -> i64 {
        match self {
            DomainEvent::StatusChanged { job_id, .. }
            | DomainEvent::ChecklistItemCompleted { job_id, .. }
            | DomainEvent::EtaUpdated { job_id, .. }
            | DomainEvent::NeedsManualEta { job_id, .. } => *job_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::StatusChanged { .. } => "STATUS_CHANGED",
            DomainEvent::ChecklistItemCompleted { .. } => "CHECKLIST_ITEM_COMPLETED",
            DomainEvent::EtaUpdated { .. } => "ETA_UPDATED",
            DomainEvent::NeedsManualEta { .. } => "NEEDS_MANUAL_ETA",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_kind_tagging() {
        let kind = TimelineKind::StatusChanged {
            from: Some(JobStatus::Offered),
            to: JobStatus::Accepted,
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "STATUS_CHANGED");
        assert_eq!(json["from"], "offered");
        assert_eq!(json["to"], "accepted");
    }

    #[test]
    fn test_domain_event_job_id() {
        let event = DomainEvent::NeedsManualEta { job_id: 7, at: 1 };
        assert_eq!(event.job_id(), 7);
        assert_eq!(event.name(), "NEEDS_MANUAL_ETA");
    }
}
