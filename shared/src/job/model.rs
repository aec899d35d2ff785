//! Ticket and job records

use super::status::{JobStatus, TicketStatus};
use super::types::{
    ChecklistItem, Coordinates, CustomerContact, DeviceDescriptor, TechnicianPosition,
    TechnicianRef,
};
use serde::{Deserialize, Serialize};

/// Customer service request
///
/// Immutable after submission except for the derived status and address
/// correction. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: i64,
    /// Owning customer (auth subject)
    pub customer_id: String,
    pub contact: CustomerContact,
    pub device: DeviceDescriptor,
    pub issue: String,
    /// Service address; the coordinate fallback when geocoding failed
    pub address: String,
    /// False when `address` is a coordinate fallback rather than a resolved address
    #[serde(default = "default_true")]
    pub address_resolved: bool,
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<String>,
    pub status: TicketStatus,
    /// Most recent job (live or not)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_job_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

/// Operational unit bound to one technician for one ticket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: i64,
    pub ticket_id: i64,
    /// Bound technician; `None` while offered
    pub technician: Option<TechnicianRef>,
    /// Technicians the offer is visible to; empty means open to all
    #[serde(default)]
    pub candidates: Vec<String>,
    /// Candidates that declined the offer
    #[serde(default)]
    pub declined: Vec<String>,
    pub status: JobStatus,
    /// Status to resume to when `on_hold`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended_from: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_hold_reason: Option<String>,
    /// Seeded when the job enters `diagnosing`
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    /// Step names used to seed the checklist
    #[serde(default)]
    pub checklist_template: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_position: Option<TechnicianPosition>,
    /// Offer deadline (Unix millis)
    pub offer_expires_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
    /// Sequence number of the latest timeline event
    #[serde(default)]
    pub last_sequence: u64,
}

impl Job {
    pub fn is_assigned_to(&self, technician_id: &str) -> bool {
        self.technician
            .as_ref()
            .is_some_and(|tech| tech.id == technician_id)
    }

    /// Technician may see and claim this offer
    pub fn is_candidate(&self, technician_id: &str) -> bool {
        if self.declined.iter().any(|id| id == technician_id) {
            return false;
        }
        self.candidates.is_empty() || self.candidates.iter().any(|id| id == technician_id)
    }

    /// Some candidate has not yet declined (open offers always have one)
    pub fn has_remaining_candidates(&self) -> bool {
        self.candidates.is_empty()
            || self
                .candidates
                .iter()
                .any(|id| !self.declined.contains(id))
    }

    pub fn offer_expired(&self, now: i64) -> bool {
        now >= self.offer_expires_at
    }

    pub fn checklist_item(&self, item_id: u32) -> Option<&ChecklistItem> {
        self.checklist.iter().find(|item| item.id == item_id)
    }

    /// Items that are neither completed nor waived
    pub fn open_checklist_items(&self) -> Vec<u32> {
        self.checklist
            .iter()
            .filter(|item| !item.is_settled())
            .map(|item| item.id)
            .collect()
    }

    pub fn seed_checklist(&mut self) {
        if !self.checklist.is_empty() {
            return;
        }
        self.checklist = self
            .checklist_template
            .iter()
            .enumerate()
            .map(|(idx, name)| ChecklistItem::new(idx as u32 + 1, name.clone()))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offered(candidates: &[&str]) -> Job {
        Job {
            id: 1,
            ticket_id: 10,
            technician: None,
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
            declined: vec![],
            status: JobStatus::Offered,
            suspended_from: None,
            on_hold_reason: None,
            checklist: vec![],
            checklist_template: vec!["Inspect".into(), "Test run".into()],
            last_position: None,
            offer_expires_at: 1_000,
            created_at: 0,
            updated_at: 0,
            last_sequence: 0,
        }
    }

    #[test]
    fn test_open_offer_visible_to_everyone_until_declined() {
        let mut job = offered(&[]);
        assert!(job.is_candidate("tech-9"));
        job.declined.push("tech-9".into());
        assert!(!job.is_candidate("tech-9"));
        assert!(job.has_remaining_candidates());
    }

    #[test]
    fn test_targeted_offer_candidates() {
        let mut job = offered(&["a", "b"]);
        assert!(job.is_candidate("a"));
        assert!(!job.is_candidate("c"));
        job.declined = vec!["a".into(), "b".into()];
        assert!(!job.has_remaining_candidates());
    }

    #[test]
    fn test_seed_checklist_once() {
        let mut job = offered(&[]);
        job.seed_checklist();
        assert_eq!(job.checklist.len(), 2);
        assert_eq!(job.checklist[1].id, 2);
        job.checklist[0].completed = true;
        job.seed_checklist();
        assert!(job.checklist[0].completed);
        assert_eq!(job.open_checklist_items(), vec![2]);
    }

    #[test]
    fn test_offer_expiry_boundary() {
        let job = offered(&[]);
        assert!(!job.offer_expired(999));
        assert!(job.offer_expired(1_000));
    }
}
