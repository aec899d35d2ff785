//! Progressive disclosure
//!
//! Pure function of (job status, viewer) to the set of fields the viewer may
//! see. Evaluated on every snapshot; nothing is cached across transitions.
//!
//! ## Rules
//! - Operators see everything
//! - Technicians see a teaser (device type, brand, issue) while an offer is
//!   open to them; contact details and address only once they hold the job
//! - Customers see their own ticket, the bound technician once the job is
//!   claimed, never the candidate list, and live position / ETA only while
//!   the technician is travelling

use crate::jobs::Actor;
use serde::Serialize;
use shared::job::{Job, JobStatus, Role, Ticket};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    DeviceType,
    Brand,
    Model,
    Issue,
    Address,
    Coordinates,
    PreferredSchedule,
    CustomerName,
    CustomerPhone,
    CustomerEmail,
    TechnicianId,
    TechnicianName,
    TechnicianPhone,
    Position,
    Eta,
    Checklist,
    OnHoldReason,
    Timeline,
}

/// Viewer relative to one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    /// The customer who owns the ticket
    Customer,
    /// The technician bound to the job
    AssignedTechnician,
    /// Any other technician (candidate while offered)
    Technician,
    Operator,
}

impl Viewer {
    /// Classify `actor` for `ticket` / `job`; `None` when the actor has no
    /// standing on the ticket at all
    pub fn of(actor: &Actor, ticket: &Ticket, job: Option<&Job>) -> Option<Viewer> {
        match actor.role {
            Role::Operator => Some(Viewer::Operator),
            Role::Customer => (ticket.customer_id == actor.id).then_some(Viewer::Customer),
            Role::Technician => {
                let job = job?;
                if job.is_assigned_to(&actor.id) {
                    Some(Viewer::AssignedTechnician)
                } else if job.status == JobStatus::Offered && job.is_candidate(&actor.id) {
                    Some(Viewer::Technician)
                } else {
                    None
                }
            }
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Viewer::Customer => Role::Customer,
            Viewer::AssignedTechnician | Viewer::Technician => Role::Technician,
            Viewer::Operator => Role::Operator,
        }
    }
}

const TICKET_FIELDS: &[Field] = &[
    Field::DeviceType,
    Field::Brand,
    Field::Model,
    Field::Issue,
    Field::Address,
    Field::Coordinates,
    Field::PreferredSchedule,
    Field::CustomerName,
    Field::CustomerPhone,
    Field::CustomerEmail,
];

/// What an unclaimed offer reveals to a technician
const OFFER_TEASER: &[Field] = &[Field::DeviceType, Field::Brand, Field::Issue];

const TECHNICIAN_IDENTITY: &[Field] = &[
    Field::TechnicianId,
    Field::TechnicianName,
    Field::TechnicianPhone,
];

const JOB_PROGRESS: &[Field] = &[Field::Checklist, Field::OnHoldReason, Field::Timeline];

const LIVE_TRACKING: &[Field] = &[Field::Position, Field::Eta];

/// Fields `viewer` may see while the job is in `status`
///
/// `None` is a ticket without a job (pending triage).
pub fn visible_fields(status: Option<JobStatus>, viewer: Viewer) -> BTreeSet<Field> {
    let mut fields = BTreeSet::new();
    match viewer {
        Viewer::Operator => {
            fields.extend(TICKET_FIELDS);
            fields.extend(TECHNICIAN_IDENTITY);
            fields.extend(JOB_PROGRESS);
            fields.extend(LIVE_TRACKING);
        }
        Viewer::Customer => {
            fields.extend(TICKET_FIELDS);
            let Some(status) = status else {
                return fields;
            };
            fields.insert(Field::Timeline);
            if status.is_claimed() {
                fields.extend(TECHNICIAN_IDENTITY);
                fields.extend(JOB_PROGRESS);
            }
            if status.is_in_transit() {
                fields.extend(LIVE_TRACKING);
            }
        }
        Viewer::AssignedTechnician => match status {
            Some(status) if status.is_claimed() => {
                fields.extend(TICKET_FIELDS);
                fields.extend(TECHNICIAN_IDENTITY);
                fields.extend(JOB_PROGRESS);
                if status.is_in_transit() {
                    fields.extend(LIVE_TRACKING);
                }
            }
            _ => fields.extend(OFFER_TEASER),
        },
        Viewer::Technician => {
            if status == Some(JobStatus::Offered) {
                fields.extend(OFFER_TEASER);
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE: &[Field] = &[
        Field::CustomerName,
        Field::CustomerPhone,
        Field::CustomerEmail,
        Field::Address,
        Field::Coordinates,
    ];

    #[test]
    fn test_offer_hides_customer_identity_from_technicians() {
        for viewer in [Viewer::Technician, Viewer::AssignedTechnician] {
            let fields = visible_fields(Some(JobStatus::Offered), viewer);
            for field in PRIVATE {
                assert!(!fields.contains(field), "{:?} leaked to {:?}", field, viewer);
            }
            assert!(fields.contains(&Field::DeviceType));
            assert!(fields.contains(&Field::Brand));
            assert!(fields.contains(&Field::Issue));
        }
    }

    #[test]
    fn test_assigned_technician_sees_contact_once_claimed() {
        for status in JobStatus::ALL {
            if !status.is_claimed() {
                continue;
            }
            let fields = visible_fields(Some(status), Viewer::AssignedTechnician);
            for field in PRIVATE {
                assert!(fields.contains(field), "{:?} hidden at {}", field, status);
            }
            // other technicians never do
            assert!(visible_fields(Some(status), Viewer::Technician).is_empty());
        }
    }

    #[test]
    fn test_customer_sees_technician_only_after_claim() {
        let offered = visible_fields(Some(JobStatus::Offered), Viewer::Customer);
        assert!(!offered.contains(&Field::TechnicianName));
        assert!(offered.contains(&Field::Timeline));

        let accepted = visible_fields(Some(JobStatus::Accepted), Viewer::Customer);
        assert!(accepted.contains(&Field::TechnicianName));
        assert!(accepted.contains(&Field::TechnicianPhone));

        let triage = visible_fields(None, Viewer::Customer);
        assert!(!triage.contains(&Field::Timeline));
        assert!(triage.contains(&Field::Address));
    }

    #[test]
    fn test_position_only_while_in_transit() {
        for status in JobStatus::ALL {
            for viewer in [Viewer::Customer, Viewer::AssignedTechnician] {
                let fields = visible_fields(Some(status), viewer);
                assert_eq!(
                    fields.contains(&Field::Position),
                    status.is_in_transit(),
                    "{} / {:?}",
                    status,
                    viewer
                );
            }
        }
    }

    #[test]
    fn test_operator_sees_everything() {
        let all = visible_fields(Some(JobStatus::Repairing), Viewer::Operator);
        assert!(all.contains(&Field::CustomerPhone));
        assert!(all.contains(&Field::Checklist));
        assert_eq!(visible_fields(None, Viewer::Operator).len(), all.len());
    }
}
