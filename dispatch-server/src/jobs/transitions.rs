//! Capability matrix for job status transitions
//!
//! The edge set lives on [`JobStatus`]; this module decides *who* may take an
//! edge. Checks run in a fixed order: illegal edge first, then capability.
//! State-entry preconditions (checklist, hold reason) are checked by the
//! manager afterwards.

use super::actor::Actor;
use shared::job::{Job, JobStatus, Role};

/// Who may take an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// A candidate technician claiming an offer
    Candidate,
    /// The technician bound to the job
    AssignedTechnician,
    Operator,
    AssignedTechnicianOrOperator,
}

/// Why a transition was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Illegal { from: JobStatus, to: JobStatus },
    Unauthorized { required: Capability },
}

/// Capability required for `from -> to`, `None` if the edge does not exist
pub fn required_capability(job: &Job, to: JobStatus) -> Option<Capability> {
    let from = job.status;
    if !from.can_transition_to(to, job.suspended_from) {
        return None;
    }
    let capability = match (from, to) {
        (JobStatus::Offered, JobStatus::Accepted) => Capability::Candidate,
        (JobStatus::Offered, JobStatus::Expired | JobStatus::Rejected) => Capability::Operator,
        (_, JobStatus::Cancelled) => Capability::Operator,
        (JobStatus::Completed, JobStatus::Released) => Capability::Operator,
        (_, JobStatus::OnHold) | (JobStatus::OnHold, _) => {
            Capability::AssignedTechnicianOrOperator
        }
        _ => Capability::AssignedTechnician,
    };
    Some(capability)
}

fn holds(capability: Capability, job: &Job, actor: &Actor) -> bool {
    let assigned = actor.role == Role::Technician && job.is_assigned_to(&actor.id);
    match capability {
        Capability::Candidate => actor.role == Role::Technician,
        Capability::AssignedTechnician => assigned,
        Capability::Operator => actor.is_operator(),
        Capability::AssignedTechnicianOrOperator => assigned || actor.is_operator(),
    }
}

/// Validate edge and capability for `actor` moving `job` to `to`
pub fn authorize(job: &Job, to: JobStatus, actor: &Actor) -> Result<Capability, Denial> {
    let Some(required) = required_capability(job, to) else {
        return Err(Denial::Illegal {
            from: job.status,
            to,
        });
    };
    if !holds(required, job, actor) {
        return Err(Denial::Unauthorized { required });
    }
    Ok(required)
}
