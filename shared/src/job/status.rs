//! Job status enum and transition graph data

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Viewer / actor role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Technician,
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Technician => "technician",
            Role::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "technician" => Ok(Role::Technician),
            "operator" | "admin" => Ok(Role::Operator),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Job status
///
/// Field progression runs `offered` through `released`. `on_hold` suspends any
/// live state and returns to it; `cancelled`, `expired`, `rejected` and
/// `released` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Offered,
    Accepted,
    EnRoute,
    ComponentPickup,
    Arrived,
    Diagnosing,
    Quoted,
    SignedContract,
    Repairing,
    WaitingParts,
    QualityCheck,
    WaitingPayment,
    Completed,
    Released,
    Expired,
    Rejected,
    Cancelled,
    OnHold,
}

impl JobStatus {
    pub const ALL: [JobStatus; 18] = [
        JobStatus::Offered,
        JobStatus::Accepted,
        JobStatus::EnRoute,
        JobStatus::ComponentPickup,
        JobStatus::Arrived,
        JobStatus::Diagnosing,
        JobStatus::Quoted,
        JobStatus::SignedContract,
        JobStatus::Repairing,
        JobStatus::WaitingParts,
        JobStatus::QualityCheck,
        JobStatus::WaitingPayment,
        JobStatus::Completed,
        JobStatus::Released,
        JobStatus::Expired,
        JobStatus::Rejected,
        JobStatus::Cancelled,
        JobStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Offered => "offered",
            JobStatus::Accepted => "accepted",
            JobStatus::EnRoute => "en_route",
            JobStatus::ComponentPickup => "component_pickup",
            JobStatus::Arrived => "arrived",
            JobStatus::Diagnosing => "diagnosing",
            JobStatus::Quoted => "quoted",
            JobStatus::SignedContract => "signed_contract",
            JobStatus::Repairing => "repairing",
            JobStatus::WaitingParts => "waiting_parts",
            JobStatus::QualityCheck => "quality_check",
            JobStatus::WaitingPayment => "waiting_payment",
            JobStatus::Completed => "completed",
            JobStatus::Released => "released",
            JobStatus::Expired => "expired",
            JobStatus::Rejected => "rejected",
            JobStatus::Cancelled => "cancelled",
            JobStatus::OnHold => "on_hold",
        }
    }

    /// Forward edges of the progression graph
    ///
    /// Does not include the universal `cancelled` / `on_hold` edges nor the
    /// resume edge out of `on_hold`; see [`JobStatus::can_transition_to`].
    pub fn progression(&self) -> &'static [JobStatus] {
        use JobStatus::*;
        match self {
            Offered => &[Accepted, Expired, Rejected],
            Accepted => &[EnRoute, ComponentPickup],
            EnRoute => &[Arrived],
            ComponentPickup => &[Arrived],
            Arrived => &[Diagnosing],
            Diagnosing => &[Quoted, Repairing],
            Quoted => &[SignedContract],
            SignedContract => &[Repairing],
            Repairing => &[QualityCheck, WaitingParts],
            WaitingParts => &[Repairing],
            QualityCheck => &[WaitingPayment, Completed],
            WaitingPayment => &[Completed],
            Completed => &[Released],
            Released | Expired | Rejected | Cancelled | OnHold => &[],
        }
    }

    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Released | JobStatus::Cancelled | JobStatus::Expired | JobStatus::Rejected
        )
    }

    /// Job still occupies its ticket and technician
    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }

    /// Status accepts the universal `cancelled` and `on_hold` edges
    ///
    /// `completed` is excluded: the work is done and the job only moves on to
    /// `released`.
    pub fn is_interruptible(&self) -> bool {
        !self.is_terminal() && *self != JobStatus::Completed
    }

    /// Technician is travelling; position and ETA are tracked
    pub fn is_in_transit(&self) -> bool {
        matches!(self, JobStatus::EnRoute | JobStatus::ComponentPickup)
    }

    /// A technician has been bound to the job at some point
    pub fn is_claimed(&self) -> bool {
        !matches!(
            self,
            JobStatus::Offered | JobStatus::Expired | JobStatus::Rejected
        )
    }

    /// Snapshots no longer change once the job reaches this status
    pub fn ends_polling(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed
                | JobStatus::Released
                | JobStatus::Cancelled
                | JobStatus::Expired
                | JobStatus::Rejected
        )
    }

    /// Whether `target` is a legal edge from this status
    ///
    /// `suspended_from` is the status an `on_hold` job returns to on resume.
    pub fn can_transition_to(&self, target: JobStatus, suspended_from: Option<JobStatus>) -> bool {
        if *self == JobStatus::OnHold {
            return target == JobStatus::Cancelled || Some(target) == suspended_from;
        }
        if self.progression().contains(&target) {
            return true;
        }
        match target {
            JobStatus::Cancelled => self.is_interruptible(),
            // an unclaimed offer is dropped through expired/rejected, never held
            JobStatus::OnHold => self.is_interruptible() && *self != JobStatus::Offered,
            _ => false,
        }
    }

    /// Human label for the given viewer
    pub fn label(&self, viewer: Role) -> &'static str {
        use JobStatus::*;
        match viewer {
            Role::Customer => match self {
                Offered | Expired | Rejected => "Pending Review",
                Accepted => "Accepted",
                EnRoute => "On The Way",
                ComponentPickup => "Getting Parts",
                Arrived => "Arrived",
                Diagnosing => "Diagnosing",
                Quoted => "Quoted",
                SignedContract => "Contract Signed",
                Repairing => "Repairing",
                WaitingParts => "Waiting for Parts",
                QualityCheck => "Quality Check",
                WaitingPayment => "Awaiting Payment",
                Completed => "Completed",
                Released => "Released",
                Cancelled => "Cancelled",
                OnHold => "On Hold",
            },
            Role::Technician | Role::Operator => match self {
                Offered => "Offered",
                Accepted => "Accepted",
                EnRoute => "On My Way",
                ComponentPickup => "Component Pickup",
                Arrived => "Reached",
                Diagnosing => "Diagnosed",
                Quoted => "Quoted",
                SignedContract => "Signed Contract",
                Repairing => "Fixing",
                WaitingParts => "Waiting for Parts",
                QualityCheck => "Quality Check",
                WaitingPayment => "Waiting for Payment",
                Completed => "Completed",
                Released => "Released",
                Expired => "Expired",
                Rejected => "Rejected",
                Cancelled => "Cancelled",
                OnHold => "On Hold",
            },
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised status or role string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Ticket status, derived from its live job
///
/// Serialized as a flat string: `pending_triage` or the job status name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    PendingTriage,
    Job(JobStatus),
}

impl TicketStatus {
    /// Derive from the ticket's current job, if any
    ///
    /// A ticket whose last offer expired or was rejected is back in triage.
    pub fn derive(job_status: Option<JobStatus>) -> Self {
        match job_status {
            None | Some(JobStatus::Expired) | Some(JobStatus::Rejected) => {
                TicketStatus::PendingTriage
            }
            Some(status) => TicketStatus::Job(status),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::PendingTriage => "pending_triage",
            TicketStatus::Job(status) => status.as_str(),
        }
    }

    pub fn label(&self, viewer: Role) -> &'static str {
        match self {
            TicketStatus::PendingTriage => "Pending Review",
            TicketStatus::Job(status) => status.label(viewer),
        }
    }

    pub fn job_status(&self) -> Option<JobStatus> {
        match self {
            TicketStatus::PendingTriage => None,
            TicketStatus::Job(status) => Some(*status),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "pending_triage" {
            return Ok(TicketStatus::PendingTriage);
        }
        s.parse().map(TicketStatus::Job)
    }
}

impl Serialize for TicketStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TicketStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_is_closed() {
        for status in JobStatus::ALL {
            for target in status.progression() {
                assert!(JobStatus::ALL.contains(target));
            }
        }
    }

    #[test]
    fn test_only_declared_backward_edge() {
        // waiting_parts -> repairing is the single backward edge in the progression
        let order = |s: &JobStatus| JobStatus::ALL.iter().position(|x| x == s).unwrap();
        for status in JobStatus::ALL {
            for target in status.progression() {
                if order(target) < order(&status) {
                    assert_eq!((status, *target), (JobStatus::WaitingParts, JobStatus::Repairing));
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_edges() {
        for status in JobStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for target in JobStatus::ALL {
                assert!(!status.can_transition_to(target, None), "{status} -> {target}");
            }
        }
    }

    #[test]
    fn test_on_hold_returns_only_to_suspended_state() {
        let hold = JobStatus::OnHold;
        assert!(hold.can_transition_to(JobStatus::Repairing, Some(JobStatus::Repairing)));
        assert!(!hold.can_transition_to(JobStatus::QualityCheck, Some(JobStatus::Repairing)));
        assert!(hold.can_transition_to(JobStatus::Cancelled, Some(JobStatus::Repairing)));
        assert!(!hold.can_transition_to(JobStatus::OnHold, Some(JobStatus::Repairing)));
    }

    #[test]
    fn test_universal_edges() {
        assert!(JobStatus::Diagnosing.can_transition_to(JobStatus::OnHold, None));
        assert!(JobStatus::Offered.can_transition_to(JobStatus::Cancelled, None));
        assert!(!JobStatus::Offered.can_transition_to(JobStatus::OnHold, None));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Cancelled, None));
        assert!(JobStatus::Completed.can_transition_to(JobStatus::Released, None));
    }

    #[test]
    fn test_completed_only_releases() {
        let completed = JobStatus::Completed;
        assert!(!completed.is_interruptible());
        assert!(!completed.is_terminal());
        assert!(!completed.can_transition_to(JobStatus::Cancelled, None));
        assert!(!completed.can_transition_to(JobStatus::OnHold, None));
        assert!(completed.can_transition_to(JobStatus::Released, None));

        let edges: Vec<JobStatus> = JobStatus::ALL
            .into_iter()
            .filter(|target| completed.can_transition_to(*target, None))
            .collect();
        assert_eq!(edges, vec![JobStatus::Released]);
    }

    #[test]
    fn test_en_route_cannot_skip_to_completed() {
        assert!(!JobStatus::EnRoute.can_transition_to(JobStatus::Completed, None));
        assert!(JobStatus::EnRoute.can_transition_to(JobStatus::Arrived, None));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("teleporting".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_ticket_status_derivation_and_serde() {
        assert_eq!(TicketStatus::derive(None), TicketStatus::PendingTriage);
        assert_eq!(
            TicketStatus::derive(Some(JobStatus::Expired)),
            TicketStatus::PendingTriage
        );
        let status = TicketStatus::derive(Some(JobStatus::EnRoute));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"en_route\"");
        let parsed: TicketStatus = serde_json::from_str("\"pending_triage\"").unwrap();
        assert_eq!(parsed, TicketStatus::PendingTriage);
    }

    #[test]
    fn test_labels_per_viewer() {
        assert_eq!(JobStatus::EnRoute.label(Role::Customer), "On The Way");
        assert_eq!(JobStatus::EnRoute.label(Role::Technician), "On My Way");
        assert_eq!(JobStatus::Arrived.label(Role::Technician), "Reached");
        assert_eq!(TicketStatus::PendingTriage.label(Role::Customer), "Pending Review");
    }
}
