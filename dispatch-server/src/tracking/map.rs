//! Operator map: every tracked technician with the job they are working

use crate::geo::PositionTracker;
use crate::jobs::{JobsManager, ManagerResult};
use serde::{Deserialize, Serialize};
use shared::job::{Availability, JobStatus, TechnicianPosition};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEntry {
    pub technician_id: String,
    /// Display name from the active job; absent when idle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub position: TechnicianPosition,
    pub availability: Availability,
    pub active_job: Option<MapJob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapJob {
    pub job_id: i64,
    pub ticket_id: i64,
    pub status: JobStatus,
}

/// Latest fix per technician joined with their most recently touched live job
pub fn technician_map(
    manager: &JobsManager,
    positions: &PositionTracker,
) -> ManagerResult<Vec<MapEntry>> {
    let mut entries = Vec::new();
    for (technician_id, position) in positions.all() {
        let availability = manager.get_availability(&technician_id)?.status;
        let active = manager
            .get_assigned_jobs(&technician_id)?
            .into_iter()
            .max_by_key(|job| (job.updated_at, job.id));

        let name = active
            .as_ref()
            .and_then(|job| job.technician.as_ref())
            .map(|technician| technician.name.clone());
        entries.push(MapEntry {
            technician_id,
            name,
            position,
            availability,
            active_job: active.map(|job| MapJob {
                job_id: job.id,
                ticket_id: job.ticket_id,
                status: job.status,
            }),
        });
    }
    Ok(entries)
}
