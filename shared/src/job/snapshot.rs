//! Tracking snapshot - the role-filtered view served to clients
//!
//! Every field gated by the disclosure policy is optional and omitted from the
//! JSON when hidden. `generatedAt` lets a consumer detect staleness on its own.

use super::status::{JobStatus, Role, TicketStatus};
use super::types::{
    ArrivalWindow, ChecklistItem, Coordinates, EtaSource, TechnicianPosition,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSnapshot {
    pub ticket_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<i64>,
    pub status: TicketStatus,
    pub status_label: String,
    /// Present only while fresh and the job is in transit
    pub eta: Option<EtaView>,
    /// True while in transit without a usable estimate ("calculating")
    #[serde(default)]
    pub eta_pending: bool,
    #[serde(default)]
    pub needs_manual_eta: bool,
    pub technician: Option<TechnicianView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<TechnicianPosition>,
    /// Status changes, oldest first
    pub timeline: Vec<TimelineEntry>,
    /// `None` once the job can no longer change
    pub recommended_poll_interval_ms: Option<u64>,
    pub generated_at: i64,
    pub ticket: TicketView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<ChecklistItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_hold_reason: Option<String>,
    pub viewer_role: Role,
}

/// Estimate as rendered; derived from the arrival window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EtaView {
    pub source: EtaSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// e.g. "About 12 min", "Arriving now"
    pub eta_text: String,
    pub arrival_window: ArrivalWindow,
    /// e.g. "14:05 - 14:15" in the configured timezone
    pub window_label: String,
    pub computed_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl TechnicianView {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.phone.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub sequence: u64,
    pub status: JobStatus,
    pub status_label: String,
    pub actor_role: Role,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
