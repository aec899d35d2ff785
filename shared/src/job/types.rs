//! Value types shared by tickets, jobs and the tracking snapshot

use super::status::Role;
use serde::{Deserialize, Serialize};

// ============================================================================
// Location
// ============================================================================

/// WGS84 coordinate pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Address string used when reverse geocoding fails
    pub fn fallback_address(&self) -> String {
        format!("{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Last known technician fix
///
/// Overwritten on every update, monotonic by `captured_at`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianPosition {
    pub lat: f64,
    pub lng: f64,
    /// Device capture time (Unix millis)
    pub captured_at: i64,
}

impl TechnicianPosition {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

/// Technician duty status
///
/// Off-duty technicians receive no offers and cannot claim; jobs they already
/// hold are unaffected.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Technicians who never reported a status count as on duty
    #[default]
    OnDuty,
    OffDuty,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::OnDuty => "on_duty",
            Availability::OffDuty => "off_duty",
        }
    }

    pub fn is_on_duty(&self) -> bool {
        *self == Availability::OnDuty
    }
}

/// Stored duty status of one technician
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianAvailability {
    pub technician_id: String,
    pub status: Availability,
    /// Unix millis of the last change; 0 when never reported
    pub updated_at: i64,
}

impl TechnicianAvailability {
    /// Status for a technician with no stored record
    pub fn unreported(technician_id: impl Into<String>) -> Self {
        Self {
            technician_id: technician_id.into(),
            status: Availability::OnDuty,
            updated_at: 0,
        }
    }
}

// ============================================================================
// Ticket parts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// e.g. "washing_machine", "laptop"
    pub device_type: String,
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerContact {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// ============================================================================
// Job parts
// ============================================================================

/// Technician bound to a job (snapshot taken at claim time)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TechnicianRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Ordered repair / inspection step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    /// 1-based position within the job's checklist
    pub id: u32,
    pub name: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub waived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waive_reason: Option<String>,
}

impl ChecklistItem {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            completed: false,
            completed_at: None,
            waived: false,
            waive_reason: None,
        }
    }

    /// Completed or explicitly waived
    pub fn is_settled(&self) -> bool {
        self.completed || self.waived
    }
}

/// Who performed an operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActorRef {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl ActorRef {
    pub const SYSTEM_ID: &'static str = "system";

    /// Operator identity used by background tasks (offer expiry)
    pub fn system() -> Self {
        Self {
            id: Self::SYSTEM_ID.to_string(),
            name: "System".to_string(),
            role: Role::Operator,
        }
    }
}

// ============================================================================
// ETA
// ============================================================================

/// How an estimate was produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EtaSource {
    /// Routing service from the technician's last fix
    Computed,
    /// Minute count entered by the technician
    Manual,
}

/// Arrival time range (Unix millis), the canonical estimate form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalWindow {
    pub earliest_at: i64,
    pub latest_at: i64,
}

impl ArrivalWindow {
    /// Midpoint of the window
    pub fn center(&self) -> i64 {
        self.earliest_at + self.latest_at.saturating_sub(self.earliest_at) / 2
    }

    /// Whole minutes from `now` to the window midpoint (never negative)
    pub fn minutes_until(&self, now: i64) -> i64 {
        self.center().saturating_sub(now).max(0).saturating_add(30_000) / 60_000
    }
}

/// Derived, time-bounded arrival estimate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EtaRecord {
    pub source: EtaSource,
    /// Route distance in metres (computed estimates only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    pub window: ArrivalWindow,
    pub computed_at: i64,
    /// `captured_at` of the position the estimate was derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_captured_at: Option<i64>,
    /// Position the estimate was derived from (displacement checks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Coordinates>,
}

impl EtaRecord {
    pub fn age(&self, now: i64) -> i64 {
        now - self.computed_at
    }
}
