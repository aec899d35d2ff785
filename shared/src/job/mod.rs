//! Job lifecycle types
//!
//! - Status: job/ticket status enums and the transition graph
//! - Model: ticket and job records
//! - Events: timeline entries and domain events
//! - Snapshot: the tracking view served to clients

pub mod event;
pub mod model;
pub mod snapshot;
pub mod status;
pub mod types;

// Re-exports
pub use event::{DomainEvent, TimelineEvent, TimelineKind};
pub use model::{Job, Ticket};
pub use snapshot::{EtaView, TechnicianView, TicketView, TimelineEntry, TrackingSnapshot};
pub use status::{JobStatus, Role, TicketStatus, UnknownStatus};
pub use types::*;
