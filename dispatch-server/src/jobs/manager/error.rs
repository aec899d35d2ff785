use super::super::storage::StorageError;
use super::super::transitions::{Capability, Denial};
use shared::error::{AppError, ErrorCode};
use shared::job::JobStatus;
use thiserror::Error;

/// Manager errors
///
/// Every variant is returned before the write transaction commits, so a
/// failed operation never leaves a partial job update or timeline event.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Ticket not found: {0}")]
    TicketNotFound(i64),

    #[error("Checklist item {item_id} not found on job {job_id}")]
    ChecklistItemNotFound { job_id: i64, item_id: u32 },

    #[error("Illegal transition: {from} -> {to}")]
    IllegalTransition { from: JobStatus, to: JobStatus },

    #[error("Job already claimed: {0}")]
    AlreadyClaimed(i64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Technician is not a candidate for job {0}")]
    NotACandidate(i64),

    #[error("Offer expired for job {0}")]
    OfferExpired(i64),

    #[error("Checklist items still open: {0:?}")]
    ChecklistIncomplete(Vec<u32>),

    #[error("On-hold reason is required")]
    HoldReasonRequired,

    #[error("Ticket {ticket_id} already has active job {job_id}")]
    TicketHasActiveJob { ticket_id: i64, job_id: i64 },

    #[error("Technician {0} is off duty")]
    TechnicianOffDuty(String),

    #[error("Address is locked for ticket {0}")]
    AddressLocked(i64),

    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl From<Denial> for ManagerError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Illegal { from, to } => ManagerError::IllegalTransition { from, to },
            Denial::Unauthorized { required } => {
                let who = match required {
                    Capability::Candidate => "a candidate technician",
                    Capability::AssignedTechnician => "the assigned technician",
                    Capability::Operator => "an operator",
                    Capability::AssignedTechnicianOrOperator => {
                        "the assigned technician or an operator"
                    }
                };
                ManagerError::Unauthorized(format!("Only {} may perform this transition", who))
            }
        }
    }
}

/// Map storage failures to an error code (clients localize by code)
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    match e {
        StorageError::Serialization(_) => ErrorCode::InternalError,
        StorageError::Transaction(_) => ErrorCode::SystemBusy,
        _ => ErrorCode::StorageError,
    }
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = %code, "Storage error occurred");
                AppError::with_message(code, e.to_string())
            }
            ManagerError::JobNotFound(id) => {
                AppError::new(ErrorCode::JobNotFound).with_detail("job_id", id)
            }
            ManagerError::TicketNotFound(id) => {
                AppError::new(ErrorCode::TicketNotFound).with_detail("ticket_id", id)
            }
            ManagerError::ChecklistItemNotFound { job_id, item_id } => {
                AppError::new(ErrorCode::ChecklistItemNotFound)
                    .with_detail("job_id", job_id)
                    .with_detail("item_id", item_id)
            }
            ManagerError::IllegalTransition { from, to } => {
                AppError::illegal_transition(from.as_str(), to.as_str())
            }
            ManagerError::AlreadyClaimed(id) => {
                AppError::new(ErrorCode::AlreadyClaimed).with_detail("job_id", id)
            }
            ManagerError::Unauthorized(msg) => AppError::permission_denied(msg),
            ManagerError::NotACandidate(id) => {
                AppError::new(ErrorCode::NotACandidate).with_detail("job_id", id)
            }
            ManagerError::OfferExpired(id) => {
                AppError::new(ErrorCode::OfferExpired).with_detail("job_id", id)
            }
            ManagerError::ChecklistIncomplete(open) => {
                AppError::new(ErrorCode::ChecklistIncomplete).with_detail("open_items", open)
            }
            ManagerError::HoldReasonRequired => AppError::new(ErrorCode::HoldReasonRequired),
            ManagerError::TicketHasActiveJob { ticket_id, job_id } => {
                AppError::new(ErrorCode::TicketHasActiveJob)
                    .with_detail("ticket_id", ticket_id)
                    .with_detail("job_id", job_id)
            }
            ManagerError::AddressLocked(id) => {
                AppError::new(ErrorCode::AddressLocked).with_detail("ticket_id", id)
            }
            ManagerError::TechnicianOffDuty(id) => {
                AppError::new(ErrorCode::TechnicianOffDuty).with_detail("technician_id", id)
            }
            ManagerError::Invalid(msg) => AppError::validation(msg),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
