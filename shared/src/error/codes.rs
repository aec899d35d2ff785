//! Unified error codes for the dispatch engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Job / ticket lifecycle errors
//! - 5xxx: Geolocation and ETA errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Actor lacks the capability for the operation
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Technician is not among the offer's candidates
    NotACandidate = 2003,

    // ==================== 4xxx: Job ====================
    /// Job not found
    JobNotFound = 4001,
    /// Ticket not found
    TicketNotFound = 4002,
    /// Checklist item not found
    ChecklistItemNotFound = 4003,
    /// Requested status is not a legal edge from the current status
    IllegalTransition = 4004,
    /// Offer already claimed by another technician
    AlreadyClaimed = 4005,
    /// Offer passed its time-to-live
    OfferExpired = 4006,
    /// Checklist has items that are neither completed nor waived
    ChecklistIncomplete = 4007,
    /// Putting a job on hold requires a reason
    HoldReasonRequired = 4008,
    /// Ticket already has a live job
    TicketHasActiveJob = 4009,
    /// Address can no longer be corrected
    AddressLocked = 4010,
    /// Technician is off duty and cannot take offers
    TechnicianOffDuty = 4011,

    // ==================== 5xxx: Geolocation / ETA ====================
    /// Device position could not be acquired
    GeolocationUnavailable = 5001,
    /// Device position acquisition timed out
    GeolocationTimeout = 5002,
    /// Coordinates could not be resolved to an address
    AddressResolutionFailed = 5003,
    /// Routing/distance service unavailable
    RoutingUnavailable = 5004,
    /// Routing/distance service timed out
    RoutingTimeout = 5005,
    /// Latitude or longitude outside the valid range
    PositionOutOfRange = 5006,
    /// Position fix captured in the future
    PositionInFuture = 5007,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Storage error
    StorageError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// System busy, retry later
    SystemBusy = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "A different role is required",
            ErrorCode::NotACandidate => "Technician is not a candidate for this job",

            // Job
            ErrorCode::JobNotFound => "Job not found",
            ErrorCode::TicketNotFound => "Ticket not found",
            ErrorCode::ChecklistItemNotFound => "Checklist item not found",
            ErrorCode::IllegalTransition => "Status transition is not allowed",
            ErrorCode::AlreadyClaimed => "Job has already been claimed",
            ErrorCode::OfferExpired => "Job offer has expired",
            ErrorCode::ChecklistIncomplete => "Checklist items are still open",
            ErrorCode::HoldReasonRequired => "A reason is required to put a job on hold",
            ErrorCode::TicketHasActiveJob => "Ticket already has an active job",
            ErrorCode::AddressLocked => "Address can no longer be changed",
            ErrorCode::TechnicianOffDuty => "Technician is off duty",

            // Geolocation / ETA
            ErrorCode::GeolocationUnavailable => "Location is unavailable",
            ErrorCode::GeolocationTimeout => "Location request timed out",
            ErrorCode::AddressResolutionFailed => "Address could not be resolved",
            ErrorCode::RoutingUnavailable => "Routing service is unavailable",
            ErrorCode::RoutingTimeout => "Routing service timed out",
            ErrorCode::PositionOutOfRange => "Coordinates are out of range",
            ErrorCode::PositionInFuture => "Position timestamp is in the future",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Storage error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::SystemBusy => "System busy, please retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::NotACandidate),

            // Job
            4001 => Ok(ErrorCode::JobNotFound),
            4002 => Ok(ErrorCode::TicketNotFound),
            4003 => Ok(ErrorCode::ChecklistItemNotFound),
            4004 => Ok(ErrorCode::IllegalTransition),
            4005 => Ok(ErrorCode::AlreadyClaimed),
            4006 => Ok(ErrorCode::OfferExpired),
            4007 => Ok(ErrorCode::ChecklistIncomplete),
            4008 => Ok(ErrorCode::HoldReasonRequired),
            4009 => Ok(ErrorCode::TicketHasActiveJob),
            4010 => Ok(ErrorCode::AddressLocked),
            4011 => Ok(ErrorCode::TechnicianOffDuty),

            // Geolocation / ETA
            5001 => Ok(ErrorCode::GeolocationUnavailable),
            5002 => Ok(ErrorCode::GeolocationTimeout),
            5003 => Ok(ErrorCode::AddressResolutionFailed),
            5004 => Ok(ErrorCode::RoutingUnavailable),
            5005 => Ok(ErrorCode::RoutingTimeout),
            5006 => Ok(ErrorCode::PositionOutOfRange),
            5007 => Ok(ErrorCode::PositionInFuture),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::StorageError),
            9003 => Ok(ErrorCode::ConfigError),
            9004 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
