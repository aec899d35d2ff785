//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::JobNotFound
            | Self::TicketNotFound
            | Self::ChecklistItemNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::IllegalTransition
            | Self::AlreadyClaimed
            | Self::TicketHasActiveJob
            | Self::AddressLocked
            | Self::TechnicianOffDuty => StatusCode::CONFLICT,

            // 410 Gone
            Self::OfferExpired => StatusCode::GONE,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::PermissionDenied | Self::RoleRequired | Self::NotACandidate => {
                StatusCode::FORBIDDEN
            }

            // 422 Unprocessable (request understood, precondition not met)
            Self::ChecklistIncomplete
            | Self::HoldReasonRequired
            | Self::PositionOutOfRange
            | Self::PositionInFuture => StatusCode::UNPROCESSABLE_ENTITY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::GeolocationUnavailable
            | Self::GeolocationTimeout
            | Self::AddressResolutionFailed
            | Self::RoutingUnavailable
            | Self::RoutingTimeout
            | Self::SystemBusy => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError | Self::StorageError | Self::ConfigError | Self::Unknown => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::JobNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::TicketNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(ErrorCode::AlreadyClaimed.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::IllegalTransition.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::AddressLocked.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::TechnicianOffDuty.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(
            ErrorCode::TokenExpired.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::PermissionDenied.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ErrorCode::NotACandidate.http_status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_precondition_statuses() {
        assert_eq!(ErrorCode::OfferExpired.http_status(), StatusCode::GONE);
        assert_eq!(
            ErrorCode::ChecklistIncomplete.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_transient_statuses() {
        assert_eq!(
            ErrorCode::RoutingTimeout.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::GeolocationUnavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_bad_request_default() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InvalidRequest.http_status(),
            StatusCode::BAD_REQUEST
        );
    }
}
