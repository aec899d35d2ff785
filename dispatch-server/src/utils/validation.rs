//! Input validation helpers
//!
//! Text limits shared by request DTOs (`#[validate(length(max = ...))]`) and
//! the mapping from `validator` errors to [`AppError`].

use crate::utils::AppError;
use validator::{Validate, ValidationErrors};

/// Names: customer, technician, device brand / model
pub const MAX_NAME_LEN: usize = 200;

/// Notes and reasons (hold reason, decline reason, waiver reason)
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: phone, device type
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Issue descriptions
pub const MAX_ISSUE_LEN: usize = 2000;

/// Service addresses
pub const MAX_ADDRESS_LEN: usize = 500;

/// Run derive-based validation, reporting every failing field
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(validation_error)
}

fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let reason = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| {
                    errs.first()
                        .map(|e| e.code.to_string())
                        .unwrap_or_else(|| "invalid".to_string())
                });
            format!("{field}: {reason}")
        })
        .collect();
    fields.sort();
    AppError::validation(fields.join("; "))
}

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value {
        if v.len() > max_len {
            return Err(AppError::validation(format!(
                "{field} is too long ({} chars, max {max_len})",
                v.len()
            )));
        }
    }
    Ok(())
}

/// Preferred service date, `YYYY-MM-DD`
pub fn validate_preferred_date(value: &Option<String>) -> Result<(), AppError> {
    if let Some(date) = value {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AppError::validation(format!("Invalid preferred_date: {}", date)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, max = 5))]
        name: String,
        #[validate(range(min = 1, max = 10))]
        count: u32,
    }

    #[test]
    fn test_validate_payload_lists_fields() {
        let err = validate_payload(&Probe {
            name: String::new(),
            count: 11,
        })
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message.contains("count"));
        assert!(err.message.contains("name"));

        assert!(
            validate_payload(&Probe {
                name: "ok".into(),
                count: 3
            })
            .is_ok()
        );
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("  ", "issue", 10).is_err());
        assert!(validate_required_text("abcdefghijk", "issue", 10).is_err());
        assert!(validate_required_text("fan", "issue", 10).is_ok());
    }

    #[test]
    fn test_preferred_date() {
        assert!(validate_preferred_date(&None).is_ok());
        assert!(validate_preferred_date(&Some("2026-03-01".into())).is_ok());
        assert!(validate_preferred_date(&Some("01/03/2026".into())).is_err());
    }
}
