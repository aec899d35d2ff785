use crate::core::config::TrackingConfig;
use shared::job::TicketStatus;

/// Recommended client poll interval; `None` once nothing will change
pub fn recommended_poll_interval(status: TicketStatus, config: &TrackingConfig) -> Option<u64> {
    match status.job_status() {
        Some(job_status) if job_status.ends_polling() => None,
        Some(job_status) if job_status.is_in_transit() => Some(config.active_poll_interval_ms),
        _ => Some(config.idle_poll_interval_ms),
    }
}
