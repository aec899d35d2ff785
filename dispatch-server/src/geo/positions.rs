//! Live technician positions
//!
//! One entry per technician, overwritten on every accepted fix. Updates whose
//! `captured_at` is not newer than the stored one are dropped.

use super::GeoError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::job::{Coordinates, TechnicianPosition};

/// Fixes stamped further ahead of the server clock are rejected
pub const MAX_CLOCK_SKEW_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionUpdate {
    Applied(TechnicianPosition),
    /// Older than (or as old as) the stored fix
    Stale { stored_captured_at: i64 },
}

impl PositionUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, PositionUpdate::Applied(_))
    }
}

#[derive(Debug, Default)]
pub struct PositionTracker {
    positions: DashMap<String, TechnicianPosition>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fix for `technician_id`
    pub fn update(
        &self,
        technician_id: &str,
        position: TechnicianPosition,
        now: i64,
    ) -> Result<PositionUpdate, GeoError> {
        if !Coordinates::new(position.lat, position.lng).is_valid() {
            return Err(GeoError::OutOfRange {
                lat: position.lat,
                lng: position.lng,
            });
        }
        if position.captured_at > now + MAX_CLOCK_SKEW_MS {
            return Err(GeoError::InFuture {
                captured_at: position.captured_at,
                now,
            });
        }

        match self.positions.entry(technician_id.to_string()) {
            Entry::Occupied(mut stored) => {
                let stored_captured_at = stored.get().captured_at;
                if position.captured_at <= stored_captured_at {
                    tracing::debug!(
                        technician_id,
                        captured_at = position.captured_at,
                        stored_captured_at,
                        "Out-of-order position discarded"
                    );
                    return Ok(PositionUpdate::Stale { stored_captured_at });
                }
                stored.insert(position);
            }
            Entry::Vacant(slot) => {
                slot.insert(position);
            }
        }
        Ok(PositionUpdate::Applied(position))
    }

    pub fn get(&self, technician_id: &str) -> Option<TechnicianPosition> {
        self.positions.get(technician_id).map(|entry| *entry.value())
    }

    /// Every stored fix, ordered by technician id
    pub fn all(&self) -> Vec<(String, TechnicianPosition)> {
        let mut positions: Vec<(String, TechnicianPosition)> = self
            .positions
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        positions.sort_by(|a, b| a.0.cmp(&b.0));
        positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
