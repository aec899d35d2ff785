//! Live tracking feed
//!
//! - **feed**: assembles per-viewer tracking snapshots
//! - **map**: operator view of every tracked technician
//! - **poll**: recommended client poll cadence per status

pub mod feed;
pub mod map;
pub mod poll;

pub use feed::TrackingFeed;
pub use map::{MapEntry, MapJob, technician_map};
pub use poll::recommended_poll_interval;
