//! Event-log catch-up for graph projections.

pub mod watermark;

pub use watermark::{GraphTracker, TrackerState};
