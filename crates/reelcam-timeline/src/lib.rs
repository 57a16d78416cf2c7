//! ReelCam Timeline - Segment ledger
//!
//! Tracks the takes recorded by the camera:
//! - Segments with cumulative start/end offsets
//! - A total-duration budget and a minimum-duration export gate
//! - Two-step arm/confirm deletion of the last segment
//! - Change notifications for presentation layers

pub mod config;
pub mod error;
pub mod event;
pub mod segment;
pub mod timeline;

pub use config::TimelineConfig;
pub use error::{TimelineError, TimelineResult};
pub use event::TimelineEvent;
pub use segment::{ClipSet, Segment, SegmentHandle};
pub use timeline::SegmentTimeline;
