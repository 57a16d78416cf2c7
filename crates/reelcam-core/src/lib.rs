//! ReelCam Core - Foundation types for multi-clip recording
//!
//! This crate provides the fundamental types used throughout ReelCam:
//! - Time representation (RationalTime, FrameRate, TimeRange)
//! - Shared error type

pub mod error;
pub mod time;

pub use error::{ReelcamError, Result};
pub use time::{FrameRate, RationalTime, TimeRange};

/// Recording defaults for the square "hold to record" camera.
pub mod defaults {
    /// Hard cap on the cumulative recorded duration, in seconds.
    pub const TOTAL_BUDGET_SECS: f64 = 15.0;

    /// Cumulative duration required before export is allowed, in seconds.
    pub const MINIMUM_REQUIRED_SECS: f64 = 3.0;

    /// Takes shorter than this are treated as accidental taps.
    pub const MIN_TAKE_SECS: f64 = 0.3;

    /// Recording is refused once less than this much budget remains.
    pub const RECORD_FLOOR_SECS: f64 = 0.5;

    /// File name of the composed capture inside the temporary directory.
    pub const OUTPUT_FILE_NAME: &str = "capture.mp4";
}
