//! ReelCam Recorder - Take orchestration
//!
//! Drives a [`SegmentTimeline`](reelcam_timeline::SegmentTimeline) from a
//! camera backend's capture events, owns clip-file cleanup for discarded
//! takes, and hands the finished clip set to the composer.

pub mod capture;
pub mod config;
pub mod error;
pub mod recorder;

pub use capture::{CaptureBackend, CaptureError, CaptureEvent};
pub use config::RecorderConfig;
pub use error::{RecorderError, RecorderResult};
pub use recorder::{Recorder, RemoveOutcome, TakeOutcome};
