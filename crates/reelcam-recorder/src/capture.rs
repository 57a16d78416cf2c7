//! The camera side of a take.
//!
//! A backend records one clip file per take. The recorder starts and stops
//! it; the backend reports back through [`CaptureEvent`]s, delivered to
//! [`crate::Recorder::handle_event`] in the order they happened.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Notification from the capture backend about the current take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaptureEvent {
    /// Frames started arriving.
    Started,
    /// Elapsed time of the running take, in seconds.
    Progress { elapsed_secs: f64 },
    /// The clip file is complete.
    Finished { elapsed_secs: f64, path: PathBuf },
    /// Recording failed; no usable clip was produced.
    Failed { reason: String },
    /// Recording stopped before any clip was produced.
    Cancelled,
}

/// The backend refused to start recording.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("capture backend error: {0}")]
pub struct CaptureError(pub String);

/// Device-side recorder controlled by [`crate::Recorder`].
pub trait CaptureBackend: Send {
    /// Begin a take that must stop by itself after `max_duration_secs`.
    fn start_capture(&mut self, max_duration_secs: f64) -> Result<(), CaptureError>;

    /// Stop the running take, if any. A `Finished`, `Failed` or
    /// `Cancelled` event follows.
    fn stop_capture(&mut self);
}

impl<B: CaptureBackend + ?Sized> CaptureBackend for Box<B> {
    fn start_capture(&mut self, max_duration_secs: f64) -> Result<(), CaptureError> {
        (**self).start_capture(max_duration_secs)
    }

    fn stop_capture(&mut self) {
        (**self).stop_capture()
    }
}
