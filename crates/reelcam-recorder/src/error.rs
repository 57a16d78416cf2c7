//! Recorder error types.

use reelcam_core::RationalTime;
use reelcam_media::ComposeError;
use reelcam_timeline::TimelineError;
use thiserror::Error;

use crate::capture::CaptureError;

/// Errors surfaced to the camera screen.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("timeline error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("composition error: {0}")]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Finish requested with no clips.
    #[error("nothing has been recorded")]
    NothingRecorded,

    /// Finish requested below the minimum duration.
    #[error("recorded {recorded} but at least {required} is required")]
    NotEnoughFootage {
        recorded: RationalTime,
        required: RationalTime,
    },

    /// Clips cannot change while they are being composed.
    #[error("a composition is in flight")]
    ComposeInFlight,

    /// Too little budget left to start a take.
    #[error("cannot record with only {left} left")]
    CannotRecord { left: RationalTime },
}

pub type RecorderResult<T> = std::result::Result<T, RecorderError>;
