//! Error types for composition and export.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a composition. No partial output survives any of them.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Nothing to compose.
    #[error("no clips to compose")]
    EmptyClipList,

    /// A clip could not be opened or probed.
    #[error("cannot read clip {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    /// A clip contains no video stream.
    #[error("clip {} has no video track", path.display())]
    MissingVideoTrack { path: PathBuf },

    /// IO error while preparing or cleaning up the destination.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The exporter failed to write the output.
    #[error("export failed: {0}")]
    Export(String),

    /// Another composition has not finished yet.
    #[error("a composition is already in flight")]
    InFlight,

    /// The worker thread ended without delivering a result.
    #[error("composition worker exited without reporting a result")]
    WorkerLost,
}
