//! Error types shared across ReelCam crates.

use thiserror::Error;

/// Main error type for ReelCam foundation operations.
#[derive(Error, Debug)]
pub enum ReelcamError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for ReelCam operations.
pub type Result<T> = std::result::Result<T, ReelcamError>;
