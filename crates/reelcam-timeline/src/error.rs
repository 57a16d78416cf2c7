//! Error types for timeline ledger operations.

use reelcam_core::RationalTime;
use thiserror::Error;

/// Errors returned synchronously by [`crate::SegmentTimeline`] mutations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimelineError {
    /// A removal was requested with no finalized segments present.
    #[error("timeline has no segments")]
    EmptyTimeline,

    /// `remove_last_segment` was called without arming deletion first.
    #[error("deletion of the last segment was not armed")]
    DeletionNotArmed,

    /// A take cannot start while deletion is armed.
    #[error("deletion is armed; disarm before starting a take")]
    DeletionArmed,

    /// The finalized end offset would pass the total budget.
    #[error("segment would end at {end}, past the {budget} budget")]
    BudgetExceeded {
        end: RationalTime,
        budget: RationalTime,
    },

    /// No recordable time remains.
    #[error("recording budget is exhausted")]
    BudgetExhausted,

    /// Another take is still open.
    #[error("a take is already in progress")]
    TakeInProgress,

    /// The handle does not refer to the open take.
    #[error("segment handle does not refer to the open take")]
    UnknownSegment,

    /// Negative durations are never valid.
    #[error("invalid take duration: {0}s")]
    InvalidDuration(f64),

    /// Budget/minimum configuration is inconsistent.
    #[error("invalid timeline configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for timeline operations.
pub type TimelineResult<T> = std::result::Result<T, TimelineError>;
