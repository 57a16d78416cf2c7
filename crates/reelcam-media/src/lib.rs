//! ReelCam Media - FFmpeg integration for clip composition
//!
//! This crate handles:
//! - Media file probing (ffprobe)
//! - Building an ordered composition from recorded clips
//! - Pass-through export of the composition to a single file
//! - Running composition on a worker with a one-shot completion handle

pub mod compose;
pub mod error;
pub mod export;
pub mod probe;

pub use compose::{
    ClipComposer, ClipSource, ComposeHandle, ComposeResult, ComposedAsset, Composition,
    CompositionEntry, VideoTrack,
};
pub use error::ComposeError;
pub use export::{ExportJob, ExportProgress, Exporter, FfmpegExporter, OutputContainer};
pub use probe::{FfprobeSource, MediaProbe};
