//! Segment types for the timeline.

use reelcam_core::{RationalTime, TimeRange};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identifies one take from `begin_segment` until it is finalized or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentHandle(Uuid);

impl SegmentHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying take ID.
    pub fn id(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SegmentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One accepted recording take on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Take ID, shared with the handle returned by `begin_segment`
    pub id: Uuid,
    /// Cumulative position where this segment begins
    pub start_offset: RationalTime,
    /// Cumulative position where it ends
    pub end_offset: RationalTime,
    /// Clip file written by the capture backend
    pub source_path: PathBuf,
}

impl Segment {
    /// Duration of the take.
    pub fn duration(&self) -> RationalTime {
        self.end_offset - self.start_offset
    }

    /// Timeline range covered by this segment.
    pub fn range(&self) -> TimeRange {
        TimeRange::from_start_end(self.start_offset, self.end_offset)
    }

    /// Start and end as fractions of `budget`, for drawing progress blocks.
    pub fn fraction_range(&self, budget: RationalTime) -> (f64, f64) {
        (
            self.start_offset.fraction_of(budget),
            self.end_offset.fraction_of(budget),
        )
    }
}

/// The provisional take currently being recorded.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpenSegment {
    pub handle: SegmentHandle,
    pub start_offset: RationalTime,
    pub elapsed: RationalTime,
}

/// Ordered clip paths of the finalized segments, in recording order.
///
/// Built from the ledger, so it always matches the segment list one to one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipSet {
    paths: Vec<PathBuf>,
}

impl ClipSet {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Whether any clip in the set lives at `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

impl<'a> FromIterator<&'a Segment> for ClipSet {
    fn from_iter<I: IntoIterator<Item = &'a Segment>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(|s| s.source_path.clone()).collect(),
        }
    }
}
