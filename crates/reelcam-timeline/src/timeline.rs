//! The segment ledger.
//!
//! A `SegmentTimeline` has a single owner; every mutation takes `&mut self`
//! so calls from the capture-event stream are serialised by construction.
//! At most one take is open at a time, and only finalized segments count
//! toward the cumulative length.

use reelcam_core::RationalTime;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::TimelineConfig;
use crate::error::{TimelineError, TimelineResult};
use crate::event::{EventBus, TimelineEvent};
use crate::segment::{ClipSet, OpenSegment, Segment, SegmentHandle};

/// Ordered ledger of recorded takes bounded by a total-duration budget.
#[derive(Debug)]
pub struct SegmentTimeline {
    config: TimelineConfig,
    total_budget: RationalTime,
    minimum_required: RationalTime,
    segments: Vec<Segment>,
    open: Option<OpenSegment>,
    marked_for_deletion: bool,
    events: EventBus,
}

impl SegmentTimeline {
    /// Create an empty timeline after validating `config`.
    pub fn new(config: TimelineConfig) -> TimelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            total_budget: config.total_budget(),
            minimum_required: config.minimum_required(),
            segments: Vec::new(),
            open: None,
            marked_for_deletion: false,
            events: EventBus::default(),
        })
    }

    /// Receive every subsequent change to the ledger.
    pub fn subscribe(&mut self) -> crossbeam_channel::Receiver<TimelineEvent> {
        self.events.subscribe()
    }

    // ── Take lifecycle ─────────────────────────────────────────────

    /// Open a provisional segment at the current cumulative length.
    ///
    /// Refused while deletion is armed, while another take is open, or when
    /// no budget remains.
    pub fn begin_segment(&mut self) -> TimelineResult<SegmentHandle> {
        if self.marked_for_deletion {
            return Err(TimelineError::DeletionArmed);
        }
        if self.open.is_some() {
            return Err(TimelineError::TakeInProgress);
        }
        if self.left_time().is_zero() {
            return Err(TimelineError::BudgetExhausted);
        }

        let handle = SegmentHandle::new();
        let start_offset = self.cumulative_length();
        self.open = Some(OpenSegment {
            handle,
            start_offset,
            elapsed: RationalTime::ZERO,
        });

        info!(segment = %handle, start = %start_offset, "Take started");
        self.events.publish(TimelineEvent::SegmentStarted {
            handle,
            index: self.segments.len(),
            start_offset,
        });
        Ok(handle)
    }

    /// Set the open take's tentative length without committing it.
    ///
    /// Stale handles, non-finite or negative values and regressions are
    /// ignored.
    pub fn update_segment(&mut self, handle: SegmentHandle, elapsed_secs: f64) {
        let index = self.segments.len();
        let Some(open) = self.open.as_mut().filter(|o| o.handle == handle) else {
            debug!(segment = %handle, "Progress for a take that is not open");
            return;
        };
        if !elapsed_secs.is_finite() {
            debug!(segment = %handle, elapsed = elapsed_secs, "Ignoring non-finite progress");
            return;
        }

        let elapsed = RationalTime::from_seconds_f64(elapsed_secs);
        if elapsed.is_negative() || elapsed < open.elapsed {
            debug!(
                segment = %handle,
                elapsed = elapsed_secs,
                current = %open.elapsed,
                "Ignoring regressing progress"
            );
            return;
        }
        if elapsed == open.elapsed {
            return;
        }

        open.elapsed = elapsed;
        self.events.publish(TimelineEvent::SegmentUpdated {
            handle,
            index,
            elapsed,
        });
    }

    /// Commit the open take with its final duration and clip file.
    ///
    /// A take with a negative or non-finite duration, or one ending past the
    /// budget, is closed without being committed and reported as
    /// [`TimelineError::InvalidDuration`] or [`TimelineError::BudgetExceeded`].
    pub fn end_segment(
        &mut self,
        handle: SegmentHandle,
        final_elapsed_secs: f64,
        source_path: impl Into<PathBuf>,
    ) -> TimelineResult<&Segment> {
        let open = match self.open {
            Some(open) if open.handle == handle => open,
            _ => return Err(TimelineError::UnknownSegment),
        };
        let index = self.segments.len();
        self.open = None;

        if !final_elapsed_secs.is_finite() || final_elapsed_secs < 0.0 {
            warn!(
                segment = %handle,
                elapsed = final_elapsed_secs,
                "Capture backend reported an invalid take duration"
            );
            self.publish_abandoned(index);
            return Err(TimelineError::InvalidDuration(final_elapsed_secs));
        }

        let end_offset = match open
            .start_offset
            .checked_add(RationalTime::from_seconds_f64(final_elapsed_secs))
        {
            Some(end) if end <= self.total_budget => end,
            overrun => {
                let end = overrun.unwrap_or(RationalTime::MAX);
                warn!(
                    segment = %handle,
                    end = %end,
                    budget = %self.total_budget,
                    "Capture backend overran the recording budget"
                );
                self.publish_abandoned(index);
                return Err(TimelineError::BudgetExceeded {
                    end,
                    budget: self.total_budget,
                });
            }
        };

        let segment = Segment {
            id: handle.id(),
            start_offset: open.start_offset,
            end_offset,
            source_path: source_path.into(),
        };
        info!(
            segment = %handle,
            duration = %segment.duration(),
            total = %end_offset,
            "Take finalized"
        );
        self.segments.push(segment.clone());
        self.events
            .publish(TimelineEvent::SegmentFinalized { index, segment });
        Ok(&self.segments[index])
    }

    /// Abandon the open take after a capture error or cancellation.
    ///
    /// Returns false when `handle` is not the open take.
    pub fn cancel_segment(&mut self, handle: SegmentHandle) -> bool {
        if !self.open.is_some_and(|o| o.handle == handle) {
            return false;
        }
        self.open = None;
        info!(segment = %handle, "Take abandoned");
        self.publish_abandoned(self.segments.len());
        true
    }

    fn publish_abandoned(&mut self, index: usize) {
        self.events.publish(TimelineEvent::SegmentRemoved {
            index,
            source_path: None,
            cumulative_length: self.cumulative_length(),
        });
    }

    // ── Deletion ───────────────────────────────────────────────────

    /// Mark the last segment for deletion.
    ///
    /// Returns true if this call armed it; no-op when already armed, when
    /// the timeline is empty, or while a take is open.
    pub fn arm_deletion(&mut self) -> bool {
        if self.marked_for_deletion || self.segments.is_empty() || self.open.is_some() {
            return false;
        }
        self.marked_for_deletion = true;
        self.events.publish(TimelineEvent::DeletionArmed {
            index: self.segments.len() - 1,
        });
        true
    }

    /// Clear an armed deletion. Returns true if it was armed.
    pub fn disarm_deletion(&mut self) -> bool {
        if !self.marked_for_deletion {
            return false;
        }
        self.marked_for_deletion = false;
        self.events.publish(TimelineEvent::DeletionDisarmed);
        true
    }

    /// Remove the last segment after deletion was armed.
    ///
    /// Returns the removed clip path so the caller can delete the file.
    pub fn remove_last_segment(&mut self) -> TimelineResult<PathBuf> {
        if self.segments.is_empty() {
            return Err(TimelineError::EmptyTimeline);
        }
        if !self.marked_for_deletion {
            return Err(TimelineError::DeletionNotArmed);
        }
        if self.open.is_some() {
            return Err(TimelineError::TakeInProgress);
        }
        Ok(self.pop_last().source_path)
    }

    /// Drop the most recent segment if it is shorter than `threshold_secs`.
    ///
    /// Used for accidental taps right after `end_segment`; does not require
    /// arming. Returns the removed clip path, or `None` if the segment was
    /// long enough to keep.
    pub fn discard_last_below(&mut self, threshold_secs: f64) -> TimelineResult<Option<PathBuf>> {
        let Some(last) = self.segments.last() else {
            return Err(TimelineError::EmptyTimeline);
        };
        if self.open.is_some() {
            return Err(TimelineError::TakeInProgress);
        }
        if last.duration() >= RationalTime::from_seconds_f64(threshold_secs) {
            return Ok(None);
        }
        debug!(segment = %last.id, duration = %last.duration(), "Discarding short take");
        Ok(Some(self.pop_last().source_path))
    }

    /// Discard every segment, including an open take.
    ///
    /// Returns the clip paths of the finalized segments for file cleanup.
    pub fn remove_all_segments(&mut self) -> Vec<PathBuf> {
        self.open = None;
        self.marked_for_deletion = false;
        let removed: Vec<PathBuf> = self.segments.drain(..).map(|s| s.source_path).collect();
        info!(removed = removed.len(), "Timeline cleared");
        self.events.publish(TimelineEvent::Cleared {
            removed: removed.len(),
        });
        removed
    }

    fn pop_last(&mut self) -> Segment {
        let index = self.segments.len() - 1;
        let segment = self.segments.remove(index);
        if self.marked_for_deletion {
            self.marked_for_deletion = false;
            self.events.publish(TimelineEvent::DeletionDisarmed);
        }
        info!(
            segment = %segment.id,
            duration = %segment.duration(),
            total = %self.cumulative_length(),
            "Segment removed"
        );
        self.events.publish(TimelineEvent::SegmentRemoved {
            index,
            source_path: Some(segment.source_path.clone()),
            cumulative_length: self.cumulative_length(),
        });
        segment
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Total duration of the finalized segments.
    pub fn cumulative_length(&self) -> RationalTime {
        self.segments
            .last()
            .map(|s| s.end_offset)
            .unwrap_or(RationalTime::ZERO)
    }

    /// Cumulative length plus the open take's tentative length, capped at
    /// the budget.
    pub fn provisional_length(&self) -> RationalTime {
        match self.open {
            Some(open) => open
                .start_offset
                .checked_add(open.elapsed)
                .map_or(self.total_budget, |length| length.min(self.total_budget)),
            None => self.cumulative_length(),
        }
    }

    /// Remaining recordable time, never negative.
    pub fn left_time(&self) -> RationalTime {
        self.total_budget.saturating_sub(self.cumulative_length())
    }

    /// Whether enough footage exists to export.
    pub fn can_export(&self) -> bool {
        self.cumulative_length() >= self.minimum_required
    }

    pub fn total_budget(&self) -> RationalTime {
        self.total_budget
    }

    pub fn minimum_required(&self) -> RationalTime {
        self.minimum_required
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Position of the minimum-duration gate as a fraction of the budget.
    pub fn minimum_marker(&self) -> f64 {
        self.minimum_required.fraction_of(self.total_budget)
    }

    /// Finalized segments in recording order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_recording(&self) -> bool {
        self.open.is_some()
    }

    /// Handle of the open take, if any.
    pub fn open_segment(&self) -> Option<SegmentHandle> {
        self.open.map(|o| o.handle)
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion
    }

    /// Clip paths of the finalized segments, in order.
    pub fn clip_set(&self) -> ClipSet {
        self.segments.iter().collect()
    }
}

impl Default for SegmentTimeline {
    fn default() -> Self {
        let config = TimelineConfig::default();
        Self {
            config,
            total_budget: config.total_budget(),
            minimum_required: config.minimum_required(),
            segments: Vec::new(),
            open: None,
            marked_for_deletion: false,
            events: EventBus::default(),
        }
    }
}
