//! Take orchestration.
//!
//! The [`Recorder`] owns the capture backend, the segment ledger and the
//! composer. Capture events are applied to the ledger; clip files of
//! takes that leave the ledger are deleted here.

use reelcam_core::RationalTime;
use reelcam_media::{ClipComposer, ComposeError, ComposeHandle};
use reelcam_timeline::{SegmentHandle, SegmentTimeline, TimelineError, TimelineEvent};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::capture::{CaptureBackend, CaptureEvent};
use crate::config::RecorderConfig;
use crate::error::{RecorderError, RecorderResult};

/// What a capture event did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeOutcome {
    /// A provisional segment was opened.
    Started,
    /// The open take's length was updated.
    Updated,
    /// The take was committed. `budget_filled` means no further take fits.
    Accepted { budget_filled: bool },
    /// The take was too short and has been removed with its file.
    Discarded,
    /// The take ended without a clip.
    Aborted,
}

/// Result of pressing the remove button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// First press: the last segment is marked.
    Armed,
    /// Second press: the marked segment and its clip are gone.
    Removed { path: PathBuf },
    /// No segments to remove.
    Nothing,
}

/// Drives a [`SegmentTimeline`] from a [`CaptureBackend`].
pub struct Recorder<B: CaptureBackend> {
    config: RecorderConfig,
    timeline: SegmentTimeline,
    backend: B,
    composer: ClipComposer,
    current: Option<SegmentHandle>,
    capture_requested: bool,
}

impl<B: CaptureBackend> Recorder<B> {
    /// Recorder composing with FFmpeg as configured.
    pub fn new(config: RecorderConfig, backend: B) -> RecorderResult<Self> {
        let composer = config.composer();
        Self::with_composer(config, backend, composer)
    }

    pub fn with_composer(
        config: RecorderConfig,
        backend: B,
        composer: ClipComposer,
    ) -> RecorderResult<Self> {
        config.validate()?;
        let timeline = SegmentTimeline::new(config.timeline)?;
        Ok(Self {
            config,
            timeline,
            backend,
            composer,
            current: None,
            capture_requested: false,
        })
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn timeline(&self) -> &SegmentTimeline {
        &self.timeline
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Ledger change notifications.
    pub fn subscribe(&mut self) -> crossbeam_channel::Receiver<TimelineEvent> {
        self.timeline.subscribe()
    }

    /// Whether a take is requested or running.
    pub fn is_recording(&self) -> bool {
        self.capture_requested || self.timeline.is_recording()
    }

    pub fn is_composing(&self) -> bool {
        self.composer.is_busy()
    }

    /// Whether enough budget remains to start a take.
    pub fn can_record(&self) -> bool {
        !self.is_recording() && self.timeline.left_time() >= self.config.record_floor()
    }

    // ── Takes ──────────────────────────────────────────────────────

    /// Ask the backend to record, capped at the remaining budget.
    pub fn start_take(&mut self) -> RecorderResult<()> {
        self.timeline.disarm_deletion();
        if self.is_recording() {
            return Err(TimelineError::TakeInProgress.into());
        }
        let left = self.timeline.left_time();
        if left < self.config.record_floor() {
            return Err(RecorderError::CannotRecord { left });
        }

        self.backend.start_capture(left.to_seconds_f64())?;
        self.capture_requested = true;
        info!(max_duration = %left, "Capture requested");
        Ok(())
    }

    /// Ask the backend to stop the running take.
    pub fn stop_take(&mut self) {
        if self.is_recording() {
            self.backend.stop_capture();
        }
    }

    /// Apply one capture event to the ledger.
    pub fn handle_event(&mut self, event: CaptureEvent) -> RecorderResult<TakeOutcome> {
        match event {
            CaptureEvent::Started => {
                self.capture_requested = false;
                match self.timeline.begin_segment() {
                    Ok(handle) => {
                        self.current = Some(handle);
                        Ok(TakeOutcome::Started)
                    }
                    Err(e) => {
                        warn!(error = %e, "Capture started but the take was refused");
                        self.backend.stop_capture();
                        Err(e.into())
                    }
                }
            }
            CaptureEvent::Progress { elapsed_secs } => {
                let Some(handle) = self.current else {
                    debug!(elapsed = elapsed_secs, "Progress without an open take");
                    return Err(TimelineError::UnknownSegment.into());
                };
                self.timeline.update_segment(handle, elapsed_secs);
                Ok(TakeOutcome::Updated)
            }
            CaptureEvent::Finished { elapsed_secs, path } => self.finish_take(elapsed_secs, path),
            CaptureEvent::Failed { reason } => {
                warn!(%reason, "Capture failed");
                self.abort_take();
                Ok(TakeOutcome::Aborted)
            }
            CaptureEvent::Cancelled => {
                info!("Capture cancelled");
                self.abort_take();
                Ok(TakeOutcome::Aborted)
            }
        }
    }

    fn finish_take(&mut self, elapsed_secs: f64, path: PathBuf) -> RecorderResult<TakeOutcome> {
        self.capture_requested = false;
        let Some(handle) = self.current.take() else {
            warn!(clip = %path.display(), "Clip finished without a started take");
            remove_clip(&path);
            return Err(TimelineError::UnknownSegment.into());
        };

        if let Err(e) = self.timeline.end_segment(handle, elapsed_secs, &path) {
            remove_clip(&path);
            return Err(e.into());
        }

        if let Some(discarded) = self.timeline.discard_last_below(self.config.min_take_secs)? {
            remove_clip(&discarded);
            return Ok(TakeOutcome::Discarded);
        }

        let budget_filled = self.timeline.left_time() < self.config.record_floor();
        if budget_filled {
            info!(total = %self.timeline.cumulative_length(), "Recording budget filled");
        }
        Ok(TakeOutcome::Accepted { budget_filled })
    }

    fn abort_take(&mut self) {
        self.capture_requested = false;
        if let Some(handle) = self.current.take() {
            self.timeline.cancel_segment(handle);
        }
    }

    // ── Removal ────────────────────────────────────────────────────

    /// Two-step removal of the last segment.
    pub fn press_remove(&mut self) -> RecorderResult<RemoveOutcome> {
        self.ensure_idle_composer()?;
        if self.timeline.is_empty() {
            return Ok(RemoveOutcome::Nothing);
        }
        if self.is_recording() {
            return Err(TimelineError::TakeInProgress.into());
        }
        if self.timeline.is_marked_for_deletion() {
            let path = self.timeline.remove_last_segment()?;
            remove_clip(&path);
            return Ok(RemoveOutcome::Removed { path });
        }
        if self.timeline.arm_deletion() {
            Ok(RemoveOutcome::Armed)
        } else {
            Err(TimelineError::TakeInProgress.into())
        }
    }

    /// Drop an armed removal. Returns true if one was armed.
    pub fn cancel_remove(&mut self) -> bool {
        self.timeline.disarm_deletion()
    }

    /// Discard every take, stopping a running one, and delete the clips.
    pub fn discard_all(&mut self) -> RecorderResult<usize> {
        self.ensure_idle_composer()?;
        if self.is_recording() {
            self.backend.stop_capture();
        }
        self.current = None;
        self.capture_requested = false;

        let paths = self.timeline.remove_all_segments();
        for path in &paths {
            remove_clip(path);
        }
        Ok(paths.len())
    }

    fn ensure_idle_composer(&self) -> RecorderResult<()> {
        if self.composer.is_busy() {
            return Err(RecorderError::ComposeInFlight);
        }
        Ok(())
    }

    // ── Finish ─────────────────────────────────────────────────────

    /// Compose the recorded clips into the configured output.
    pub fn finish(&mut self) -> RecorderResult<ComposeHandle> {
        if self.timeline.is_empty() {
            return Err(RecorderError::NothingRecorded);
        }
        if !self.timeline.can_export() {
            return Err(RecorderError::NotEnoughFootage {
                recorded: self.timeline.cumulative_length(),
                required: self.timeline.minimum_required(),
            });
        }
        if self.is_recording() {
            return Err(TimelineError::TakeInProgress.into());
        }
        self.timeline.disarm_deletion();

        let clips = self.timeline.clip_set();
        let job = self.config.export_job();
        info!(
            clips = clips.len(),
            total = %self.timeline.cumulative_length(),
            output = %job.output_path.display(),
            "Composing capture"
        );
        self.composer
            .compose(clips.into_paths(), job)
            .map_err(|e| match e {
                ComposeError::InFlight => RecorderError::ComposeInFlight,
                other => other.into(),
            })
    }

    /// Recorded length still missing before [`Recorder::finish`] is allowed.
    pub fn missing_footage(&self) -> RationalTime {
        self.timeline
            .minimum_required()
            .saturating_sub(self.timeline.cumulative_length())
    }
}

impl<B: CaptureBackend> std::fmt::Debug for Recorder<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("timeline", &self.timeline)
            .field("composer", &self.composer)
            .field("recording", &self.is_recording())
            .finish_non_exhaustive()
    }
}

/// Delete a clip file that left the ledger. Failures are logged only.
fn remove_clip(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(clip = %path.display(), "Clip deleted"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(clip = %path.display(), "Clip already gone")
        }
        Err(e) => warn!(clip = %path.display(), error = %e, "Failed to delete clip"),
    }
}
