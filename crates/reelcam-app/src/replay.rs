//! Capture backend that replays existing clip files as takes.

use crossbeam_channel::Sender;
use reelcam_media::MediaProbe;
use reelcam_recorder::{CaptureBackend, CaptureError, CaptureEvent};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Progress reports emitted per replayed take.
const PROGRESS_STEPS: u32 = 4;

/// Reads clip durations for the replay backend.
pub type DurationProbe = Box<dyn Fn(&Path) -> Option<f64> + Send>;

/// Plays each queued clip as one take.
///
/// The clip is copied into `workdir` first, since the recorder deletes the
/// clip files of takes it discards.
pub struct ReplayBackend {
    queue: VecDeque<PathBuf>,
    events: Sender<CaptureEvent>,
    workdir: PathBuf,
    probe: DurationProbe,
    taken: usize,
}

impl ReplayBackend {
    pub fn new(
        clips: impl IntoIterator<Item = PathBuf>,
        events: Sender<CaptureEvent>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self::with_probe(clips, events, workdir, Box::new(probe_video_duration))
    }

    pub fn with_probe(
        clips: impl IntoIterator<Item = PathBuf>,
        events: Sender<CaptureEvent>,
        workdir: impl Into<PathBuf>,
        probe: DurationProbe,
    ) -> Self {
        Self {
            queue: clips.into_iter().collect(),
            events,
            workdir: workdir.into(),
            probe,
            taken: 0,
        }
    }

    /// Clips not yet replayed.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    fn emit(&self, event: CaptureEvent) {
        if self.events.send(event).is_err() {
            debug!("Capture event dropped; receiver is gone");
        }
    }

    fn stage(&mut self, clip: &Path) -> std::io::Result<PathBuf> {
        self.taken += 1;
        let extension = clip
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let staged = self.workdir.join(format!("take-{:02}.{extension}", self.taken));
        std::fs::copy(clip, &staged)?;
        Ok(staged)
    }
}

fn probe_video_duration(path: &Path) -> Option<f64> {
    MediaProbe::probe(path)
        .ok()?
        .video_duration()
        .map(|d| d.to_seconds_f64())
}

impl CaptureBackend for ReplayBackend {
    fn start_capture(&mut self, max_duration_secs: f64) -> Result<(), CaptureError> {
        let clip = self
            .queue
            .pop_front()
            .ok_or_else(|| CaptureError("no clips left to replay".into()))?;

        self.emit(CaptureEvent::Started);

        let Some(duration) = (self.probe)(&clip) else {
            self.emit(CaptureEvent::Failed {
                reason: format!("cannot read {}", clip.display()),
            });
            return Ok(());
        };
        if duration > max_duration_secs {
            warn!(
                clip = %clip.display(),
                duration,
                max_duration = max_duration_secs,
                "Clip does not fit the remaining budget"
            );
            self.emit(CaptureEvent::Cancelled);
            return Ok(());
        }

        for step in 1..PROGRESS_STEPS {
            self.emit(CaptureEvent::Progress {
                elapsed_secs: duration * f64::from(step) / f64::from(PROGRESS_STEPS),
            });
        }
        match self.stage(&clip) {
            Ok(path) => self.emit(CaptureEvent::Finished {
                elapsed_secs: duration,
                path,
            }),
            Err(e) => self.emit(CaptureEvent::Failed {
                reason: format!("cannot stage {}: {e}", clip.display()),
            }),
        }
        Ok(())
    }

    fn stop_capture(&mut self) {
        // Takes are replayed to completion inside start_capture.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(
        clips: Vec<PathBuf>,
        workdir: &Path,
    ) -> (ReplayBackend, crossbeam_channel::Receiver<CaptureEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let probe: DurationProbe = Box::new(|path| {
            std::fs::read_to_string(path).ok()?.trim().parse().ok()
        });
        (ReplayBackend::with_probe(clips, tx, workdir, probe), rx)
    }

    #[test]
    fn test_replays_clip_as_take() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("in.mov");
        std::fs::write(&clip, "2.0").unwrap();
        let (mut replay, rx) = backend(vec![clip.clone()], dir.path());

        replay.start_capture(15.0).unwrap();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.first(), Some(&CaptureEvent::Started));
        assert_eq!(
            events[1],
            CaptureEvent::Progress { elapsed_secs: 0.5 }
        );
        assert_eq!(
            events.last(),
            Some(&CaptureEvent::Finished {
                elapsed_secs: 2.0,
                path: dir.path().join("take-01.mov"),
            })
        );
        assert!(clip.exists());
        assert_eq!(replay.remaining(), 0);
    }

    #[test]
    fn test_clip_over_budget_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("long.mp4");
        std::fs::write(&clip, "9.0").unwrap();
        let (mut replay, rx) = backend(vec![clip], dir.path());

        replay.start_capture(5.0).unwrap();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events, vec![CaptureEvent::Started, CaptureEvent::Cancelled]);
    }

    #[test]
    fn test_empty_queue_refuses_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let (mut replay, rx) = backend(Vec::new(), dir.path());
        assert!(replay.start_capture(15.0).is_err());
        assert!(rx.try_iter().next().is_none());
    }
}
