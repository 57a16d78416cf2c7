//! Integration tests for the recorder driving timeline and composer.

use crate::support::{composer, secs, write_clip};
use reelcam_recorder::{
    CaptureBackend, CaptureError, CaptureEvent, Recorder, RecorderConfig, RecorderError,
    RemoveOutcome, TakeOutcome,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

// ── Helpers ────────────────────────────────────────────────────

/// Records the duration caps it was started with.
#[derive(Default)]
struct ScriptedCamera {
    caps: Vec<f64>,
}

impl CaptureBackend for ScriptedCamera {
    fn start_capture(&mut self, max_duration_secs: f64) -> Result<(), CaptureError> {
        self.caps.push(max_duration_secs);
        Ok(())
    }

    fn stop_capture(&mut self) {}
}

struct Session {
    dir: TempDir,
    recorder: Recorder<ScriptedCamera>,
    takes: usize,
}

impl Session {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = RecorderConfig {
            output_path: dir.path().join("capture.mp4"),
            ..Default::default()
        };
        let recorder =
            Recorder::with_composer(config, ScriptedCamera::default(), composer()).unwrap();
        Self {
            dir,
            recorder,
            takes: 0,
        }
    }

    fn take(&mut self, secs: f64) -> (PathBuf, TakeOutcome) {
        self.takes += 1;
        let path = write_clip(self.dir.path(), &format!("take-{}.mp4", self.takes), secs);
        self.recorder.start_take().unwrap();
        self.recorder.handle_event(CaptureEvent::Started).unwrap();
        self.recorder
            .handle_event(CaptureEvent::Progress { elapsed_secs: secs })
            .unwrap();
        let outcome = self
            .recorder
            .handle_event(CaptureEvent::Finished {
                elapsed_secs: secs,
                path: path.clone(),
            })
            .unwrap();
        (path, outcome)
    }

    fn output(&self) -> &Path {
        &self.recorder.config().output_path
    }
}

// ── Scenarios ──────────────────────────────────────────────────

#[test]
fn record_undo_and_finish() {
    let mut session = Session::new();
    session.take(2.0);
    let (tap, outcome) = session.take(0.1);
    assert_eq!(outcome, TakeOutcome::Discarded);
    assert!(!tap.exists());

    let (mistake, _) = session.take(4.0);
    assert_eq!(session.recorder.press_remove().unwrap(), RemoveOutcome::Armed);
    assert!(matches!(
        session.recorder.press_remove().unwrap(),
        RemoveOutcome::Removed { .. }
    ));
    assert!(!mistake.exists());

    session.take(1.5);
    assert_eq!(session.recorder.timeline().cumulative_length(), secs(3.5));

    let asset = session
        .recorder
        .finish()
        .unwrap()
        .wait_timeout(Duration::from_secs(10))
        .expect("finished")
        .unwrap();
    assert_eq!(asset.duration, secs(3.5));
    assert_eq!(asset.composition.len(), 2);
    assert!(session.output().exists());
}

#[test]
fn caps_follow_remaining_budget() {
    let mut session = Session::new();
    session.take(6.0);
    session.take(6.0);
    let (_, outcome) = session.take(2.6);
    assert_eq!(
        outcome,
        TakeOutcome::Accepted {
            budget_filled: true
        }
    );

    assert_eq!(session.recorder.backend().caps, vec![15.0, 9.0, 3.0]);
    assert!(matches!(
        session.recorder.start_take(),
        Err(RecorderError::CannotRecord { .. })
    ));
}

#[test]
fn finish_below_minimum_is_refused() {
    let mut session = Session::new();
    session.take(2.9);
    assert!(matches!(
        session.recorder.finish(),
        Err(RecorderError::NotEnoughFootage { .. })
    ));
    assert!(!session.output().exists());
}

#[test]
fn discard_all_resets_session() {
    let mut session = Session::new();
    let (first, _) = session.take(3.0);
    let (second, _) = session.take(3.0);

    assert_eq!(session.recorder.discard_all().unwrap(), 2);
    assert!(!first.exists());
    assert!(!second.exists());
    assert_eq!(session.recorder.timeline().left_time(), secs(15.0));
    assert!(matches!(
        session.recorder.finish(),
        Err(RecorderError::NothingRecorded)
    ));
}
