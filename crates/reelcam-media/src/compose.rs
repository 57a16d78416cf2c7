//! Sequential composition of recorded clips.
//!
//! Each clip's whole video track is appended at a running output cursor,
//! so the composed asset plays the clips back to back in recording order.
//! Composition runs on a dedicated worker; at most one may be in flight
//! per composer, and each request reports exactly once.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use reelcam_core::{FrameRate, RationalTime, TimeRange};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ComposeError;
use crate::export::{ExportJob, ExportProgress, Exporter, FfmpegExporter};
use crate::probe::FfprobeSource;

/// Outcome delivered once per composition request.
pub type ComposeResult = Result<ComposedAsset, ComposeError>;

// ── Composition model ───────────────────────────────────────────

/// The video track of one input clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoTrack {
    pub path: PathBuf,
    pub duration: RationalTime,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
}

/// Reads the video track of a clip file.
pub trait ClipSource: Send + Sync {
    fn video_track(&self, path: &Path) -> Result<VideoTrack, ComposeError>;
}

/// One clip placed on the output track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionEntry {
    /// Clip file.
    pub source: PathBuf,
    /// Range taken from the clip (always its full track).
    pub source_range: TimeRange,
    /// Where the clip starts in the output.
    pub output_start: RationalTime,
}

impl CompositionEntry {
    /// Range occupied in the output.
    pub fn output_range(&self) -> TimeRange {
        TimeRange::new(self.output_start, self.source_range.duration)
    }
}

/// A single output video track built from clips in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    entries: Vec<CompositionEntry>,
    cursor: RationalTime,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the whole of `track` at the cursor and advance past it.
    pub fn append(&mut self, track: &VideoTrack) -> &CompositionEntry {
        self.entries.push(CompositionEntry {
            source: track.path.clone(),
            source_range: TimeRange::new(RationalTime::ZERO, track.duration),
            output_start: self.cursor,
        });
        self.cursor += track.duration;
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[CompositionEntry] {
        &self.entries
    }

    /// Total output duration.
    pub fn duration(&self) -> RationalTime {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The finished output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedAsset {
    pub path: PathBuf,
    pub duration: RationalTime,
    pub composition: Composition,
}

// ── Composer ────────────────────────────────────────────────────

/// Builds compositions from clip paths and hands them to an exporter.
#[derive(Clone)]
pub struct ClipComposer {
    source: Arc<dyn ClipSource>,
    exporter: Arc<dyn Exporter>,
    in_flight: Arc<AtomicBool>,
}

impl ClipComposer {
    /// Create a composer from a clip source and an exporter.
    pub fn new(source: impl ClipSource + 'static, exporter: impl Exporter + 'static) -> Self {
        Self {
            source: Arc::new(source),
            exporter: Arc::new(exporter),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Composer using ffprobe and FFmpeg stream copy.
    pub fn ffmpeg(source: FfprobeSource, exporter: FfmpegExporter) -> Self {
        Self::new(source, exporter)
    }

    /// Whether a composition is currently running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Read every clip's video track and lay them out back to back.
    ///
    /// Any unreadable clip aborts the whole composition.
    pub fn build(&self, paths: &[PathBuf]) -> Result<Composition, ComposeError> {
        build_composition(self.source.as_ref(), paths)
    }

    /// Compose on the calling thread.
    pub fn compose_blocking(
        &self,
        paths: &[PathBuf],
        job: &ExportJob,
        on_progress: &dyn Fn(ExportProgress),
    ) -> ComposeResult {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(ComposeError::InFlight)?;
        run_composition(
            self.source.as_ref(),
            self.exporter.as_ref(),
            paths,
            job,
            on_progress,
        )
    }

    /// Compose on a worker thread.
    ///
    /// Fails immediately only when another composition is in flight; every
    /// other failure is delivered through the returned handle.
    pub fn compose(&self, paths: Vec<PathBuf>, job: ExportJob) -> Result<ComposeHandle, ComposeError> {
        self.compose_with(paths, job, |_| {})
    }

    /// Like [`ClipComposer::compose`], also calling `on_complete` on the
    /// worker with the result before it is delivered to the handle.
    pub fn compose_with(
        &self,
        paths: Vec<PathBuf>,
        job: ExportJob,
        on_complete: impl FnOnce(&ComposeResult) + Send + 'static,
    ) -> Result<ComposeHandle, ComposeError> {
        let guard = InFlightGuard::acquire(&self.in_flight).ok_or(ComposeError::InFlight)?;
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let (progress_tx, progress_rx) = crossbeam_channel::unbounded();
        let source = Arc::clone(&self.source);
        let exporter = Arc::clone(&self.exporter);

        let worker = std::thread::Builder::new()
            .name("reelcam-compose".into())
            .spawn(move || {
                let result = {
                    let _guard = guard;
                    let report = |p: ExportProgress| {
                        let _ = progress_tx.send(p);
                    };
                    run_composition(source.as_ref(), exporter.as_ref(), &paths, &job, &report)
                };
                on_complete(&result);
                deliver(&result_tx, result);
            })?;

        Ok(ComposeHandle {
            result: result_rx,
            progress: progress_rx,
            worker: Some(worker),
        })
    }
}

impl std::fmt::Debug for ClipComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipComposer")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl Default for ClipComposer {
    fn default() -> Self {
        Self::ffmpeg(FfprobeSource::default(), FfmpegExporter::default())
    }
}

fn deliver(tx: &Sender<ComposeResult>, result: ComposeResult) {
    if tx.send(result).is_err() {
        debug!("Composition finished after its handle was dropped");
    }
}

/// Clears the in-flight flag when dropped.
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn build_composition(
    source: &dyn ClipSource,
    paths: &[PathBuf],
) -> Result<Composition, ComposeError> {
    if paths.is_empty() {
        return Err(ComposeError::EmptyClipList);
    }
    let mut composition = Composition::new();
    for path in paths {
        let track = source.video_track(path)?;
        let entry = composition.append(&track);
        debug!(
            clip = %path.display(),
            at = %entry.output_start,
            duration = %track.duration,
            "Appended clip"
        );
    }
    Ok(composition)
}

fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn run_composition(
    source: &dyn ClipSource,
    exporter: &dyn Exporter,
    paths: &[PathBuf],
    job: &ExportJob,
    on_progress: &dyn Fn(ExportProgress),
) -> ComposeResult {
    // Stale output goes first so a failed run never leaves an old file behind.
    if remove_if_exists(&job.output_path)? {
        debug!(path = %job.output_path.display(), "Removed previous output");
    }

    let composition = build_composition(source, paths)?;

    if let Err(e) = exporter.export(&composition, job, on_progress) {
        if let Err(cleanup) = remove_if_exists(&job.output_path) {
            warn!(
                path = %job.output_path.display(),
                error = %cleanup,
                "Failed to remove partial output"
            );
        }
        warn!(error = %e, "Composition export failed");
        return Err(e);
    }

    info!(
        output = %job.output_path.display(),
        clips = composition.len(),
        duration = %composition.duration(),
        "Composition exported"
    );
    Ok(ComposedAsset {
        path: job.output_path.clone(),
        duration: composition.duration(),
        composition,
    })
}

// ── Completion handle ───────────────────────────────────────────

/// Receives the single result of a background composition.
#[derive(Debug)]
pub struct ComposeHandle {
    result: Receiver<ComposeResult>,
    progress: Receiver<ExportProgress>,
    worker: Option<JoinHandle<()>>,
}

impl ComposeHandle {
    /// Block until the composition finishes.
    pub fn wait(mut self) -> ComposeResult {
        let result = self.result.recv().unwrap_or(Err(ComposeError::WorkerLost));
        self.join();
        result
    }

    /// Block for at most `timeout`. `None` means still running.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<ComposeResult> {
        match self.result.recv_timeout(timeout) {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(ComposeError::WorkerLost)),
        }
    }

    /// Non-blocking poll. `None` means still running or already taken.
    pub fn try_result(&mut self) -> Option<ComposeResult> {
        let result = self.result.try_recv().ok()?;
        self.join();
        Some(result)
    }

    /// Most recent progress report, draining older ones.
    pub fn latest_progress(&self) -> Option<ExportProgress> {
        self.progress.try_iter().last()
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Composition worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Clip durations keyed by path; unknown paths are unreadable.
    struct FixedSource(HashMap<PathBuf, f64>);

    impl FixedSource {
        fn new(clips: &[(&str, f64)]) -> Self {
            Self(
                clips
                    .iter()
                    .map(|(p, d)| (PathBuf::from(p), *d))
                    .collect(),
            )
        }
    }

    impl ClipSource for FixedSource {
        fn video_track(&self, path: &Path) -> Result<VideoTrack, ComposeError> {
            let secs = self.0.get(path).ok_or_else(|| ComposeError::Unreadable {
                path: path.to_path_buf(),
                reason: "missing".into(),
            })?;
            if *secs < 0.0 {
                return Err(ComposeError::MissingVideoTrack {
                    path: path.to_path_buf(),
                });
            }
            Ok(VideoTrack {
                path: path.to_path_buf(),
                duration: RationalTime::from_seconds_f64(*secs),
                codec: "h264".into(),
                width: 720,
                height: 720,
                frame_rate: FrameRate::FPS_30,
            })
        }
    }

    /// Writes the entry list to the output, or fails on request.
    #[derive(Default)]
    struct FileExporter {
        fail: bool,
        calls: Mutex<usize>,
    }

    impl Exporter for FileExporter {
        fn export(
            &self,
            composition: &Composition,
            job: &ExportJob,
            on_progress: &dyn Fn(ExportProgress),
        ) -> Result<(), ComposeError> {
            *self.calls.lock() += 1;
            std::fs::write(&job.output_path, crate::export::concat_list(composition))?;
            if self.fail {
                return Err(ComposeError::Export("simulated failure".into()));
            }
            on_progress(ExportProgress {
                exported: composition.duration(),
                total: composition.duration(),
            });
            Ok(())
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn secs(s: f64) -> RationalTime {
        RationalTime::from_seconds_f64(s)
    }

    #[test]
    fn test_build_lays_clips_back_to_back() {
        let composer = ClipComposer::new(
            FixedSource::new(&[("a.mp4", 4.0), ("b.mp4", 5.5), ("c.mp4", 2.0)]),
            FileExporter::default(),
        );
        let composition = composer.build(&paths(&["a.mp4", "b.mp4", "c.mp4"])).unwrap();

        assert_eq!(composition.duration(), secs(11.5));
        let starts: Vec<_> = composition.entries().iter().map(|e| e.output_start).collect();
        assert_eq!(starts, vec![secs(0.0), secs(4.0), secs(9.5)]);
        let sources: Vec<_> = composition.entries().iter().map(|e| e.source.clone()).collect();
        assert_eq!(sources, paths(&["a.mp4", "b.mp4", "c.mp4"]));
        assert_eq!(composition.entries()[2].output_range().end(), secs(11.5));
    }

    #[test]
    fn test_build_rejects_empty_list() {
        let composer = ClipComposer::new(FixedSource::new(&[]), FileExporter::default());
        assert!(matches!(composer.build(&[]), Err(ComposeError::EmptyClipList)));
    }

    #[test]
    fn test_build_aborts_on_bad_clip() {
        let composer = ClipComposer::new(
            FixedSource::new(&[("a.mp4", 1.0), ("audio.m4a", -1.0)]),
            FileExporter::default(),
        );
        let err = composer
            .build(&paths(&["a.mp4", "audio.m4a"]))
            .unwrap_err();
        assert!(matches!(err, ComposeError::MissingVideoTrack { .. }));

        let err = composer.build(&paths(&["a.mp4", "gone.mp4"])).unwrap_err();
        assert!(matches!(err, ComposeError::Unreadable { .. }));
    }

    #[test]
    fn test_compose_blocking_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let job = ExportJob::new(dir.path().join("capture.mp4"));
        let composer = ClipComposer::new(
            FixedSource::new(&[("a.mp4", 1.5), ("b.mp4", 2.0)]),
            FileExporter::default(),
        );

        let asset = composer
            .compose_blocking(&paths(&["a.mp4", "b.mp4"]), &job, &|_| {})
            .unwrap();
        assert_eq!(asset.path, job.output_path);
        assert_eq!(asset.duration, secs(3.5));
        assert_eq!(asset.composition.len(), 2);
        assert!(job.output_path.exists());
        assert!(!composer.is_busy());
    }

    #[test]
    fn test_empty_compose_removes_stale_output() {
        let dir = tempfile::tempdir().unwrap();
        let job = ExportJob::new(dir.path().join("capture.mp4"));
        std::fs::write(&job.output_path, b"stale").unwrap();

        let composer = ClipComposer::new(FixedSource::new(&[]), FileExporter::default());
        let err = composer.compose_blocking(&[], &job, &|_| {}).unwrap_err();
        assert!(matches!(err, ComposeError::EmptyClipList));
        assert!(!job.output_path.exists());
    }

    #[test]
    fn test_failed_export_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let job = ExportJob::new(dir.path().join("capture.mp4"));
        let composer = ClipComposer::new(
            FixedSource::new(&[("a.mp4", 1.0)]),
            FileExporter {
                fail: true,
                ..Default::default()
            },
        );

        let err = composer
            .compose_blocking(&paths(&["a.mp4"]), &job, &|_| {})
            .unwrap_err();
        assert!(matches!(err, ComposeError::Export(_)));
        assert!(!job.output_path.exists());
    }

    #[test]
    fn test_background_compose_reports_once() {
        let dir = tempfile::tempdir().unwrap();
        let job = ExportJob::new(dir.path().join("capture.mp4"));
        let composer = ClipComposer::new(
            FixedSource::new(&[("a.mp4", 4.0), ("b.mp4", 5.5), ("c.mp4", 2.0)]),
            FileExporter::default(),
        );

        let (done_tx, done_rx) = crossbeam_channel::unbounded();
        let handle = composer
            .compose_with(paths(&["a.mp4", "b.mp4", "c.mp4"]), job, move |result| {
                let _ = done_tx.send(result.is_ok());
            })
            .unwrap();

        let asset = handle.wait().unwrap();
        assert_eq!(asset.duration, secs(11.5));
        assert_eq!(done_rx.try_iter().collect::<Vec<_>>(), vec![true]);
        assert!(!composer.is_busy());
    }

    #[test]
    fn test_background_errors_arrive_through_handle() {
        let dir = tempfile::tempdir().unwrap();
        let job = ExportJob::new(dir.path().join("capture.mp4"));
        let composer = ClipComposer::new(FixedSource::new(&[]), FileExporter::default());

        let mut handle = composer.compose(Vec::new(), job).unwrap();
        let result = handle
            .wait_timeout(Duration::from_secs(10))
            .expect("composition should finish");
        assert!(matches!(result, Err(ComposeError::EmptyClipList)));
        assert!(handle.try_result().is_none());
    }

    #[test]
    fn test_second_request_while_busy_is_rejected() {
        let composer = ClipComposer::new(FixedSource::new(&[]), FileExporter::default());
        let _held = InFlightGuard::acquire(&composer.in_flight).unwrap();
        assert!(composer.is_busy());

        let result = composer.compose(Vec::new(), ExportJob::temporary());
        assert!(matches!(result, Err(ComposeError::InFlight)));
    }
}
