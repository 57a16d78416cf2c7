//! Export of a composition to a single file.
//!
//! The FFmpeg exporter remuxes with the concat demuxer and stream copy, so
//! clips are never re-encoded. Progress is reported from FFmpeg's own
//! progress lines.

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use reelcam_core::{defaults, RationalTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::compose::Composition;
use crate::error::ComposeError;

// ── Output settings ─────────────────────────────────────────────

/// Output container. Streams are copied, only the muxer changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputContainer {
    #[default]
    Mp4,
    Mov,
}

impl OutputContainer {
    /// FFmpeg muxer name.
    pub fn ffmpeg_muxer(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
        }
    }

    /// File extension for this container.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
        }
    }
}

/// Export progress information.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportProgress {
    /// Output time written so far.
    pub exported: RationalTime,
    /// Total composition duration.
    pub total: RationalTime,
}

impl ExportProgress {
    /// Completion fraction (0.0 to 1.0).
    pub fn fraction(&self) -> f64 {
        self.exported.fraction_of(self.total).clamp(0.0, 1.0)
    }
}

/// Where and how a composition is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    /// Output file path.
    pub output_path: PathBuf,
    /// Output container.
    pub container: OutputContainer,
}

impl ExportJob {
    /// Create a new export job.
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            container: OutputContainer::default(),
        }
    }

    /// The fixed composed-capture file in the temporary directory.
    pub fn temporary() -> Self {
        Self::new(std::env::temp_dir().join(defaults::OUTPUT_FILE_NAME))
    }

    /// Set the output container.
    pub fn with_container(mut self, container: OutputContainer) -> Self {
        self.container = container;
        self
    }

    /// Sidecar file listing the inputs for the concat demuxer.
    pub fn concat_list_path(&self) -> PathBuf {
        let mut name = self
            .output_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".concat.txt");
        self.output_path.with_file_name(name)
    }

    /// Build the FFmpeg command arguments.
    pub fn ffmpeg_args(&self, concat_list: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            concat_list.to_string_lossy().into_owned(),
            // First video stream only, copied as-is
            "-map".into(),
            "0:v:0".into(),
            "-c".into(),
            "copy".into(),
            "-f".into(),
            self.container.ffmpeg_muxer().into(),
            "-movflags".into(),
            "+faststart".into(),
        ];
        args.push(self.output_path.to_string_lossy().into_owned());
        args
    }
}

/// Contents of the concat demuxer list, one `file` line per entry in order.
///
/// FFmpeg resolves relative entries against the list's own directory, so
/// relative clip paths are anchored at the current directory first.
pub fn concat_list(composition: &Composition) -> String {
    let cwd = std::env::current_dir().ok();
    let mut list = String::from("ffconcat version 1.0\n");
    for entry in composition.entries() {
        let source = match &cwd {
            Some(cwd) if entry.source.is_relative() => cwd.join(&entry.source),
            _ => entry.source.clone(),
        };
        // Single quotes are closed, escaped and reopened.
        let escaped = source.to_string_lossy().replace('\'', r"'\''");
        list.push_str(&format!("file '{escaped}'\n"));
    }
    list
}

/// Parse FFmpeg's `HH:MM:SS.ss` progress clock.
pub fn parse_progress_time(text: &str) -> Option<RationalTime> {
    let mut parts = text.trim().split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(RationalTime::from_seconds_f64(
        (hours * 3600 + minutes * 60) as f64 + seconds,
    ))
}

// ── Exporters ───────────────────────────────────────────────────

/// Writes a composition to the job's output path.
pub trait Exporter: Send + Sync {
    /// Write `composition` to `job.output_path`, reporting progress.
    fn export(
        &self,
        composition: &Composition,
        job: &ExportJob,
        on_progress: &dyn Fn(ExportProgress),
    ) -> Result<(), ComposeError>;
}

/// Pass-through exporter running FFmpeg via ffmpeg-sidecar.
#[derive(Debug, Clone, Default)]
pub struct FfmpegExporter {
    /// Explicit FFmpeg binary; `None` uses ffmpeg-sidecar's resolution.
    ffmpeg: Option<PathBuf>,
}

impl FfmpegExporter {
    /// Use an explicit FFmpeg binary.
    pub fn with_binary(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: Some(ffmpeg.into()),
        }
    }

    /// Check if FFmpeg can be found.
    pub fn is_available(&self) -> bool {
        match &self.ffmpeg {
            Some(path) => which::which(path).is_ok(),
            None => ffmpeg_sidecar::command::ffmpeg_is_installed(),
        }
    }

    fn command(&self) -> FfmpegCommand {
        match &self.ffmpeg {
            Some(path) => FfmpegCommand::new_with_path(path),
            None => FfmpegCommand::new(),
        }
    }

    fn run(
        &self,
        composition: &Composition,
        job: &ExportJob,
        list_path: &Path,
        on_progress: &dyn Fn(ExportProgress),
    ) -> Result<(), ComposeError> {
        let total = composition.duration();
        let mut child = self
            .command()
            .args(job.ffmpeg_args(list_path))
            .spawn()
            .map_err(|e| ComposeError::Export(format!("Failed to spawn ffmpeg: {e}")))?;

        let events = child
            .iter()
            .map_err(|e| ComposeError::Export(format!("Failed to read ffmpeg output: {e}")))?;

        let mut errors = Vec::new();
        for event in events {
            match event {
                FfmpegEvent::Progress(progress) => {
                    if let Some(exported) = parse_progress_time(&progress.time) {
                        on_progress(ExportProgress { exported, total });
                    }
                }
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message)
                | FfmpegEvent::Error(message) => {
                    debug!(%message, "ffmpeg error output");
                    errors.push(message);
                }
                _ => {}
            }
        }

        let status = child
            .wait()
            .map_err(|e| ComposeError::Export(format!("Failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            let detail = errors.last().cloned().unwrap_or_default();
            return Err(ComposeError::Export(format!(
                "ffmpeg exited with status {status}: {detail}"
            )));
        }

        on_progress(ExportProgress {
            exported: total,
            total,
        });
        Ok(())
    }
}

impl Exporter for FfmpegExporter {
    fn export(
        &self,
        composition: &Composition,
        job: &ExportJob,
        on_progress: &dyn Fn(ExportProgress),
    ) -> Result<(), ComposeError> {
        let list_path = job.concat_list_path();
        std::fs::write(&list_path, concat_list(composition))?;

        info!(
            output = %job.output_path.display(),
            clips = composition.len(),
            duration = %composition.duration(),
            "Exporting composition"
        );
        let result = self.run(composition, job, &list_path, on_progress);

        if let Err(e) = std::fs::remove_file(&list_path) {
            warn!(path = %list_path.display(), error = %e, "Failed to remove concat list");
        }
        result
    }
}
