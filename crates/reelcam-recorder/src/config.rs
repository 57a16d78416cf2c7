//! Recorder configuration, stored as JSON.

use reelcam_core::{defaults, RationalTime};
use reelcam_media::{ClipComposer, ExportJob, FfmpegExporter, FfprobeSource, OutputContainer};
use reelcam_timeline::TimelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RecorderError, RecorderResult};

/// Everything the recorder needs besides its capture backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Budget and export gate.
    pub timeline: TimelineConfig,
    /// Takes shorter than this are discarded as accidental taps.
    pub min_take_secs: f64,
    /// Recording is refused once less budget than this remains.
    pub record_floor_secs: f64,
    /// Destination of the composed capture.
    pub output_path: PathBuf,
    pub container: OutputContainer,
    /// FFmpeg binary; ffmpeg-sidecar's lookup when unset.
    pub ffmpeg_path: Option<PathBuf>,
    /// ffprobe binary; ffmpeg-sidecar's lookup when unset.
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default(),
            min_take_secs: defaults::MIN_TAKE_SECS,
            record_floor_secs: defaults::RECORD_FLOOR_SECS,
            output_path: ExportJob::temporary().output_path,
            container: OutputContainer::default(),
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl RecorderConfig {
    /// Read and validate a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> RecorderResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> RecorderResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RecorderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> RecorderResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RecorderError::Config(e.to_string()))
    }

    pub fn validate(&self) -> RecorderResult<()> {
        self.timeline.validate()?;
        if !self.min_take_secs.is_finite() || self.min_take_secs < 0.0 {
            return Err(RecorderError::Config(format!(
                "min_take_secs must be a non-negative number, got {}",
                self.min_take_secs
            )));
        }
        if !self.record_floor_secs.is_finite()
            || self.record_floor_secs < 0.0
            || self.record_floor_secs > self.timeline.total_budget_secs
        {
            return Err(RecorderError::Config(format!(
                "record_floor_secs must be within [0, {}], got {}",
                self.timeline.total_budget_secs, self.record_floor_secs
            )));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(RecorderError::Config("output_path is empty".into()));
        }
        Ok(())
    }

    pub fn min_take(&self) -> RationalTime {
        RationalTime::from_seconds_f64(self.min_take_secs)
    }

    pub fn record_floor(&self) -> RationalTime {
        RationalTime::from_seconds_f64(self.record_floor_secs)
    }

    /// Export job for the composed capture.
    pub fn export_job(&self) -> ExportJob {
        ExportJob::new(&self.output_path).with_container(self.container)
    }

    /// FFmpeg-backed composer honouring the binary overrides.
    pub fn composer(&self) -> ClipComposer {
        let source = match &self.ffprobe_path {
            Some(path) => FfprobeSource::with_binary(path),
            None => FfprobeSource::default(),
        };
        let exporter = match &self.ffmpeg_path {
            Some(path) => FfmpegExporter::with_binary(path),
            None => FfmpegExporter::default(),
        };
        ClipComposer::ffmpeg(source, exporter)
    }
}
