//! Media file probing to get clip metadata without decoding.

use reelcam_core::{FrameRate, RationalTime, ReelcamError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::compose::{ClipSource, VideoTrack};
use crate::error::ComposeError;

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File path
    pub path: String,
    /// Container duration
    pub duration: RationalTime,
    /// Video streams
    pub video_streams: Vec<VideoStreamInfo>,
    /// Audio streams
    pub audio_streams: Vec<AudioStreamInfo>,
    /// Container format
    pub format: String,
}

/// Information about a video stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub index: usize,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// Stream duration when the container reports one per stream.
    pub duration: Option<RationalTime>,
}

/// Information about an audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
}

// Subset of `ffprobe -print_format json -show_format -show_streams`.
#[derive(Debug, Deserialize)]
struct RawProbe {
    #[serde(default)]
    streams: Vec<RawStream>,
    format: Option<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

fn parse_seconds(text: Option<&str>) -> Option<RationalTime> {
    let secs: f64 = text?.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| RationalTime::from_seconds_f64(secs))
}

impl MediaProbe {
    /// Probe a media file with the ffprobe binary resolved by ffmpeg-sidecar.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::probe_with(&ffmpeg_sidecar::ffprobe::ffprobe_path(), path)
    }

    /// Probe a media file with an explicit ffprobe binary.
    pub fn probe_with<P: AsRef<Path>>(ffprobe: &Path, path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReelcamError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )));
        }

        debug!(path = %path.display(), "Probing clip");
        let output = Command::new(ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| ReelcamError::Media(format!("Failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ReelcamError::Media(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Self::from_ffprobe_json(path, &output.stdout)
    }

    /// Parse ffprobe's JSON report.
    pub fn from_ffprobe_json(path: &Path, data: &[u8]) -> Result<Self> {
        let raw: RawProbe = serde_json::from_slice(data)
            .map_err(|e| ReelcamError::Serialization(format!("Invalid ffprobe output: {e}")))?;

        let mut video_streams = Vec::new();
        let mut audio_streams = Vec::new();
        for stream in raw.streams {
            let codec = stream.codec_name.unwrap_or_default();
            match stream.codec_type.as_deref() {
                Some("video") => video_streams.push(VideoStreamInfo {
                    index: stream.index,
                    codec,
                    width: stream.width.unwrap_or(0),
                    height: stream.height.unwrap_or(0),
                    frame_rate: stream
                        .r_frame_rate
                        .as_deref()
                        .and_then(|r| FrameRate::parse(r).ok())
                        .unwrap_or_default(),
                    duration: parse_seconds(stream.duration.as_deref()),
                }),
                Some("audio") => audio_streams.push(AudioStreamInfo {
                    index: stream.index,
                    codec,
                    sample_rate: stream
                        .sample_rate
                        .as_deref()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0),
                    channels: stream.channels.unwrap_or(0),
                }),
                _ => {}
            }
        }

        let (format, duration) = match raw.format {
            Some(format) => (
                format.format_name.unwrap_or_default(),
                parse_seconds(format.duration.as_deref()).unwrap_or(RationalTime::ZERO),
            ),
            None => (String::new(), RationalTime::ZERO),
        };

        Ok(Self {
            path: path.to_string_lossy().into_owned(),
            duration,
            video_streams,
            audio_streams,
            format,
        })
    }

    /// Check if the file has video.
    pub fn has_video(&self) -> bool {
        !self.video_streams.is_empty()
    }

    /// Check if the file has audio.
    pub fn has_audio(&self) -> bool {
        !self.audio_streams.is_empty()
    }

    /// Get the primary video stream info.
    pub fn primary_video(&self) -> Option<&VideoStreamInfo> {
        self.video_streams.first()
    }

    /// Duration of the primary video stream, falling back to the container's.
    pub fn video_duration(&self) -> Option<RationalTime> {
        self.primary_video()
            .map(|v| v.duration.unwrap_or(self.duration))
    }
}

/// [`ClipSource`] backed by the ffprobe executable.
#[derive(Debug, Clone)]
pub struct FfprobeSource {
    ffprobe: PathBuf,
}

impl FfprobeSource {
    /// Use an explicit ffprobe binary.
    pub fn with_binary(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    /// Check if the configured ffprobe can be found.
    pub fn is_available(&self) -> bool {
        which::which(&self.ffprobe).is_ok()
    }
}

impl Default for FfprobeSource {
    fn default() -> Self {
        Self::with_binary(ffmpeg_sidecar::ffprobe::ffprobe_path())
    }
}

impl ClipSource for FfprobeSource {
    fn video_track(&self, path: &Path) -> std::result::Result<VideoTrack, ComposeError> {
        let probe =
            MediaProbe::probe_with(&self.ffprobe, path).map_err(|e| ComposeError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let (Some(video), Some(duration)) = (probe.primary_video(), probe.video_duration()) else {
            return Err(ComposeError::MissingVideoTrack {
                path: path.to_path_buf(),
            });
        };
        Ok(VideoTrack {
            path: path.to_path_buf(),
            duration,
            codec: video.codec.clone(),
            width: video.width,
            height: video.height,
            frame_rate: video.frame_rate,
        })
    }
}
