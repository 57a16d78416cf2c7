//! Fakes shared by the integration tests.

use reelcam_core::{FrameRate, RationalTime};
use reelcam_media::{
    export::concat_list, ClipComposer, ClipSource, ComposeError, Composition, ExportJob,
    ExportProgress, Exporter, VideoTrack,
};
use std::path::{Path, PathBuf};

/// Clip files contain their duration in seconds as text.
pub struct TextClipSource;

impl ClipSource for TextClipSource {
    fn video_track(&self, path: &Path) -> Result<VideoTrack, ComposeError> {
        let text = std::fs::read_to_string(path).map_err(|e| ComposeError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let secs: f64 = text
            .trim()
            .parse()
            .map_err(|_| ComposeError::MissingVideoTrack {
                path: path.to_path_buf(),
            })?;
        Ok(VideoTrack {
            path: path.to_path_buf(),
            duration: RationalTime::from_seconds_f64(secs),
            codec: "h264".into(),
            width: 720,
            height: 720,
            frame_rate: FrameRate::FPS_30,
        })
    }
}

/// Writes the concat list as the "composed" file and reports halfway and
/// full progress.
pub struct ListExporter;

impl Exporter for ListExporter {
    fn export(
        &self,
        composition: &Composition,
        job: &ExportJob,
        on_progress: &dyn Fn(ExportProgress),
    ) -> Result<(), ComposeError> {
        let total = composition.duration();
        on_progress(ExportProgress {
            exported: RationalTime::ZERO,
            total,
        });
        std::fs::write(&job.output_path, concat_list(composition))?;
        on_progress(ExportProgress {
            exported: total,
            total,
        });
        Ok(())
    }
}

pub fn composer() -> ClipComposer {
    ClipComposer::new(TextClipSource, ListExporter)
}

/// Write a fake clip of `secs` seconds.
pub fn write_clip(dir: &Path, name: &str, secs: f64) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, secs.to_string()).unwrap();
    path
}

pub fn secs(s: f64) -> RationalTime {
    RationalTime::from_seconds_f64(s)
}
