//! ReelCam - multi-clip square camera recorder
//!
//! Replays the clip files given on the command line as takes, then composes
//! the accepted takes into one pass-through MP4.

mod replay;

use anyhow::{bail, Context, Result};
use reelcam_recorder::{Recorder, RecorderConfig, TakeOutcome};
use reelcam_timeline::TimelineEvent;
use replay::ReplayBackend;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable naming a JSON configuration file.
const CONFIG_ENV: &str = "REELCAM_CONFIG";

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let clips: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if clips.is_empty() {
        bail!("usage: reelcam <clip>...");
    }

    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => RecorderConfig::load(&path)
            .with_context(|| format!("Failed to load {}", PathBuf::from(&path).display()))?,
        None => RecorderConfig::default(),
    };
    info!(
        budget = config.timeline.total_budget_secs,
        minimum = config.timeline.minimum_required_secs,
        output = %config.output_path.display(),
        "ReelCam starting"
    );

    let workdir = std::env::temp_dir().join(format!("reelcam-takes-{}", std::process::id()));
    std::fs::create_dir_all(&workdir)
        .with_context(|| format!("Failed to create {}", workdir.display()))?;

    let result = record(config, clips, &workdir);
    if let Err(e) = std::fs::remove_dir_all(&workdir) {
        warn!(path = %workdir.display(), error = %e, "Failed to remove take directory");
    }
    result
}

fn record(config: RecorderConfig, clips: Vec<PathBuf>, workdir: &std::path::Path) -> Result<()> {
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let backend = ReplayBackend::new(clips, event_tx, workdir);
    let mut recorder = Recorder::new(config, backend)?;
    let changes = recorder.subscribe();

    while recorder.backend().remaining() > 0 {
        if !recorder.can_record() {
            warn!(
                skipped = recorder.backend().remaining(),
                "Recording budget filled"
            );
            break;
        }
        recorder.start_take()?;
        for event in event_rx.try_iter() {
            match recorder.handle_event(event) {
                Ok(TakeOutcome::Discarded) => info!("Take too short, discarded"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Take rejected"),
            }
        }
        for change in changes.try_iter() {
            if let TimelineEvent::SegmentFinalized { index, segment } = change {
                info!(
                    index,
                    duration = %segment.duration(),
                    left = %recorder.timeline().left_time(),
                    "Take accepted"
                );
            }
        }
    }

    let mut handle = recorder.finish()?;
    let asset = loop {
        if let Some(result) = handle.wait_timeout(Duration::from_millis(250)) {
            break result?;
        }
        if let Some(progress) = handle.latest_progress() {
            info!(percent = (progress.fraction() * 100.0).round(), "Composing");
        }
    };

    info!(
        output = %asset.path.display(),
        duration = %asset.duration,
        clips = asset.composition.len(),
        "Capture composed"
    );
    recorder.discard_all()?;
    Ok(())
}
