//! Integration tests for background composition.

use crate::support::{composer, secs, write_clip};
use reelcam_media::{ComposeError, ExportJob};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn composes_three_clips_back_to_back() {
    let dir = tempfile::tempdir().unwrap();
    let clips = vec![
        write_clip(dir.path(), "a.mp4", 4.0),
        write_clip(dir.path(), "b.mp4", 5.5),
        write_clip(dir.path(), "c.mp4", 2.0),
    ];
    let job = ExportJob::new(dir.path().join("capture.mp4"));

    let mut handle = composer().compose(clips.clone(), job.clone()).unwrap();
    let asset = handle.wait_timeout(TIMEOUT).expect("finished").unwrap();

    assert_eq!(asset.duration, secs(11.5));
    let starts: Vec<_> = asset
        .composition
        .entries()
        .iter()
        .map(|e| e.output_start)
        .collect();
    assert_eq!(starts, vec![secs(0.0), secs(4.0), secs(9.5)]);

    let written = std::fs::read_to_string(&job.output_path).unwrap();
    let listed: Vec<_> = written.lines().skip(1).collect();
    assert_eq!(listed.len(), clips.len());
    for (line, clip) in listed.iter().zip(&clips) {
        assert!(line.contains(&*clip.to_string_lossy()));
    }
}

#[test]
fn empty_list_fails_and_clears_destination() {
    let dir = tempfile::tempdir().unwrap();
    let job = ExportJob::new(dir.path().join("capture.mp4"));
    std::fs::write(&job.output_path, b"previous capture").unwrap();

    let result = composer().compose(Vec::new(), job.clone()).unwrap().wait();
    assert!(matches!(result, Err(ComposeError::EmptyClipList)));
    assert!(!job.output_path.exists());
}

#[test]
fn unreadable_clip_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let clips = vec![
        write_clip(dir.path(), "a.mp4", 2.0),
        dir.path().join("missing.mp4"),
    ];
    let job = ExportJob::new(dir.path().join("capture.mp4"));

    let result = composer().compose(clips, job.clone()).unwrap().wait();
    assert!(matches!(result, Err(ComposeError::Unreadable { .. })));
    assert!(!job.output_path.exists());
}

#[test]
fn completion_callback_runs_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let clips = vec![write_clip(dir.path(), "a.mp4", 3.0)];
    let job = ExportJob::new(dir.path().join("capture.mp4"));
    let (tx, rx) = crossbeam_channel::unbounded();

    let handle = composer()
        .compose_with(clips, job, move |result| {
            tx.send(result.as_ref().map(|a| a.duration).ok()).unwrap();
        })
        .unwrap();
    handle.wait().unwrap();

    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Some(secs(3.0))]);
}

#[test]
fn composer_is_reusable_after_completion() {
    let dir = tempfile::tempdir().unwrap();
    let composer = composer();
    let job = ExportJob::new(dir.path().join("capture.mp4"));

    let first = vec![write_clip(dir.path(), "a.mp4", 1.0)];
    composer.compose(first, job.clone()).unwrap().wait().unwrap();
    assert!(!composer.is_busy());

    let second = vec![
        write_clip(dir.path(), "b.mp4", 2.0),
        write_clip(dir.path(), "c.mp4", 2.5),
    ];
    let asset = composer.compose(second, job).unwrap().wait().unwrap();
    assert_eq!(asset.duration, secs(4.5));
}
