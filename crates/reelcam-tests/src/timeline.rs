//! Integration tests for the segment ledger.
//!
//! Exercises the ledger together with the composer that consumes its
//! clip set.

use crate::support::{composer, secs, write_clip};
use reelcam_timeline::{SegmentTimeline, TimelineConfig, TimelineError, TimelineEvent};
use std::path::PathBuf;

// ── Helpers ────────────────────────────────────────────────────

fn record(timeline: &mut SegmentTimeline, path: impl Into<PathBuf>, progress: &[f64]) {
    let handle = timeline.begin_segment().unwrap();
    for elapsed in progress {
        timeline.update_segment(handle, *elapsed);
    }
    let last = progress.last().copied().unwrap_or(0.0);
    timeline.end_segment(handle, last, path).unwrap();
}

// ── Ledger arithmetic ──────────────────────────────────────────

#[test]
fn two_takes_leave_eleven_point_six() {
    let mut timeline = SegmentTimeline::new(TimelineConfig::new(15.0, 3.0)).unwrap();
    record(&mut timeline, "a.mp4", &[1.0, 2.4]);
    record(&mut timeline, "b.mp4", &[1.0]);

    let ranges: Vec<_> = timeline
        .segments()
        .iter()
        .map(|s| (s.start_offset, s.end_offset))
        .collect();
    assert_eq!(ranges, vec![(secs(0.0), secs(2.4)), (secs(2.4), secs(3.4))]);
    assert_eq!(timeline.cumulative_length(), secs(3.4));
    assert_eq!(timeline.left_time(), secs(11.6));
    assert!(timeline.can_export());
}

#[test]
fn export_gate_sits_at_minimum() {
    let mut timeline = SegmentTimeline::default();
    record(&mut timeline, "a.mp4", &[2.9]);
    assert!(!timeline.can_export());

    timeline.arm_deletion();
    timeline.remove_last_segment().unwrap();
    record(&mut timeline, "b.mp4", &[3.0]);
    assert!(timeline.can_export());
    assert!((timeline.minimum_marker() - 0.2).abs() < 1e-12);
}

#[test]
fn unarmed_removal_is_reported() {
    let mut timeline = SegmentTimeline::default();
    record(&mut timeline, "a.mp4", &[1.0]);
    assert_eq!(
        timeline.remove_last_segment(),
        Err(TimelineError::DeletionNotArmed)
    );
    assert_eq!(timeline.segment_count(), 1);
}

#[test]
fn subscribers_see_take_lifecycle() {
    let mut timeline = SegmentTimeline::default();
    let events = timeline.subscribe();
    record(&mut timeline, "a.mp4", &[0.5, 1.0]);
    timeline.arm_deletion();
    timeline.remove_last_segment().unwrap();

    let kinds: Vec<&str> = events
        .try_iter()
        .map(|e| match e {
            TimelineEvent::SegmentStarted { .. } => "started",
            TimelineEvent::SegmentUpdated { .. } => "updated",
            TimelineEvent::SegmentFinalized { .. } => "finalized",
            TimelineEvent::DeletionArmed { .. } => "armed",
            TimelineEvent::DeletionDisarmed => "disarmed",
            TimelineEvent::SegmentRemoved { .. } => "removed",
            TimelineEvent::Cleared { .. } => "cleared",
        })
        .collect();
    assert_eq!(
        kinds,
        ["started", "updated", "updated", "finalized", "armed", "disarmed", "removed"]
    );
}

// ── Ledger to composition ──────────────────────────────────────

#[test]
fn clip_set_composes_in_recording_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut timeline = SegmentTimeline::default();
    for (name, d) in [("a.mp4", 4.0), ("b.mp4", 5.5), ("c.mp4", 2.0)] {
        let path = write_clip(dir.path(), name, d);
        record(&mut timeline, path, &[d]);
    }

    let composition = composer().build(timeline.clip_set().paths()).unwrap();
    assert_eq!(composition.duration(), timeline.cumulative_length());
    for (entry, segment) in composition.entries().iter().zip(timeline.segments()) {
        assert_eq!(entry.source, segment.source_path);
        assert_eq!(entry.output_start, segment.start_offset);
    }
}

#[test]
fn cleared_timeline_has_nothing_to_compose() {
    let mut timeline = SegmentTimeline::default();
    record(&mut timeline, "a.mp4", &[2.0]);
    record(&mut timeline, "b.mp4", &[2.0]);
    assert_eq!(timeline.remove_all_segments().len(), 2);

    assert!(timeline.clip_set().is_empty());
    assert_eq!(timeline.cumulative_length(), secs(0.0));
    assert!(composer().build(timeline.clip_set().paths()).is_err());
}
