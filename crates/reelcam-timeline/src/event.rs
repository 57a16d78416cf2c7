//! Change notifications emitted by the timeline.
//!
//! Presentation layers subscribe and redraw from these events instead of
//! poking at the ledger's last element.

use crossbeam_channel::{Receiver, Sender};
use reelcam_core::RationalTime;
use std::path::PathBuf;

use crate::segment::{Segment, SegmentHandle};

/// A change to the timeline ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    /// A provisional segment was opened at `index`.
    SegmentStarted {
        handle: SegmentHandle,
        index: usize,
        start_offset: RationalTime,
    },
    /// The open segment's tentative length changed.
    SegmentUpdated {
        handle: SegmentHandle,
        index: usize,
        elapsed: RationalTime,
    },
    /// The open segment was committed.
    SegmentFinalized { index: usize, segment: Segment },
    /// A segment was dropped. `source_path` is `None` for an open take that
    /// never produced a file.
    SegmentRemoved {
        index: usize,
        source_path: Option<PathBuf>,
        cumulative_length: RationalTime,
    },
    /// Every segment was discarded.
    Cleared { removed: usize },
    DeletionArmed { index: usize },
    DeletionDisarmed,
}

/// Fan-out of events to any number of subscribers.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Vec<Sender<TimelineEvent>>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> Receiver<TimelineEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver to every live subscriber, pruning the ones that hung up.
    pub fn publish(&mut self, event: TimelineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
