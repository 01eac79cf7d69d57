//! Overlap-based interruption detection.
//!
//! Shared by the speaking-time analyzer and the interruption-bias detector,
//! each with its own threshold from the policy.

use crate::models::TimelineEntry;
use std::collections::BTreeMap;

/// One counted interruption between adjacent timeline entries.
#[derive(Debug, Clone, PartialEq)]
pub struct InterruptionEvent {
    /// Speaker of the later segment.
    pub interrupter: u32,
    /// Speaker of the earlier segment.
    pub interrupted: u32,
    /// Seconds the two segments overlap.
    pub overlap: f64,
    /// Index of the interrupted entry in the timeline.
    pub current: usize,
    /// Index of the interrupting entry in the timeline.
    pub next: usize,
}

/// Per-speaker interruption counts plus the events behind them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterruptionTally {
    pub given: BTreeMap<u32, usize>,
    pub received: BTreeMap<u32, usize>,
    pub events: Vec<InterruptionEvent>,
}

impl InterruptionTally {
    pub fn given_by(&self, speaker: u32) -> usize {
        self.given.get(&speaker).copied().unwrap_or(0)
    }

    pub fn received_by(&self, speaker: u32) -> usize {
        self.received.get(&speaker).copied().unwrap_or(0)
    }

    /// Events where `speaker` was the interrupter, in timeline order.
    pub fn events_by(&self, speaker: u32) -> impl Iterator<Item = &InterruptionEvent> {
        self.events.iter().filter(move |e| e.interrupter == speaker)
    }
}

/// Walk adjacent pairs of a chronologically sorted timeline and count
/// overlaps of at least `threshold` seconds.
///
/// An overlap must be positive to count. Adjacent segments of one speaker at
/// one table never count; the same index at another table is a different
/// person and does.
pub fn detect_interruptions(entries: &[TimelineEntry], threshold: f64) -> InterruptionTally {
    let mut tally = InterruptionTally::default();

    for (i, pair) in entries.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);

        if current.speaker() == next.speaker() && current.table_id == next.table_id {
            continue;
        }

        let overlap = (current.segment.end - next.segment.start).max(0.0);
        if overlap > 0.0 && overlap >= threshold {
            *tally.given.entry(next.speaker()).or_default() += 1;
            *tally.received.entry(current.speaker()).or_default() += 1;
            tally.events.push(InterruptionEvent {
                interrupter: next.speaker(),
                interrupted: current.speaker(),
                overlap,
                current: i,
                next: i + 1,
            });
        }
    }

    tally
}
