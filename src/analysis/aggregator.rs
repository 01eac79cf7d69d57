//! Segment aggregation and timeline helpers.
//!
//! This module merges per-table speaker segments into one session-wide,
//! time-ordered timeline and provides small grouping utilities over it.

use crate::models::{AnalysisResult, BiasFinding, TimelineEntry, TranscriptionUnit};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Merge all tables' segments into one timeline sorted by start time.
///
/// Malformed segments (end <= start, or no transcript text) are dropped with a
/// warning. The sort is stable, so simultaneous starts keep their input order.
pub fn aggregate_segments(units: &[TranscriptionUnit]) -> Vec<TimelineEntry> {
    let mut entries = Vec::new();
    let mut dropped = 0usize;

    for unit in units {
        for segment in &unit.segments {
            if !segment.is_well_formed() {
                warn!(
                    "Skipping malformed segment at table {} (speaker {}, {:.2}s-{:.2}s)",
                    unit.table_id, segment.speaker, segment.start, segment.end
                );
                dropped += 1;
                continue;
            }

            let mut segment = segment.clone();
            if segment.table_id.is_empty() {
                segment.table_id = unit.table_id.clone();
            }

            entries.push(TimelineEntry {
                table_id: unit.table_id.clone(),
                segment,
            });
        }
    }

    entries.sort_by(|a, b| a.segment.start.total_cmp(&b.segment.start));

    debug!(
        "Aggregated {} segments from {} tables ({} dropped)",
        entries.len(),
        units.len(),
        dropped
    );

    entries
}

/// Group timeline entries by speaker index, keeping timeline order per speaker.
pub fn group_by_speaker(entries: &[TimelineEntry]) -> BTreeMap<u32, Vec<&TimelineEntry>> {
    let mut grouped: BTreeMap<u32, Vec<&TimelineEntry>> = BTreeMap::new();

    for entry in entries {
        grouped.entry(entry.speaker()).or_default().push(entry);
    }

    grouped
}

/// Distinct speaker indices on the timeline, ascending.
pub fn speaker_indices(entries: &[TimelineEntry]) -> Vec<u32> {
    entries
        .iter()
        .map(TimelineEntry::speaker)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Session length: latest end minus earliest start over every speaker.
pub fn session_span(entries: &[TimelineEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }

    let first = entries
        .iter()
        .map(|e| e.segment.start)
        .fold(f64::INFINITY, f64::min);
    let last = entries
        .iter()
        .map(|e| e.segment.end)
        .fold(f64::NEG_INFINITY, f64::max);

    (last - first).max(0.0)
}

/// Distinct recommended interventions across sessions, most severe finding first.
pub fn facilitator_recommendations(results: &[AnalysisResult], n: usize) -> Vec<String> {
    let mut findings: Vec<&BiasFinding> =
        results.iter().flat_map(|r| &r.bias_findings).collect();
    findings.sort_by(|a, b| b.severity.total_cmp(&a.severity));

    let mut seen = BTreeSet::new();
    findings
        .into_iter()
        .map(|f| f.impact.recommended_intervention.trim())
        .filter(|r| !r.is_empty() && seen.insert(*r))
        .take(n)
        .map(str::to_string)
        .collect()
}
