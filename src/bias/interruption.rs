//! Interruption dominance.
//!
//! Flags speakers who cut in on others far more often than the session
//! average, using the stricter bias-flagging overlap threshold.

use super::{speaker_list, tail_chars, truncate_chars, BiasDetector};
use crate::analysis::{detect_interruptions, speaker_indices, InterruptionEvent};
use crate::models::{
    BiasCategory, BiasFinding, BiasType, DetectionMethod, Evidence, Impact, SpeakingTimeProfile,
    TimeRange, TimelineEntry,
};
use crate::policy::{InterruptionBiasPolicy, Policy};
use std::collections::BTreeSet;

pub struct InterruptionBiasDetector {
    threshold: f64,
    policy: InterruptionBiasPolicy,
}

impl InterruptionBiasDetector {
    pub fn new(policy: &Policy) -> Self {
        Self {
            threshold: policy.interruptions.bias_threshold_seconds,
            policy: policy.interruption_bias.clone(),
        }
    }

    /// Text straddling the interruption point: the end of the interrupted
    /// turn and the start of the interrupting one.
    fn snippet(&self, entries: &[TimelineEntry], event: &InterruptionEvent) -> String {
        let cut = &entries[event.current].segment;
        let cutter = &entries[event.next].segment;
        format!(
            "[{:.1}s] speaker {}: \"{}\" / speaker {}: \"{}\"",
            cutter.start,
            cut.speaker,
            tail_chars(&cut.text, self.policy.snippet_chars),
            cutter.speaker,
            truncate_chars(&cutter.text, self.policy.snippet_chars),
        )
    }
}

impl BiasDetector for InterruptionBiasDetector {
    fn name(&self) -> &'static str {
        "interruption"
    }

    fn detect(
        &self,
        entries: &[TimelineEntry],
        _profiles: &[SpeakingTimeProfile],
    ) -> Vec<BiasFinding> {
        let speakers = speaker_indices(entries);
        if speakers.is_empty() {
            return Vec::new();
        }

        let tally = detect_interruptions(entries, self.threshold);
        let total_given: usize = tally.given.values().sum();
        let mean = total_given as f64 / speakers.len() as f64;
        if mean <= 0.0 {
            return Vec::new();
        }

        let mut findings = Vec::new();

        for speaker in speakers {
            let given = tally.given_by(speaker);
            let events: Vec<&InterruptionEvent> = tally.events_by(speaker).collect();
            let samples: Vec<&InterruptionEvent> =
                events.iter().copied().take(self.policy.max_evidence).collect();

            if given as f64 <= mean * self.policy.mean_multiplier || samples.is_empty() {
                continue;
            }

            let interrupted: Vec<u32> = events
                .iter()
                .map(|e| e.interrupted)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let first = samples[0];
            let time_range = TimeRange::new(
                entries[first.next].segment.start,
                entries[first.current].segment.end,
            );
            let longest_overlap = events.iter().map(|e| e.overlap).fold(0.0, f64::max);

            let excerpt = samples
                .iter()
                .map(|e| self.snippet(entries, e))
                .collect::<Vec<_>>()
                .join("\n");

            let mut implicated = vec![speaker];
            implicated.extend(interrupted.iter().copied());

            findings.push(BiasFinding {
                bias_type: BiasType::Participation,
                category: BiasCategory::Interruption,
                severity: (given as f64 / (mean * self.policy.severity_divisor)).min(1.0),
                confidence: self.policy.confidence,
                evidence: Evidence {
                    subject: speaker,
                    excerpt,
                    context: format!(
                        "Speaker {} interrupted others {} times against a session mean of {:.2} \
                         (overlaps of at least {:.1}s, longest {:.1}s).",
                        speaker, given, mean, self.threshold, longest_overlap
                    ),
                    time_range,
                    speakers: implicated,
                },
                impact: Impact {
                    affected_participants: interrupted.clone(),
                    group_dynamics: format!(
                        "Repeated overlaps cut short {} and may discourage them from finishing \
                         their points.",
                        speaker_list(&interrupted)
                    ),
                    recommended_intervention: format!(
                        "Agree on a turn-taking signal and explicitly hand the floor back to \
                         {} when speaker {} overlaps.",
                        speaker_list(&interrupted),
                        speaker
                    ),
                },
                detection_method: DetectionMethod::Behavioral,
            });
        }

        findings
    }
}
