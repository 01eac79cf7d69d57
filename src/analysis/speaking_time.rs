//! Per-speaker speaking-time statistics.

use crate::analysis::aggregator::{group_by_speaker, session_span};
use crate::analysis::interruptions::detect_interruptions;
use crate::models::{EngagementLevel, SpeakingTimeProfile, TimelineEntry};
use crate::policy::{EngagementPolicy, Policy};
use tracing::debug;

/// Computes one `SpeakingTimeProfile` per speaker from an aggregated timeline.
#[derive(Debug, Clone)]
pub struct SpeakingTimeAnalyzer {
    interruption_threshold: f64,
    engagement: EngagementPolicy,
}

impl SpeakingTimeAnalyzer {
    pub fn new(policy: &Policy) -> Self {
        Self {
            interruption_threshold: policy.interruptions.profile_threshold_seconds,
            engagement: policy.engagement.clone(),
        }
    }

    /// Analyze a chronologically sorted timeline.
    ///
    /// Profiles come back ordered by speaker index. Empty input gives an
    /// empty list.
    pub fn analyze(&self, entries: &[TimelineEntry]) -> Vec<SpeakingTimeProfile> {
        if entries.is_empty() {
            return Vec::new();
        }

        let by_speaker = group_by_speaker(entries);
        let session_total = session_span(entries);
        let speaker_count = by_speaker.len();
        let equal_share = 100.0 / speaker_count as f64;
        let interruptions = detect_interruptions(entries, self.interruption_threshold);

        debug!(
            "Analyzing {} speakers over {:.1}s session",
            speaker_count, session_total
        );

        by_speaker
            .into_iter()
            .map(|(speaker, segments)| {
                let durations: Vec<f64> =
                    segments.iter().map(|e| e.segment.duration()).collect();
                let total_seconds: f64 = durations.iter().sum();
                let turn_count = durations.len();
                let word_count: usize = segments.iter().map(|e| e.segment.word_count()).sum();

                let percentage = if session_total > 0.0 {
                    total_seconds / session_total * 100.0
                } else {
                    0.0
                };

                let words_per_minute = if total_seconds > 0.0 {
                    word_count as f64 / (total_seconds / 60.0)
                } else {
                    0.0
                };

                let dominance_index = percentage / equal_share;

                SpeakingTimeProfile {
                    speaker_index: speaker,
                    total_seconds,
                    percentage,
                    turn_count,
                    average_turn_seconds: total_seconds / turn_count as f64,
                    min_turn_seconds: durations.iter().copied().fold(f64::INFINITY, f64::min),
                    max_turn_seconds: durations.iter().copied().fold(0.0, f64::max),
                    interruptions_given: interruptions.given_by(speaker),
                    interruptions_received: interruptions.received_by(speaker),
                    word_count,
                    words_per_minute,
                    dominance_index,
                    engagement_level: self.engagement_level(
                        turn_count,
                        words_per_minute,
                        dominance_index,
                    ),
                }
            })
            .collect()
    }

    fn engagement_level(
        &self,
        turn_count: usize,
        words_per_minute: f64,
        dominance_index: f64,
    ) -> EngagementLevel {
        let weights = &self.engagement;
        let mut score = 0;

        if turn_count >= weights.high_turns {
            score += 2;
        } else if turn_count >= weights.medium_turns {
            score += 1;
        }

        if words_per_minute >= weights.high_wpm {
            score += 2;
        } else if words_per_minute >= weights.medium_wpm {
            score += 1;
        }

        if (weights.balanced_min..=weights.balanced_max).contains(&dominance_index) {
            score += 1;
        }

        if score >= weights.high_score {
            EngagementLevel::High
        } else if score >= weights.medium_score {
            EngagementLevel::Medium
        } else {
            EngagementLevel::Low
        }
    }
}
