//! Participation imbalance.
//!
//! Emits a single finding when some speakers dominate the floor while
//! others barely get to speak.

use super::{speaker_list, truncate_chars, BiasDetector};
use crate::models::{
    BiasCategory, BiasFinding, BiasType, DetectionMethod, Evidence, Impact, SpeakingTimeProfile,
    TimeRange, TimelineEntry,
};
use crate::policy::{ParticipationPolicy, Policy};

const EXCERPT_CHARS: usize = 160;

pub struct ParticipationBiasDetector {
    policy: ParticipationPolicy,
}

impl ParticipationBiasDetector {
    pub fn new(policy: &Policy) -> Self {
        Self {
            policy: policy.participation.clone(),
        }
    }
}

impl BiasDetector for ParticipationBiasDetector {
    fn name(&self) -> &'static str {
        "participation"
    }

    fn detect(
        &self,
        entries: &[TimelineEntry],
        profiles: &[SpeakingTimeProfile],
    ) -> Vec<BiasFinding> {
        let speaker_count = profiles.len();
        if speaker_count < self.policy.min_speakers.max(1) {
            return Vec::new();
        }

        let expected_share = 100.0 / speaker_count as f64;

        let dominant: Vec<&SpeakingTimeProfile> = profiles
            .iter()
            .filter(|p| {
                p.percentage > expected_share * self.policy.dominant_share_multiplier
                    && p.dominance_index > self.policy.dominant_index_floor
            })
            .collect();
        let marginalized: Vec<&SpeakingTimeProfile> = profiles
            .iter()
            .filter(|p| {
                p.percentage < expected_share * self.policy.marginal_share_multiplier
                    && p.turn_count < self.policy.marginal_max_turns
            })
            .collect();

        let Some(top) = dominant
            .iter()
            .copied()
            .max_by(|a, b| a.percentage.total_cmp(&b.percentage))
        else {
            return Vec::new();
        };
        if marginalized.is_empty() {
            return Vec::new();
        }

        let dominant_ids: Vec<u32> = dominant.iter().map(|p| p.speaker_index).collect();
        let marginal_ids: Vec<u32> = marginalized.iter().map(|p| p.speaker_index).collect();

        // Longest turn of the top speaker, verbatim.
        let excerpt = entries
            .iter()
            .filter(|e| e.speaker() == top.speaker_index)
            .max_by(|a, b| a.segment.duration().total_cmp(&b.segment.duration()))
            .map(|e| truncate_chars(&e.segment.text, EXCERPT_CHARS))
            .unwrap_or_default();

        let mut implicated = dominant_ids.clone();
        implicated.extend(marginal_ids.iter().copied());

        vec![BiasFinding {
            bias_type: BiasType::Participation,
            category: BiasCategory::Exclusion,
            severity: ((top.percentage - expected_share) / expected_share).clamp(0.0, 1.0),
            confidence: self.policy.confidence,
            evidence: Evidence {
                subject: top.speaker_index,
                excerpt,
                context: format!(
                    "{} dominant and {} marginalized participant(s); speaker {} held {:.1}% of \
                     speaking time against an equal share of {:.1}%.",
                    dominant.len(),
                    marginalized.len(),
                    top.speaker_index,
                    top.percentage,
                    expected_share
                ),
                time_range: TimeRange::session(entries),
                speakers: implicated,
            },
            impact: Impact {
                affected_participants: marginal_ids.clone(),
                group_dynamics: format!(
                    "{} contributed little while {} held most of the floor; their perspectives \
                     are under-represented in the table's outcome.",
                    speaker_list(&marginal_ids),
                    speaker_list(&dominant_ids)
                ),
                recommended_intervention: format!(
                    "Use a round-robin or talking-piece round and invite {} to open the next \
                     question.",
                    speaker_list(&marginal_ids)
                ),
            },
            detection_method: DetectionMethod::Behavioral,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SpeakingTimeAnalyzer;
    use crate::models::SpeakerSegment;

    fn entry(speaker: u32, start: f64, end: f64) -> TimelineEntry {
        TimelineEntry {
            table_id: "t1".to_string(),
            segment: SpeakerSegment {
                speaker,
                start,
                end,
                text: format!("speaker {} talking about the harvest plan", speaker),
                confidence: 0.9,
                table_id: "t1".to_string(),
                words: Vec::new(),
            },
        }
    }

    fn run(entries: &[TimelineEntry]) -> Vec<BiasFinding> {
        let policy = Policy::default();
        let profiles = SpeakingTimeAnalyzer::new(&policy).analyze(entries);
        ParticipationBiasDetector::new(&policy).detect(entries, &profiles)
    }

    #[test]
    fn test_dominant_speaker_with_marginalized_peer() {
        // 100s session: speaker 1 holds 80s over two turns, speakers 2 and 3
        // share the remaining 20s with one turn each.
        let entries = vec![
            entry(1, 0.0, 40.0),
            entry(2, 40.0, 52.0),
            entry(1, 52.0, 92.0),
            entry(3, 92.0, 100.0),
        ];

        let findings = run(&entries);

        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.bias_type, BiasType::Participation);
        assert_eq!(finding.category, BiasCategory::Exclusion);
        assert!(finding.severity > 0.0 && finding.severity <= 1.0);
        assert_eq!(finding.confidence, 0.82);
        assert_eq!(finding.impact.affected_participants, vec![3]);
        assert_eq!(finding.evidence.speakers, vec![1, 3]);
        assert!(finding.evidence.context.contains("80.0%"));
        assert_eq!(finding.evidence.time_range, TimeRange::new(0.0, 100.0));
        assert!(!finding.evidence.excerpt.is_empty());
    }

    #[test]
    fn test_needs_three_speakers() {
        let entries = vec![entry(1, 0.0, 95.0), entry(2, 95.0, 100.0)];

        assert!(run(&entries).is_empty());
    }

    #[test]
    fn test_balanced_session_not_flagged() {
        let entries = vec![
            entry(1, 0.0, 30.0),
            entry(2, 30.0, 65.0),
            entry(3, 65.0, 100.0),
        ];

        assert!(run(&entries).is_empty());
    }

    #[test]
    fn test_dominance_without_marginalization_not_flagged() {
        // Speaker 3 is quiet but took several turns.
        let entries = vec![
            entry(1, 0.0, 80.0),
            entry(2, 80.0, 92.0),
            entry(3, 92.0, 94.0),
            entry(3, 94.0, 96.0),
            entry(3, 96.0, 98.0),
            entry(2, 98.0, 100.0),
        ];

        assert!(run(&entries).is_empty());
    }
}
