//! Topic steering.
//!
//! Counts redirect, priority-claim and return-to-point phrases per speaker
//! and flags speakers far above the session average.

use super::{truncate_chars, BiasDetector, PhraseMatcher};
use crate::analysis::speaker_indices;
use crate::models::{
    BiasCategory, BiasFinding, BiasType, DetectionMethod, Evidence, Impact, SpeakingTimeProfile,
    TimeRange, TimelineEntry,
};
use crate::policy::{Policy, TopicSteeringPolicy};
use std::collections::BTreeMap;

pub struct TopicSteeringDetector {
    policy: TopicSteeringPolicy,
    steering: PhraseMatcher,
}

impl TopicSteeringDetector {
    pub fn new(policy: &Policy) -> Self {
        Self {
            steering: PhraseMatcher::new(&policy.topic_steering.phrases),
            policy: policy.topic_steering.clone(),
        }
    }
}

impl BiasDetector for TopicSteeringDetector {
    fn name(&self) -> &'static str {
        "topic_steering"
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

        let mut counts: BTreeMap<u32, (usize, Option<(String, TimeRange)>)> = BTreeMap::new();
        for entry in entries {
            let matches = self.steering.count(&entry.segment.text);
            if matches == 0 {
                continue;
            }
            let slot = counts.entry(entry.speaker()).or_default();
            slot.0 += matches;
            if slot.1.is_none() {
                slot.1 = Some((
                    truncate_chars(&entry.segment.text, self.policy.excerpt_chars),
                    TimeRange::of_segment(&entry.segment),
                ));
            }
        }

        let total: usize = counts.values().map(|(c, _)| c).sum();
        let mean = total as f64 / speakers.len() as f64;

        counts
            .into_iter()
            .filter(|(_, (count, _))| {
                *count as f64 > mean * self.policy.mean_multiplier
                    && *count > self.policy.absolute_floor
            })
            .filter_map(|(speaker, (count, first))| {
                let (excerpt, time_range) = first?;
                let affected: Vec<u32> =
                    speakers.iter().copied().filter(|s| *s != speaker).collect();

                Some(BiasFinding {
                    bias_type: BiasType::Topic,
                    category: BiasCategory::TopicSteering,
                    severity: (count as f64 / self.policy.severity_divisor).min(1.0),
                    confidence: self.policy.confidence,
                    evidence: Evidence {
                        subject: speaker,
                        excerpt,
                        context: format!(
                            "Speaker {} redirected the conversation {} times; the session mean \
                             is {:.2} per speaker.",
                            speaker, count, mean
                        ),
                        time_range,
                        speakers: vec![speaker],
                    },
                    impact: Impact {
                        affected_participants: affected,
                        group_dynamics: "Frequent redirection narrows the conversation to one \
                                         participant's agenda and leaves other threads unexplored."
                            .to_string(),
                        recommended_intervention: format!(
                            "Park speaker {}'s topic visibly and return to the open threads \
                             raised by others before moving on.",
                            speaker
                        ),
                    },
                    detection_method: DetectionMethod::Keyword,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpeakerSegment;

    fn entry(speaker: u32, start: f64, text: &str) -> TimelineEntry {
        TimelineEntry {
            table_id: "t1".to_string(),
            segment: SpeakerSegment {
                speaker,
                start,
                end: start + 5.0,
                text: text.to_string(),
                confidence: 0.9,
                table_id: "t1".to_string(),
                words: Vec::new(),
            },
        }
    }

    fn detector() -> TopicSteeringDetector {
        TopicSteeringDetector::new(&Policy::default())
    }

    fn session(steering_lines: &[&str]) -> Vec<TimelineEntry> {
        let mut entries = vec![
            entry(1, 0.0, "I'd like to talk about the schedule"),
            entry(2, 10.0, "the library hours are a problem too"),
            entry(3, 20.0, "and the bus route changed last month"),
            entry(4, 30.0, "parking near the school is hard"),
        ];
        for (i, line) in steering_lines.iter().enumerate() {
            entries.push(entry(0, 40.0 + i as f64 * 10.0, line));
        }
        entries
    }

    #[test]
    fn test_flags_persistent_steering() {
        let entries = session(&[
            "Let's get back to the budget, that's the real issue.",
            "More importantly, the budget.",
            "Anyway, as I was saying, the budget.",
        ]);

        let findings = detector().detect(&entries, &[]);

        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.bias_type, BiasType::Topic);
        assert_eq!(finding.category, BiasCategory::TopicSteering);
        assert_eq!(finding.evidence.speakers, vec![0]);
        assert_eq!(finding.impact.affected_participants, vec![1, 2, 3, 4]);
        // 5 matches
        assert!((finding.severity - 0.5).abs() < 1e-9);
        assert_eq!(finding.confidence, 0.72);
        assert!(finding.evidence.excerpt.starts_with("Let's get back to"));
        assert_eq!(finding.evidence.time_range, TimeRange::new(40.0, 45.0));
    }

    #[test]
    fn test_absolute_floor() {
        let entries = session(&["Let's get back to the budget.", "Anyway, the budget."]);

        assert!(detector().detect(&entries, &[]).is_empty());
    }

    #[test]
    fn test_shared_steering_not_flagged() {
        let mut entries = session(&[
            "Let's get back to the budget.",
            "More importantly, the budget.",
            "Anyway, the budget.",
            "Moving on, the budget.",
        ]);
        entries.push(entry(1, 90.0, "Let's focus on the schedule, anyway, moving on."));
        entries.push(entry(2, 100.0, "The real question is hours. Let's get back to hours."));

        assert!(detector().detect(&entries, &[]).is_empty());
    }
}
