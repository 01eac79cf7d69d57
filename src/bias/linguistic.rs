//! Dismissive language.
//!
//! Compares each speaker's rate of dismissive phrasing with their rate of
//! inclusive phrasing, both normalized per 100 words.

use super::{excerpt_around, BiasDetector, PhraseMatcher};
use crate::models::{
    BiasCategory, BiasFinding, BiasType, DetectionMethod, Evidence, Impact, SpeakingTimeProfile,
    TimeRange, TimelineEntry,
};
use crate::policy::{LinguisticPolicy, Policy};
use std::collections::BTreeMap;

pub struct LinguisticBiasDetector {
    policy: LinguisticPolicy,
    dismissive: PhraseMatcher,
    inclusive: PhraseMatcher,
}

#[derive(Default)]
struct SpeakerLanguage {
    words: usize,
    dismissive: usize,
    inclusive: usize,
    first_excerpt: Option<(String, TimeRange)>,
}

impl LinguisticBiasDetector {
    pub fn new(policy: &Policy) -> Self {
        let linguistic = policy.linguistic.clone();
        Self {
            dismissive: PhraseMatcher::new(&linguistic.dismissive_phrases),
            inclusive: PhraseMatcher::new(&linguistic.inclusive_phrases),
            policy: linguistic,
        }
    }
}

impl BiasDetector for LinguisticBiasDetector {
    fn name(&self) -> &'static str {
        "linguistic"
    }

    fn detect(
        &self,
        entries: &[TimelineEntry],
        _profiles: &[SpeakingTimeProfile],
    ) -> Vec<BiasFinding> {
        let mut by_speaker: BTreeMap<u32, SpeakerLanguage> = BTreeMap::new();

        for entry in entries {
            let text = &entry.segment.text;
            let stats = by_speaker.entry(entry.speaker()).or_default();

            stats.words += entry.segment.word_count();
            stats.inclusive += self.inclusive.count(text);

            let dismissive = self.dismissive.count(text);
            stats.dismissive += dismissive;

            if dismissive > 0 && stats.first_excerpt.is_none() {
                if let Some((start, end)) = self.dismissive.first_match(text) {
                    stats.first_excerpt = Some((
                        excerpt_around(text, start, end, self.policy.excerpt_chars),
                        TimeRange::of_segment(&entry.segment),
                    ));
                }
            }
        }

        let mut findings = Vec::new();

        for (speaker, stats) in by_speaker {
            if stats.words < self.policy.min_words || stats.words == 0 {
                continue;
            }

            let per_hundred = 100.0 / stats.words as f64;
            let dismissive_ratio = stats.dismissive as f64 * per_hundred;
            let inclusive_ratio = stats.inclusive as f64 * per_hundred;

            if dismissive_ratio <= self.policy.ratio_threshold || dismissive_ratio <= inclusive_ratio
            {
                continue;
            }

            let Some((excerpt, time_range)) = stats.first_excerpt else {
                continue;
            };

            findings.push(BiasFinding {
                bias_type: BiasType::Language,
                category: BiasCategory::Dismissal,
                severity: (dismissive_ratio / self.policy.severity_divisor).min(1.0),
                confidence: self.policy.confidence,
                evidence: Evidence {
                    subject: speaker,
                    excerpt,
                    context: format!(
                        "Speaker {} used {} dismissive phrase(s) in {} words ({:.1} per 100 \
                         words) against {:.1} inclusive phrase(s) per 100 words.",
                        speaker, stats.dismissive, stats.words, dismissive_ratio, inclusive_ratio
                    ),
                    time_range,
                    speakers: vec![speaker],
                },
                impact: Impact {
                    affected_participants: Vec::new(),
                    group_dynamics: "Contradicting or talking down to contributions can make \
                                     others hesitant to offer tentative or unfinished ideas."
                        .to_string(),
                    recommended_intervention: format!(
                        "Remind the table of the 'yes, and' norm and ask speaker {} to build on \
                         an idea before challenging it.",
                        speaker
                    ),
                },
                detection_method: DetectionMethod::Pattern,
            });
        }

        findings
    }
}
