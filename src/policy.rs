//! Heuristic policy: every threshold, weight and phrase list the analyzer
//! and the bias detectors use.
//!
//! The policy is versioned and injected into each component, so it can be
//! recalibrated from `.cafescope.toml` without touching the algorithms.

use serde::{Deserialize, Serialize};

/// Root policy structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Policy version, reported alongside results.
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub interruptions: InterruptionPolicy,

    #[serde(default)]
    pub engagement: EngagementPolicy,

    #[serde(default)]
    pub interruption_bias: InterruptionBiasPolicy,

    #[serde(default)]
    pub participation: ParticipationPolicy,

    #[serde(default)]
    pub linguistic: LinguisticPolicy,

    #[serde(default)]
    pub topic_steering: TopicSteeringPolicy,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            version: default_version(),
            interruptions: InterruptionPolicy::default(),
            engagement: EngagementPolicy::default(),
            interruption_bias: InterruptionBiasPolicy::default(),
            participation: ParticipationPolicy::default(),
            linguistic: LinguisticPolicy::default(),
            topic_steering: TopicSteeringPolicy::default(),
        }
    }
}

fn default_version() -> String {
    "2024.1".to_string()
}

/// Overlap thresholds for the interruption detector.
///
/// The two call sites deliberately keep separate values: per-speaker counters
/// in the speaking-time profiles are more sensitive than the bias flagging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptionPolicy {
    /// Overlap (seconds) counted into `SpeakingTimeProfile` counters.
    #[serde(default = "default_profile_threshold")]
    pub profile_threshold_seconds: f64,

    /// Overlap (seconds) counted by the interruption-bias detector.
    #[serde(default = "default_bias_threshold")]
    pub bias_threshold_seconds: f64,
}

impl Default for InterruptionPolicy {
    fn default() -> Self {
        Self {
            profile_threshold_seconds: default_profile_threshold(),
            bias_threshold_seconds: default_bias_threshold(),
        }
    }
}

fn default_profile_threshold() -> f64 {
    0.5
}

fn default_bias_threshold() -> f64 {
    1.0
}

/// Engagement scoring weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementPolicy {
    pub high_turns: usize,
    pub medium_turns: usize,
    pub high_wpm: f64,
    pub medium_wpm: f64,
    /// Dominance index window that earns the balance point.
    pub balanced_min: f64,
    pub balanced_max: f64,
    pub high_score: u32,
    pub medium_score: u32,
}

impl Default for EngagementPolicy {
    fn default() -> Self {
        Self {
            high_turns: 10,
            medium_turns: 5,
            high_wpm: 120.0,
            medium_wpm: 80.0,
            balanced_min: 0.3,
            balanced_max: 1.5,
            high_score: 4,
            medium_score: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterruptionBiasPolicy {
    /// Flag speakers whose given count exceeds this multiple of the mean.
    pub mean_multiplier: f64,
    /// severity = given / (mean * severity_divisor)
    pub severity_divisor: f64,
    pub confidence: f64,
    /// Evidence snippets kept per speaker.
    pub max_evidence: usize,
    /// Characters kept on each side of an interruption point.
    pub snippet_chars: usize,
}

impl Default for InterruptionBiasPolicy {
    fn default() -> Self {
        Self {
            mean_multiplier: 2.5,
            severity_divisor: 4.0,
            confidence: 0.75,
            max_evidence: 3,
            snippet_chars: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipationPolicy {
    pub min_speakers: usize,
    /// Dominant: percentage above this multiple of the equal share...
    pub dominant_share_multiplier: f64,
    /// ...and a dominance index above this floor.
    pub dominant_index_floor: f64,
    /// Marginalized: percentage below this multiple of the equal share...
    pub marginal_share_multiplier: f64,
    /// ...and fewer turns than this.
    pub marginal_max_turns: usize,
    pub confidence: f64,
}

impl Default for ParticipationPolicy {
    fn default() -> Self {
        Self {
            min_speakers: 3,
            dominant_share_multiplier: 2.0,
            dominant_index_floor: 2.0,
            marginal_share_multiplier: 0.3,
            marginal_max_turns: 3,
            confidence: 0.82,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinguisticPolicy {
    /// Speakers below this cumulative word count are not judged.
    pub min_words: usize,
    /// Dismissive matches per 100 words that must be exceeded.
    pub ratio_threshold: f64,
    pub severity_divisor: f64,
    pub confidence: f64,
    pub excerpt_chars: usize,
    /// Contradiction, condescension and self-repetition markers.
    pub dismissive_phrases: Vec<String>,
    /// Tentative, curious and building-on markers.
    pub inclusive_phrases: Vec<String>,
}

impl Default for LinguisticPolicy {
    fn default() -> Self {
        Self {
            min_words: 50,
            ratio_threshold: 1.0,
            severity_divisor: 10.0,
            confidence: 0.68,
            excerpt_chars: 60,
            dismissive_phrases: to_strings(&[
                "well actually",
                "actually no",
                "that's not right",
                "that is not right",
                "that's wrong",
                "you're wrong",
                "doesn't make sense",
                "does not make sense",
                "obviously",
                "you don't understand",
                "let me explain",
                "calm down",
                "it's simple",
                "as i said",
                "like i said",
                "i already said",
                "as i already mentioned",
            ]),
            inclusive_phrases: to_strings(&[
                "what do you think",
                "i wonder",
                "building on",
                "to add to",
                "good point",
                "i agree with",
                "could you say more",
                "tell us more",
                "maybe we could",
                "what if we",
                "i'm curious",
                "perhaps",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicSteeringPolicy {
    /// Flag counts above this multiple of the cross-speaker mean...
    pub mean_multiplier: f64,
    /// ...and above this absolute floor.
    pub absolute_floor: usize,
    pub severity_divisor: f64,
    pub confidence: f64,
    pub excerpt_chars: usize,
    /// Redirect, priority-claim and return-to-point markers.
    pub phrases: Vec<String>,
}

impl Default for TopicSteeringPolicy {
    fn default() -> Self {
        Self {
            mean_multiplier: 3.0,
            absolute_floor: 3,
            severity_divisor: 10.0,
            confidence: 0.72,
            excerpt_chars: 120,
            phrases: to_strings(&[
                "let's get back to",
                "let's go back to",
                "back to my point",
                "as i was saying",
                "more importantly",
                "the real issue",
                "the real question",
                "what really matters",
                "the main thing is",
                "let's focus on",
                "moving on",
                "anyway",
            ]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
