//! Rule-based conversational bias detection.
//!
//! Four independent detectors share the `BiasDetector` trait; the
//! `BiasEngine` runs them side by side and merges their findings. Every
//! finding carries a verbatim excerpt so a facilitator can audit it.

pub mod engine;
pub mod interruption;
pub mod linguistic;
pub mod participation;
pub mod topic_steering;

pub use engine::{BiasEngine, BiasRun};
pub use interruption::InterruptionBiasDetector;
pub use linguistic::LinguisticBiasDetector;
pub use participation::ParticipationBiasDetector;
pub use topic_steering::TopicSteeringDetector;

use crate::models::{BiasFinding, SpeakingTimeProfile, TimelineEntry};
use regex::Regex;
use tracing::warn;

/// A single bias heuristic.
///
/// Detectors are pure: they read the sorted timeline and the precomputed
/// profiles and never fail on data-quality issues.
pub trait BiasDetector: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn detect(
        &self,
        entries: &[TimelineEntry],
        profiles: &[SpeakingTimeProfile],
    ) -> Vec<BiasFinding>;
}

/// Case-insensitive, word-bounded matcher over a fixed phrase list.
#[derive(Debug, Clone, Default)]
pub struct PhraseMatcher {
    pattern: Option<Regex>,
}

impl PhraseMatcher {
    pub fn new(phrases: &[String]) -> Self {
        let alternatives: Vec<String> = phrases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(bounded_alternative)
            .collect();

        if alternatives.is_empty() {
            return Self { pattern: None };
        }

        let pattern_str = format!(r"(?i)(?:{})", alternatives.join("|"));
        let pattern = match Regex::new(&pattern_str) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Ignoring phrase list that does not compile: {}", e);
                None
            }
        };

        Self { pattern }
    }

    /// Number of non-overlapping phrase matches in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.pattern
            .as_ref()
            .map_or(0, |re| re.find_iter(text).count())
    }

    /// Byte range of the first match in `text`.
    pub fn first_match(&self, text: &str) -> Option<(usize, usize)> {
        self.pattern
            .as_ref()
            .and_then(|re| re.find(text))
            .map(|m| (m.start(), m.end()))
    }
}

/// Escape a phrase and add word boundaries on the edges that are word characters.
fn bounded_alternative(phrase: &str) -> String {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let escaped = regex::escape(phrase).replace('\'', "['’]");

    let mut alternative = String::new();
    if is_word(phrase.chars().next()) {
        alternative.push_str(r"\b");
    }
    alternative.push_str(&escaped);
    if is_word(phrase.chars().last()) {
        alternative.push_str(r"\b");
    }
    alternative
}

/// Cut `text` to a window of `radius` characters around the byte range
/// `[start, end)`, marking elided ends with an ellipsis.
pub fn excerpt_around(text: &str, start: usize, end: usize, radius: usize) -> String {
    let from = if radius == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(radius - 1)
            .map_or(0, |(i, _)| i)
    };
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);

    let mut excerpt = String::new();
    if from > 0 {
        excerpt.push('…');
    }
    excerpt.push_str(text[from..to].trim());
    if to < text.len() {
        excerpt.push('…');
    }
    excerpt
}

/// First `max_chars` characters of `text`, with an ellipsis if cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}…", text[..i].trim_end()),
        None => text.to_string(),
    }
}

/// Last `max_chars` characters of `text`, with an ellipsis if cut.
pub fn tail_chars(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    match text.char_indices().rev().nth(max_chars - 1) {
        Some((i, _)) if i > 0 => format!("…{}", text[i..].trim_start()),
        _ => text.to_string(),
    }
}

pub(crate) fn speaker_list(speakers: &[u32]) -> String {
    speakers
        .iter()
        .map(|s| format!("speaker {}", s))
        .collect::<Vec<_>>()
        .join(", ")
}
