//! Data models for the dialogue analytics engine.
//!
//! This module contains the core data structures shared by the analyzer,
//! the bias detectors, the collaborators and the report renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single word with its timing, when the transcriber provides one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// A contiguous span of speech attributed to one speaker index at one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    /// Session-scoped speaker index (not a stable identity).
    pub speaker: u32,
    /// Start time in seconds from session start.
    pub start: f64,
    /// End time in seconds from session start.
    pub end: f64,
    /// Transcript text of the span.
    pub text: String,
    /// Transcriber confidence for the span.
    #[serde(default)]
    pub confidence: f64,
    /// Table the span was recorded at.
    #[serde(default)]
    pub table_id: String,
    /// Word-level timestamps, if present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<WordTimestamp>,
}

impl SpeakerSegment {
    /// Length of the segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the segment can take part in aggregate statistics.
    pub fn is_well_formed(&self) -> bool {
        self.end > self.start && !self.text.trim().is_empty()
    }

    /// Word count: the word-timestamp list wins over tokenizing the text.
    pub fn word_count(&self) -> usize {
        if self.words.is_empty() {
            self.text.split_whitespace().count()
        } else {
            self.words.len()
        }
    }
}

/// One table's contribution to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionUnit {
    pub table_id: String,
    #[serde(default)]
    pub full_text: String,
    pub segments: Vec<SpeakerSegment>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub confidence: f64,
}

fn default_language() -> String {
    "en".to_string()
}

/// A segment placed on the session-wide timeline, paired with its table.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub table_id: String,
    pub segment: SpeakerSegment,
}

impl TimelineEntry {
    pub fn speaker(&self) -> u32 {
        self.segment.speaker
    }
}

/// Categorical summary of participation intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for EngagementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngagementLevel::Low => write!(f, "low"),
            EngagementLevel::Medium => write!(f, "medium"),
            EngagementLevel::High => write!(f, "high"),
        }
    }
}

/// Per-speaker participation statistics for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakingTimeProfile {
    /// Speaker index the profile describes.
    pub speaker_index: u32,
    /// Sum of segment durations in seconds.
    pub total_seconds: f64,
    /// Share of session time, 0-100.
    pub percentage: f64,
    /// Number of segments (turns).
    pub turn_count: usize,
    pub average_turn_seconds: f64,
    pub min_turn_seconds: f64,
    pub max_turn_seconds: f64,
    /// Interruptions this speaker made.
    pub interruptions_given: usize,
    /// Interruptions this speaker suffered.
    pub interruptions_received: usize,
    /// Total words spoken.
    pub word_count: usize,
    pub words_per_minute: f64,
    /// Ratio of actual share to the equal-share baseline; 1.0 is an equal share.
    pub dominance_index: f64,
    pub engagement_level: EngagementLevel,
}

/// What kind of bias a finding describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasType {
    Gender,
    Cultural,
    Topic,
    Participation,
    Language,
}

impl fmt::Display for BiasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BiasType::Gender => "gender",
            BiasType::Cultural => "cultural",
            BiasType::Topic => "topic",
            BiasType::Participation => "participation",
            BiasType::Language => "language",
        };
        write!(f, "{}", s)
    }
}

/// The conversational pattern behind a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasCategory {
    Interruption,
    Dismissal,
    TopicSteering,
    Exclusion,
}

impl fmt::Display for BiasCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BiasCategory::Interruption => "interruption",
            BiasCategory::Dismissal => "dismissal",
            BiasCategory::TopicSteering => "topic_steering",
            BiasCategory::Exclusion => "exclusion",
        };
        write!(f, "{}", s)
    }
}

/// How a finding was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Keyword,
    Pattern,
    Behavioral,
    MlModel,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DetectionMethod::Keyword => "keyword",
            DetectionMethod::Pattern => "pattern",
            DetectionMethod::Behavioral => "behavioral",
            DetectionMethod::MlModel => "ml_model",
        };
        write!(f, "{}", s)
    }
}

/// A `[start, end]` window on the session timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Full-session range, used when a finding cannot be localized more precisely.
    pub fn session(entries: &[TimelineEntry]) -> Self {
        let start = entries
            .iter()
            .map(|e| e.segment.start)
            .fold(f64::INFINITY, f64::min);
        let end = entries
            .iter()
            .map(|e| e.segment.end)
            .fold(f64::NEG_INFINITY, f64::max);

        if start.is_finite() && end.is_finite() {
            Self { start, end }
        } else {
            Self { start: 0.0, end: 0.0 }
        }
    }

    pub fn of_segment(segment: &SpeakerSegment) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}s-{:.1}s", self.start, self.end)
    }
}

/// What a finding is based on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Speaker the finding is about. Identifies the finding within its
    /// category for upserts.
    pub subject: u32,
    /// Verbatim text excerpt.
    pub excerpt: String,
    /// Human-readable narrative.
    pub context: String,
    pub time_range: TimeRange,
    /// Speaker indices implicated by the finding.
    pub speakers: Vec<u32>,
}

/// Who is affected and what a facilitator could do about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub affected_participants: Vec<u32>,
    pub group_dynamics: String,
    pub recommended_intervention: String,
}

/// A structured, evidenced flag of a likely conversational bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasFinding {
    #[serde(rename = "type")]
    pub bias_type: BiasType,
    pub category: BiasCategory,
    /// 0.0-1.0
    pub severity: f64,
    /// 0.0-1.0
    pub confidence: f64,
    pub evidence: Evidence,
    pub impact: Impact,
    pub detection_method: DetectionMethod,
}

impl BiasFinding {
    /// Stable identity of the finding within a session, used for upserts.
    ///
    /// Two findings of one category never share a subject, so the key does
    /// not depend on who else is implicated.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.category, self.bias_type, self.evidence.subject
        )
    }

    pub fn band(&self) -> SeverityBand {
        SeverityBand::from_score(self.severity)
    }
}

/// Presentation bucket for a numeric severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    Low,
    Moderate,
    High,
}

impl SeverityBand {
    pub fn from_score(severity: f64) -> Self {
        if severity >= 0.7 {
            SeverityBand::High
        } else if severity >= 0.4 {
            SeverityBand::Moderate
        } else {
            SeverityBand::Low
        }
    }

    /// Returns an emoji representation of the band.
    pub fn emoji(&self) -> &'static str {
        match self {
            SeverityBand::Low => "🟢",
            SeverityBand::Moderate => "🟡",
            SeverityBand::High => "🔴",
        }
    }
}

impl fmt::Display for SeverityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityBand::Low => write!(f, "Low"),
            SeverityBand::Moderate => write!(f, "Moderate"),
            SeverityBand::High => write!(f, "High"),
        }
    }
}

/// Computed-versus-persisted counts for one analysis run.
///
/// A run whose persistence stopped part-way still carries every computed
/// profile and finding; `failure` says why the writes stopped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistenceReport {
    pub profiles_computed: usize,
    pub profiles_persisted: usize,
    pub findings_computed: usize,
    pub findings_persisted: usize,
    /// Whether persistence was skipped on purpose (dry run).
    #[serde(default)]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl PersistenceReport {
    /// True when every computed row was written, or writing was skipped on purpose.
    pub fn is_complete(&self) -> bool {
        if self.skipped {
            return self.failure.is_none();
        }
        self.failure.is_none()
            && self.profiles_persisted == self.profiles_computed
            && self.findings_persisted == self.findings_computed
    }
}

/// Result of analyzing one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub session_id: String,
    pub speaking_time_profiles: Vec<SpeakingTimeProfile>,
    pub bias_findings: Vec<BiasFinding>,
    pub processing_time_ms: u64,
    /// Set when fixture data stood in for an empty or unreachable source.
    #[serde(default)]
    pub degraded: bool,
    pub persistence: PersistenceReport,
}

impl AnalysisResult {
    /// Highest finding severity, if any.
    pub fn max_severity(&self) -> Option<f64> {
        self.bias_findings
            .iter()
            .map(|f| f.severity)
            .reduce(f64::max)
    }
}

/// Finding counts across all analyzed sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingSummary {
    pub total: usize,
    pub high: usize,
    pub moderate: usize,
    pub low: usize,
    /// Finding count per bias category.
    pub by_category: BTreeMap<String, usize>,
}

impl FindingSummary {
    pub fn from_results(results: &[AnalysisResult]) -> Self {
        let mut summary = Self::default();

        for finding in results.iter().flat_map(|r| &r.bias_findings) {
            summary.total += 1;
            match finding.band() {
                SeverityBand::High => summary.high += 1,
                SeverityBand::Moderate => summary.moderate += 1,
                SeverityBand::Low => summary.low += 1,
            }
            *summary
                .by_category
                .entry(finding.category.to_string())
                .or_insert(0) += 1;
        }

        summary
    }
}

/// Metadata about a report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// When the report was generated.
    pub analysis_date: DateTime<Utc>,
    /// Where transcripts came from (directory, URL or "fixture").
    pub source: String,
    /// Version of the detection policy in force.
    pub policy_version: String,
    pub sessions_analyzed: usize,
    /// Sessions that failed outright and are missing from the report.
    pub sessions_failed: usize,
    /// Sessions analyzed on fixture data.
    pub sessions_degraded: usize,
    pub duration_seconds: f64,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub sessions: Vec<AnalysisResult>,
    pub summary: FindingSummary,
    /// Facilitator actions, most severe first.
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(speaker: u32, start: f64, end: f64, text: &str) -> SpeakerSegment {
        SpeakerSegment {
            speaker,
            start,
            end,
            text: text.to_string(),
            confidence: 0.9,
            table_id: "t1".to_string(),
            words: Vec::new(),
        }
    }

    fn finding(subject: u32, speakers: Vec<u32>, severity: f64) -> BiasFinding {
        BiasFinding {
            bias_type: BiasType::Participation,
            category: BiasCategory::Exclusion,
            severity,
            confidence: 0.82,
            evidence: Evidence {
                subject,
                excerpt: "x".to_string(),
                context: "y".to_string(),
                time_range: TimeRange::new(0.0, 1.0),
                speakers,
            },
            impact: Impact {
                affected_participants: vec![],
                group_dynamics: String::new(),
                recommended_intervention: String::new(),
            },
            detection_method: DetectionMethod::Behavioral,
        }
    }

    #[test]
    fn test_segment_well_formed() {
        assert!(segment(0, 1.0, 2.0, "hello").is_well_formed());
        assert!(!segment(0, 2.0, 2.0, "hello").is_well_formed());
        assert!(!segment(0, 3.0, 2.0, "hello").is_well_formed());
        assert!(!segment(0, 1.0, 2.0, "   ").is_well_formed());
    }

    #[test]
    fn test_word_count_prefers_timestamps() {
        let mut seg = segment(0, 0.0, 2.0, "one two three");
        assert_eq!(seg.word_count(), 3);

        seg.words = vec![WordTimestamp {
            word: "one".to_string(),
            start: 0.0,
            end: 0.5,
        }];
        assert_eq!(seg.word_count(), 1);
    }

    #[test]
    fn test_session_range() {
        let entries = vec![
            TimelineEntry {
                table_id: "t1".to_string(),
                segment: segment(0, 2.0, 5.0, "a"),
            },
            TimelineEntry {
                table_id: "t2".to_string(),
                segment: segment(1, 1.0, 9.0, "b"),
            },
        ];
        assert_eq!(TimeRange::session(&entries), TimeRange::new(1.0, 9.0));
        assert_eq!(TimeRange::session(&[]), TimeRange::new(0.0, 0.0));
    }

    #[test]
    fn test_finding_key_follows_subject() {
        assert_eq!(
            finding(3, vec![3, 1], 0.5).key(),
            finding(3, vec![3, 1, 1], 0.9).key()
        );
        assert_eq!(finding(1, vec![1], 0.5).key(), "exclusion:participation:1");
        // Mutual interruptions implicate the same speakers but are two findings.
        assert_ne!(
            finding(0, vec![0, 1], 0.5).key(),
            finding(1, vec![1, 0], 0.5).key()
        );
    }

    #[test]
    fn test_severity_band() {
        assert_eq!(SeverityBand::from_score(0.1), SeverityBand::Low);
        assert_eq!(SeverityBand::from_score(0.4), SeverityBand::Moderate);
        assert_eq!(SeverityBand::from_score(0.95), SeverityBand::High);
        assert!(SeverityBand::Low < SeverityBand::High);
    }

    #[test]
    fn test_finding_serializes_type_field() {
        let json = serde_json::to_string(&finding(1, vec![1], 0.5)).unwrap();
        assert!(json.contains("\"type\":\"participation\""));
        assert!(json.contains("\"category\":\"exclusion\""));
        assert!(json.contains("\"detection_method\":\"behavioral\""));
    }

    #[test]
    fn test_persistence_report_completeness() {
        let mut report = PersistenceReport {
            profiles_computed: 2,
            profiles_persisted: 2,
            findings_computed: 1,
            findings_persisted: 1,
            skipped: false,
            failure: None,
        };
        assert!(report.is_complete());

        report.findings_persisted = 0;
        report.failure = Some("session not found".to_string());
        assert!(!report.is_complete());
    }

    #[test]
    fn test_segment_deserializes_without_optional_fields() {
        let json = r#"{"speaker": 2, "start": 1.5, "end": 3.0, "text": "hi there"}"#;
        let seg: SpeakerSegment = serde_json::from_str(json).unwrap();
        assert_eq!(seg.speaker, 2);
        assert!(seg.words.is_empty());
        assert_eq!(seg.table_id, "");
    }
}
