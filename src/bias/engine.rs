//! Runs every detector over a session and persists what they find.

use super::{
    BiasDetector, InterruptionBiasDetector, LinguisticBiasDetector, ParticipationBiasDetector,
    TopicSteeringDetector,
};
use crate::analysis::aggregate_segments;
use crate::error::AnalysisError;
use crate::models::{BiasFinding, SpeakingTimeProfile, TimelineEntry, TranscriptionUnit};
use crate::policy::Policy;
use crate::store::PersistenceSink;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of `BiasEngine::detect_and_persist_timeline`.
#[derive(Debug, Default)]
pub struct BiasRun {
    pub findings: Vec<BiasFinding>,
    /// Findings the sink accepted before any failure.
    pub persisted: usize,
    pub failure: Option<String>,
}

pub struct BiasEngine {
    detectors: Vec<Arc<dyn BiasDetector>>,
}

impl BiasEngine {
    /// The four standard detectors, in merge order.
    pub fn new(policy: &Policy) -> Self {
        let detectors: Vec<Arc<dyn BiasDetector>> = vec![
            Arc::new(InterruptionBiasDetector::new(policy)),
            Arc::new(ParticipationBiasDetector::new(policy)),
            Arc::new(LinguisticBiasDetector::new(policy)),
            Arc::new(TopicSteeringDetector::new(policy)),
        ];
        Self { detectors }
    }

    #[cfg(test)]
    fn with_detectors(detectors: Vec<Arc<dyn BiasDetector>>) -> Self {
        Self { detectors }
    }

    /// Run each detector on its own blocking task and merge once all finish.
    ///
    /// Findings come back in detector order regardless of which task
    /// completes first.
    pub async fn detect(
        &self,
        entries: Arc<Vec<TimelineEntry>>,
        profiles: Arc<Vec<SpeakingTimeProfile>>,
    ) -> Result<Vec<BiasFinding>, AnalysisError> {
        let tasks = self.detectors.iter().map(|detector| {
            let detector = Arc::clone(detector);
            let entries = Arc::clone(&entries);
            let profiles = Arc::clone(&profiles);
            let name = detector.name();
            let handle =
                tokio::task::spawn_blocking(move || detector.detect(&entries, &profiles));
            async move { (name, handle.await) }
        });

        let mut findings = Vec::new();
        for (name, joined) in join_all(tasks).await {
            let mut found = joined.map_err(|e| AnalysisError::DetectorFailed {
                detector: name.to_string(),
                reason: e.to_string(),
            })?;
            debug!("Detector {} produced {} findings", name, found.len());
            findings.append(&mut found);
        }

        Ok(findings)
    }

    /// Aggregate `units` and hand them to `detect_and_persist_timeline`.
    pub async fn detect_and_persist(
        &self,
        session_id: &str,
        units: &[TranscriptionUnit],
        profiles: &[SpeakingTimeProfile],
        sink: Option<&dyn PersistenceSink>,
    ) -> Result<BiasRun, AnalysisError> {
        let entries = Arc::new(aggregate_segments(units));
        self.detect_and_persist_timeline(session_id, entries, profiles, sink)
            .await
    }

    /// Detect over an aggregated timeline, then write every finding to `sink`.
    ///
    /// Empty input short-circuits: no detector runs and the sink is never
    /// called. The first sink error stops further writes and is reported in
    /// `BiasRun::failure`; the findings are returned either way.
    pub async fn detect_and_persist_timeline(
        &self,
        session_id: &str,
        entries: Arc<Vec<TimelineEntry>>,
        profiles: &[SpeakingTimeProfile],
        sink: Option<&dyn PersistenceSink>,
    ) -> Result<BiasRun, AnalysisError> {
        if entries.is_empty() {
            debug!("No usable segments for session {}, skipping bias detection", session_id);
            return Ok(BiasRun::default());
        }

        let findings = self
            .detect(entries, Arc::new(profiles.to_vec()))
            .await?;

        let mut run = BiasRun {
            findings,
            ..BiasRun::default()
        };

        if let Some(sink) = sink {
            for finding in &run.findings {
                if let Err(e) = sink.insert_bias_finding(session_id, finding).await {
                    warn!(
                        "Persisting bias findings for session {} stopped after {} of {}: {}",
                        session_id,
                        run.persisted,
                        run.findings.len(),
                        e
                    );
                    run.failure = Some(e.to_string());
                    break;
                }
                run.persisted += 1;
            }
        }

        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SpeakingTimeAnalyzer;
    use crate::models::{BiasCategory, SpeakerSegment};
    use crate::store::MemoryStore;

    fn seg(speaker: u32, start: f64, end: f64, text: &str) -> SpeakerSegment {
        SpeakerSegment {
            speaker,
            start,
            end,
            text: text.to_string(),
            confidence: 0.9,
            table_id: String::new(),
            words: Vec::new(),
        }
    }

    fn unit(segments: Vec<SpeakerSegment>) -> TranscriptionUnit {
        TranscriptionUnit {
            table_id: "t1".to_string(),
            full_text: String::new(),
            segments,
            language: "en".to_string(),
            confidence: 0.9,
        }
    }

    /// Speaker 1 holds the floor for 80% of a three-person conversation.
    fn dominated_session() -> Vec<TranscriptionUnit> {
        vec![unit(vec![
            seg(1, 0.0, 40.0, "I think we should start with the budget and nothing else"),
            seg(2, 40.0, 52.0, "Could we also talk about volunteers"),
            seg(1, 52.0, 92.0, "The budget comes first and then everything follows from it"),
            seg(3, 92.0, 100.0, "Sure"),
        ])]
    }

    /// Speakers 0 and 1 cut each other off three times apiece with 2s
    /// overlaps; speakers 2 to 5 each speak once without overlap.
    fn mutual_interruptions() -> Vec<TranscriptionUnit> {
        let mut segments = Vec::new();
        for turn in 0..7 {
            let start = turn as f64 * 8.0;
            segments.push(seg(turn % 2, start, start + 10.0, "let me finish this point please"));
        }
        for (i, speaker) in (2..6).enumerate() {
            let start = 60.0 + i as f64 * 6.0;
            segments.push(seg(speaker, start, start + 5.0, "I agree with that"));
        }
        vec![unit(segments)]
    }

    struct Panicking;

    impl BiasDetector for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn detect(&self, _: &[TimelineEntry], _: &[SpeakingTimeProfile]) -> Vec<BiasFinding> {
            panic!("detector blew up")
        }
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits() {
        let engine = BiasEngine::new(&Policy::default());
        let store = MemoryStore::new();

        let run = engine
            .detect_and_persist("s1", &[], &[], Some(&store))
            .await
            .unwrap();

        assert!(run.findings.is_empty());
        assert_eq!(run.persisted, 0);
        assert!(run.failure.is_none());
        // The session was never registered, so any sink call would have failed.
        assert!(store.session("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let policy = Policy::default();
        let engine = BiasEngine::new(&policy);
        let entries = aggregate_segments(&dominated_session());
        let profiles = SpeakingTimeAnalyzer::new(&policy).analyze(&entries);

        let sequential: Vec<BiasFinding> = engine
            .detectors
            .iter()
            .flat_map(|d| d.detect(&entries, &profiles))
            .collect();
        let parallel = engine
            .detect(Arc::new(entries), Arc::new(profiles))
            .await
            .unwrap();

        assert_eq!(sequential, parallel);
        assert!(parallel
            .iter()
            .any(|f| f.category == BiasCategory::Exclusion));
    }

    #[tokio::test]
    async fn test_findings_are_persisted() {
        let policy = Policy::default();
        let engine = BiasEngine::new(&policy);
        let entries = aggregate_segments(&dominated_session());
        let profiles = SpeakingTimeAnalyzer::new(&policy).analyze(&entries);
        let store = MemoryStore::new();
        store.register_session("s1").await;

        let run = engine
            .detect_and_persist_timeline(
                "s1",
                Arc::new(entries),
                &profiles,
                Some(&store),
            )
            .await
            .unwrap();

        assert!(!run.findings.is_empty());
        assert_eq!(run.persisted, run.findings.len());
        assert!(run.failure.is_none());
        let record = store.session("s1").await.unwrap();
        assert_eq!(record.findings.len(), run.findings.len());
    }

    #[tokio::test]
    async fn test_unknown_session_keeps_findings() {
        let policy = Policy::default();
        let engine = BiasEngine::new(&policy);
        let entries = aggregate_segments(&dominated_session());
        let profiles = SpeakingTimeAnalyzer::new(&policy).analyze(&entries);
        let store = MemoryStore::new();

        let run = engine
            .detect_and_persist_timeline(
                "ghost",
                Arc::new(entries),
                &profiles,
                Some(&store),
            )
            .await
            .unwrap();

        assert!(!run.findings.is_empty());
        assert_eq!(run.persisted, 0);
        assert!(run.failure.unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn test_mutual_interrupters_are_stored_separately() {
        let policy = Policy::default();
        let engine = BiasEngine::new(&policy);
        let units = mutual_interruptions();
        let profiles = SpeakingTimeAnalyzer::new(&policy).analyze(&aggregate_segments(&units));
        let store = MemoryStore::new();
        store.register_session("s1").await;

        let run = engine
            .detect_and_persist("s1", &units, &profiles, Some(&store))
            .await
            .unwrap();

        let interruptions: Vec<&BiasFinding> = run
            .findings
            .iter()
            .filter(|f| f.category == BiasCategory::Interruption)
            .collect();
        assert_eq!(interruptions.len(), 2);
        assert_eq!(interruptions[0].evidence.speakers, vec![0, 1]);
        assert_eq!(interruptions[1].evidence.speakers, vec![1, 0]);
        assert_ne!(interruptions[0].key(), interruptions[1].key());

        let record = store.session("s1").await.unwrap();
        assert_eq!(run.persisted, run.findings.len());
        assert_eq!(record.findings.len(), run.findings.len());
        assert!(record.findings.contains_key("interruption:participation:0"));
        assert!(record.findings.contains_key("interruption:participation:1"));
    }

    #[tokio::test]
    async fn test_detector_panic_is_reported() {
        let engine = BiasEngine::with_detectors(vec![Arc::new(Panicking) as Arc<dyn BiasDetector>]);
        let entries = aggregate_segments(&dominated_session());

        let err = engine
            .detect(Arc::new(entries), Arc::new(Vec::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::DetectorFailed { detector, .. } if detector == "panicking"));
    }
}
