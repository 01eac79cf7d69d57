//! Session analysis pipeline.
//!
//! Fetch transcripts, build the timeline, profile every speaker, run the
//! bias engine and persist what was computed. All I/O happens here; the
//! analysis stages in between are pure.

use crate::analysis::{aggregate_segments, SpeakingTimeAnalyzer};
use crate::bias::BiasEngine;
use crate::error::AnalysisError;
use crate::models::{AnalysisResult, PersistenceReport, SpeakingTimeProfile, TranscriptionUnit};
use crate::policy::Policy;
use crate::source::fixture::world_cafe_fixture;
use crate::source::TranscriptSource;
use crate::store::PersistenceSink;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// When the built-in fixture session stands in for real transcripts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureFallback {
    /// Source errors propagate and empty sessions yield empty results.
    Never,
    /// Only when the source fails.
    OnError,
    /// When the source fails or returns no transcripts.
    #[default]
    OnErrorOrEmpty,
}

impl FixtureFallback {
    fn on_error(self) -> bool {
        !matches!(self, FixtureFallback::Never)
    }

    fn on_empty(self) -> bool {
        matches!(self, FixtureFallback::OnErrorOrEmpty)
    }
}

pub struct Pipeline {
    source: Arc<dyn TranscriptSource>,
    sink: Option<Arc<dyn PersistenceSink>>,
    analyzer: SpeakingTimeAnalyzer,
    engine: BiasEngine,
    fallback: FixtureFallback,
}

impl Pipeline {
    /// A pipeline that computes results without persisting them.
    pub fn new(source: Arc<dyn TranscriptSource>, policy: &Policy) -> Self {
        Self {
            source,
            sink: None,
            analyzer: SpeakingTimeAnalyzer::new(policy),
            engine: BiasEngine::new(policy),
            fallback: FixtureFallback::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_fallback(mut self, fallback: FixtureFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Fetch and analyze one session.
    ///
    /// Source failures and empty sessions are answered with fixture data
    /// according to the configured `FixtureFallback`; the result is then
    /// marked `degraded`.
    pub async fn analyze_session(&self, session_id: &str) -> Result<AnalysisResult, AnalysisError> {
        let (units, degraded) = match self.source.get_transcriptions(session_id).await {
            Ok(units) if units.is_empty() && self.fallback.on_empty() => {
                warn!(
                    "No transcripts for session {}, analyzing fixture data instead",
                    session_id
                );
                (world_cafe_fixture(), true)
            }
            Ok(units) => (units, false),
            Err(e) if self.fallback.on_error() => {
                warn!(
                    "Transcript source failed for session {} ({}), analyzing fixture data instead",
                    session_id, e
                );
                (world_cafe_fixture(), true)
            }
            Err(e) => return Err(e.into()),
        };

        let mut result = self.analyze_units(session_id, &units).await?;
        result.degraded = degraded;
        Ok(result)
    }

    /// Analyze already-fetched transcripts. Empty input gives empty results.
    pub async fn analyze_units(
        &self,
        session_id: &str,
        units: &[TranscriptionUnit],
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();

        let entries = Arc::new(aggregate_segments(units));
        let profiles = self.analyzer.analyze(&entries);
        debug!(
            "Session {}: {} timeline entries, {} speakers",
            session_id,
            entries.len(),
            profiles.len()
        );

        let mut persistence = PersistenceReport {
            profiles_computed: profiles.len(),
            skipped: self.sink.is_none(),
            ..PersistenceReport::default()
        };

        if let Some(sink) = &self.sink {
            self.persist_profiles(session_id, sink.as_ref(), &profiles, &mut persistence)
                .await;
        }

        // After a failed profile write the session is known to be unwritable.
        let finding_sink = match persistence.failure {
            None => self.sink.as_deref(),
            Some(_) => None,
        };
        let run = self
            .engine
            .detect_and_persist_timeline(
                session_id,
                Arc::clone(&entries),
                &profiles,
                finding_sink,
            )
            .await?;

        persistence.findings_computed = run.findings.len();
        persistence.findings_persisted = run.persisted;
        if persistence.failure.is_none() {
            persistence.failure = run.failure;
        }

        let result = AnalysisResult {
            session_id: session_id.to_string(),
            speaking_time_profiles: profiles,
            bias_findings: run.findings,
            processing_time_ms: started.elapsed().as_millis() as u64,
            degraded: false,
            persistence,
        };

        info!(
            "Analyzed session {}: {} profiles, {} findings in {}ms",
            session_id,
            result.speaking_time_profiles.len(),
            result.bias_findings.len(),
            result.processing_time_ms
        );

        Ok(result)
    }

    async fn persist_profiles(
        &self,
        session_id: &str,
        sink: &dyn PersistenceSink,
        profiles: &[SpeakingTimeProfile],
        report: &mut PersistenceReport,
    ) {
        for profile in profiles {
            match sink
                .upsert_speaking_profile(session_id, profile.speaker_index, profile)
                .await
            {
                Ok(()) => report.profiles_persisted += 1,
                Err(e) => {
                    warn!(
                        "Persisting profiles for session {} stopped after {} of {}: {}",
                        session_id,
                        report.profiles_persisted,
                        profiles.len(),
                        e
                    );
                    report.failure = Some(e.to_string());
                    return;
                }
            }
        }
    }
}
