//! In-process store, used for dry runs that still want upsert semantics and
//! for tests.

use super::{PersistenceSink, SessionRecord};
use crate::error::StoreError;
use crate::models::{BiasFinding, SpeakingTimeProfile};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `session_id` known so writes to it are accepted.
    pub async fn register_session(&self, session_id: &str) {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default();
    }

    /// Snapshot of a session's stored rows.
    pub async fn session(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

#[async_trait]
impl PersistenceSink for MemoryStore {
    async fn upsert_speaking_profile(
        &self,
        session_id: &str,
        speaker_index: u32,
        profile: &SpeakingTimeProfile,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
        record.upsert_profile(speaker_index, profile);
        Ok(())
    }

    async fn insert_bias_finding(
        &self,
        session_id: &str,
        finding: &BiasFinding,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
        record.upsert_finding(finding);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BiasCategory, BiasType, DetectionMethod, EngagementLevel, Evidence, Impact, TimeRange,
    };

    fn profile(speaker: u32, total: f64) -> SpeakingTimeProfile {
        SpeakingTimeProfile {
            speaker_index: speaker,
            total_seconds: total,
            percentage: 50.0,
            turn_count: 2,
            average_turn_seconds: total / 2.0,
            min_turn_seconds: 1.0,
            max_turn_seconds: total - 1.0,
            interruptions_given: 0,
            interruptions_received: 0,
            word_count: 10,
            words_per_minute: 100.0,
            dominance_index: 1.0,
            engagement_level: EngagementLevel::Medium,
        }
    }

    fn finding(severity: f64) -> BiasFinding {
        BiasFinding {
            bias_type: BiasType::Topic,
            category: BiasCategory::TopicSteering,
            severity,
            confidence: 0.72,
            evidence: Evidence {
                subject: 4,
                excerpt: "anyway".to_string(),
                context: String::new(),
                time_range: TimeRange::new(0.0, 1.0),
                speakers: vec![4],
            },
            impact: Impact {
                affected_participants: vec![],
                group_dynamics: String::new(),
                recommended_intervention: String::new(),
            },
            detection_method: DetectionMethod::Keyword,
        }
    }

    #[tokio::test]
    async fn test_unknown_session_rejected() {
        let store = MemoryStore::new();

        let err = store
            .upsert_speaking_profile("missing", 0, &profile(0, 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_upserts_converge() {
        let store = MemoryStore::new();
        store.register_session("s1").await;

        store
            .upsert_speaking_profile("s1", 0, &profile(0, 10.0))
            .await
            .unwrap();
        store
            .upsert_speaking_profile("s1", 0, &profile(0, 12.0))
            .await
            .unwrap();
        store.insert_bias_finding("s1", &finding(0.4)).await.unwrap();
        store.insert_bias_finding("s1", &finding(0.6)).await.unwrap();

        let record = store.session("s1").await.unwrap();
        assert_eq!(record.profiles.len(), 1);
        assert_eq!(record.profiles[&0].total_seconds, 12.0);
        assert_eq!(record.findings.len(), 1);
        assert_eq!(record.findings["topic_steering:topic:4"].severity, 0.6);
    }
}
