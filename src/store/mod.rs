//! Persistence of analysis results.
//!
//! The engine only talks to the `PersistenceSink` trait. Both adapters treat
//! writes as upserts keyed by (session, speaker) for profiles and
//! (session, finding key) for findings, so overlapping runs for the same
//! session converge instead of duplicating rows.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::{BiasFinding, SpeakingTimeProfile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Insert or replace the profile of `speaker_index` in `session_id`.
    async fn upsert_speaking_profile(
        &self,
        session_id: &str,
        speaker_index: u32,
        profile: &SpeakingTimeProfile,
    ) -> Result<(), StoreError>;

    /// Insert or replace a finding, keyed by `BiasFinding::key`.
    async fn insert_bias_finding(
        &self,
        session_id: &str,
        finding: &BiasFinding,
    ) -> Result<(), StoreError>;
}

/// Everything stored for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub profiles: BTreeMap<u32, SpeakingTimeProfile>,
    #[serde(default)]
    pub findings: BTreeMap<String, BiasFinding>,
}

impl SessionRecord {
    pub fn upsert_profile(&mut self, speaker_index: u32, profile: &SpeakingTimeProfile) {
        self.profiles.insert(speaker_index, profile.clone());
    }

    pub fn upsert_finding(&mut self, finding: &BiasFinding) {
        self.findings.insert(finding.key(), finding.clone());
    }
}
