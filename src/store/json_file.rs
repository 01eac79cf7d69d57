//! JSON file store.
//!
//! Each session lives in `<root>/<session_id>/analysis.json`. A session is
//! known when its directory exists; with `create_missing_sessions` the
//! directory is created on first write instead.

use super::{PersistenceSink, SessionRecord};
use crate::error::StoreError;
use crate::models::{BiasFinding, SpeakingTimeProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

const RECORD_FILE: &str = "analysis.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    session_id: String,
    updated_at: DateTime<Utc>,
    record: SessionRecord,
}

pub struct JsonFileStore {
    root: PathBuf,
    create_missing_sessions: bool,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>, create_missing_sessions: bool) -> Self {
        Self {
            root: root.into(),
            create_missing_sessions,
            write_lock: Mutex::new(()),
        }
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    /// Read the stored record for a session, if any.
    pub async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let path = self.session_dir(session_id).join(RECORD_FILE);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        let stored: StoredSession = serde_json::from_str(&content)?;
        Ok(Some(stored.record))
    }

    async fn ensure_session(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        let dir = self.session_dir(session_id);
        if fs::try_exists(&dir).await? {
            return Ok(dir);
        }
        if self.create_missing_sessions {
            fs::create_dir_all(&dir).await?;
            debug!("Created session directory {}", dir.display());
            return Ok(dir);
        }
        Err(StoreError::SessionNotFound(session_id.to_string()))
    }

    async fn update<F>(&self, session_id: &str, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut SessionRecord) + Send,
    {
        let _guard = self.write_lock.lock().await;

        let dir = self.ensure_session(session_id).await?;
        let mut record = self.load(session_id).await?.unwrap_or_default();
        apply(&mut record);

        let stored = StoredSession {
            session_id: session_id.to_string(),
            updated_at: Utc::now(),
            record,
        };
        write_atomically(&dir.join(RECORD_FILE), &serde_json::to_vec_pretty(&stored)?).await
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl PersistenceSink for JsonFileStore {
    async fn upsert_speaking_profile(
        &self,
        session_id: &str,
        speaker_index: u32,
        profile: &SpeakingTimeProfile,
    ) -> Result<(), StoreError> {
        self.update(session_id, |record| record.upsert_profile(speaker_index, profile))
            .await
    }

    async fn insert_bias_finding(
        &self,
        session_id: &str,
        finding: &BiasFinding,
    ) -> Result<(), StoreError> {
        self.update(session_id, |record| record.upsert_finding(finding))
            .await
    }
}
