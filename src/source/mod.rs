//! Transcript sources.
//!
//! The pipeline fetches a session's `TranscriptionUnit`s through the
//! `TranscriptSource` trait. Adapters read local JSON files, call a remote
//! transcription service, or serve the built-in fixture session.

pub mod fixture;
pub mod http;

pub use fixture::FixtureSource;
pub use http::HttpTranscriptSource;

use crate::error::SourceError;
use crate::models::TranscriptionUnit;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// All table transcripts recorded for `session_id`. May be empty.
    async fn get_transcriptions(
        &self,
        session_id: &str,
    ) -> Result<Vec<TranscriptionUnit>, SourceError>;
}

/// Reads `<dir>/<session_id>.json`, a JSON array of transcription units.
#[derive(Debug, Clone)]
pub struct FileTranscriptSource {
    dir: PathBuf,
}

impl FileTranscriptSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TranscriptSource for FileTranscriptSource {
    async fn get_transcriptions(
        &self,
        session_id: &str,
    ) -> Result<Vec<TranscriptionUnit>, SourceError> {
        let path = self.dir.join(format!("{}.json", session_id));

        if !tokio::fs::try_exists(&path).await? {
            return Err(SourceError::Unavailable {
                session_id: session_id.to_string(),
                reason: format!("no transcript file at {}", path.display()),
            });
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let units: Vec<TranscriptionUnit> = serde_json::from_str(&content)?;
        debug!("Loaded {} transcription units from {}", units.len(), path.display());

        Ok(units)
    }
}
