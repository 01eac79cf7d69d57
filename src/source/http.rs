//! Remote transcript source over HTTP.

use super::TranscriptSource;
use crate::error::SourceError;
use crate::models::TranscriptionUnit;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Fetches `GET {base_url}/sessions/{session_id}/transcriptions`.
pub struct HttpTranscriptSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTranscriptSource {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, session_id: &str) -> String {
        format!("{}/sessions/{}/transcriptions", self.base_url, session_id)
    }
}

#[async_trait]
impl TranscriptSource for HttpTranscriptSource {
    async fn get_transcriptions(
        &self,
        session_id: &str,
    ) -> Result<Vec<TranscriptionUnit>, SourceError> {
        let url = self.url(session_id);
        debug!("Fetching transcripts from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable {
                session_id: session_id.to_string(),
                reason: format!("{} returned {}", url, status),
            });
        }

        Ok(response.json::<Vec<TranscriptionUnit>>().await?)
    }
}
