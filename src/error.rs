//! Error types for the collaborator boundaries.
//!
//! Data-quality problems (empty input, malformed segments) are not errors:
//! they produce empty or reduced results. Only source and persistence
//! failures, and a detector task that dies, surface here. Store failures are
//! reported in `PersistenceReport` rather than aborting an analysis.

use thiserror::Error;

/// Failures fetching transcripts. The pipeline answers these with fixture data.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Transcript source unavailable for session {session_id}: {reason}")]
    Unavailable { session_id: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transcript request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transcript parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures writing results. These abort persistence but never the computed result.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Bias detector '{detector}' failed: {reason}")]
    DetectorFailed { detector: String, reason: String },

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StoreError::SessionNotFound("s-42".to_string());
        assert_eq!(err.to_string(), "Session not found: s-42");

        let err = SourceError::Unavailable {
            session_id: "s-1".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("s-1"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_analysis_error_wraps_source_error() {
        let err: AnalysisError = SourceError::Unavailable {
            session_id: "s-9".to_string(),
            reason: "timeout".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("Transcript source unavailable for session s-9"));
    }
}
