//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cafescope.toml` files.

use crate::pipeline::FixtureFallback;
use crate::policy::Policy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = ".cafescope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Where transcripts come from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where results go.
    #[serde(default)]
    pub store: StoreConfig,

    /// Detection thresholds and phrase lists.
    #[serde(default)]
    pub policy: Policy,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of sessions analyzed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("cafescope_report.md")
}

fn default_concurrency() -> usize {
    4
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `<transcripts_dir>/<session_id>.json`
    #[default]
    File,
    /// Remote transcription service.
    Http,
    /// Built-in demonstration session.
    Fixture,
}

/// Transcript source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    #[serde(default = "default_transcripts_dir")]
    pub transcripts_dir: PathBuf,

    /// Base URL of the transcription service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub fixture_fallback: FixtureFallback,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            transcripts_dir: default_transcripts_dir(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            fixture_fallback: FixtureFallback::default(),
        }
    }
}

fn default_transcripts_dir() -> PathBuf {
    PathBuf::from("transcripts")
}

fn default_base_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// One JSON document per session directory.
    #[default]
    Json,
    /// Keep results in memory for the duration of the run.
    Memory,
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,

    /// Root directory holding one subdirectory per session.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Create session directories on first write instead of rejecting
    /// unknown sessions.
    #[serde(default)]
    pub create_missing_sessions: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            output_dir: default_output_dir(),
            create_missing_sessions: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".cafescope/sessions")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.transcripts {
            self.source.kind = SourceKind::File;
            self.source.transcripts_dir = dir.clone();
        }
        if let Some(ref url) = args.source_url {
            self.source.kind = SourceKind::Http;
            self.source.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }
        if args.no_fixture_fallback {
            self.source.fixture_fallback = FixtureFallback::Never;
        }

        if let Some(ref dir) = args.store_dir {
            self.store.kind = StoreKind::Json;
            self.store.output_dir = dir.clone();
        }
        if args.create_sessions {
            self.store.create_missing_sessions = true;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Human-readable description of the configured transcript source.
    pub fn source_label(&self) -> String {
        match self.source.kind {
            SourceKind::File => self.source.transcripts_dir.display().to_string(),
            SourceKind::Http => self.source.base_url.clone(),
            SourceKind::Fixture => "fixture".to_string(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.concurrency, 4);
        assert_eq!(config.source.kind, SourceKind::File);
        assert_eq!(config.source.fixture_fallback, FixtureFallback::OnErrorOrEmpty);
        assert_eq!(config.store.kind, StoreKind::Json);
        assert!(!config.store.create_missing_sessions);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true

[source]
kind = "http"
base_url = "http://transcriber:9000"
fixture_fallback = "on_error"

[store]
create_missing_sessions = true

[policy.topic_steering]
absolute_floor = 5
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, PathBuf::from("custom_report.md"));
        assert!(config.general.verbose);
        assert_eq!(config.source.kind, SourceKind::Http);
        assert_eq!(config.source.base_url, "http://transcriber:9000");
        assert_eq!(config.source.timeout_seconds, 30);
        assert_eq!(config.source.fixture_fallback, FixtureFallback::OnError);
        assert!(config.store.create_missing_sessions);
        assert_eq!(config.policy.topic_steering.absolute_floor, 5);
        assert_eq!(config.policy.interruptions.bias_threshold_seconds, 1.0);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let mut args = make_args();
        args.source_url = Some("http://remote:8001".to_string());
        args.no_fixture_fallback = true;
        args.concurrency = Some(8);

        config.merge_with_args(&args);

        assert_eq!(config.source.kind, SourceKind::Http);
        assert_eq!(config.source.base_url, "http://remote:8001");
        assert_eq!(config.source.fixture_fallback, FixtureFallback::Never);
        assert_eq!(config.general.concurrency, 8);
        assert_eq!(config.general.output, PathBuf::from("cafescope_report.md"));
    }

    #[test]
    fn test_merge_keeps_file_values_without_flags() {
        let mut config = Config::default();
        config.general.concurrency = 2;
        config.source.kind = SourceKind::Fixture;

        config.merge_with_args(&make_args());

        assert_eq!(config.general.concurrency, 2);
        assert_eq!(config.source.kind, SourceKind::Fixture);
        assert_eq!(config.source_label(), "fixture");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[policy.participation]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.policy.version, Policy::default().version);
    }
}
