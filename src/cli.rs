//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::SeverityBand;
use clap::Parser;
use std::path::PathBuf;

/// Cafescope - conversational dynamics and bias analytics for World Café sessions
///
/// Profiles who speaks, for how long and how often they interrupt, then
/// flags likely conversational bias with verbatim evidence.
///
/// Examples:
///   cafescope --session cafe-1
///   cafescope --session cafe-1,cafe-2 --transcripts ./transcripts --format json
///   cafescope --session cafe-1 --source-url http://localhost:8001 --fail-on high
///   cafescope --session cafe-1 --dry-run
///   cafescope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Session ids to analyze (comma-separated)
    #[arg(
        short,
        long = "session",
        value_name = "ID",
        value_delimiter = ',',
        required_unless_present = "init_config"
    )]
    pub sessions: Vec<String>,

    /// Directory holding `<session>.json` transcript files
    #[arg(long, value_name = "DIR", env = "CAFESCOPE_TRANSCRIPTS")]
    pub transcripts: Option<PathBuf>,

    /// Base URL of the transcription service
    #[arg(
        long,
        value_name = "URL",
        env = "CAFESCOPE_SOURCE_URL",
        conflicts_with = "transcripts"
    )]
    pub source_url: Option<String>,

    /// Transcript request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Root directory of the session result store
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Create missing session directories in the store instead of failing
    #[arg(long)]
    pub create_sessions: bool,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Number of sessions analyzed at the same time
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Fail if a finding at or above this severity is found
    ///
    /// Useful for scheduled runs. Exit code 2 when threshold is reached.
    /// Values: high, moderate, low
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Report source failures instead of analyzing the demonstration session
    #[arg(long)]
    pub no_fixture_fallback: bool,

    /// Dry run: analyze and report without writing to the store
    #[arg(long)]
    pub dry_run: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cafescope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .cafescope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Severity level for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Low,
    Moderate,
    High,
}

impl FailOnLevel {
    pub fn band(self) -> SeverityBand {
        match self {
            FailOnLevel::Low => SeverityBand::Low,
            FailOnLevel::Moderate => SeverityBand::Moderate,
            FailOnLevel::High => SeverityBand::High,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.sessions.iter().any(|s| s.trim().is_empty()) {
            return Err("Session ids must not be empty".to_string());
        }

        // Session ids become file and directory names under the store root.
        if let Some(bad) = self
            .sessions
            .iter()
            .find(|s| s.contains('/') || s.contains('\\') || s.contains(".."))
        {
            return Err(format!(
                "Session id '{}' must not contain path separators or '..'",
                bad
            ));
        }

        if let Some(ref url) = self.source_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Source URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref dir) = self.transcripts {
            if !dir.is_dir() {
                return Err(format!(
                    "Transcript directory does not exist: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            sessions: vec!["cafe-1".to_string()],
            transcripts: None,
            source_url: None,
            timeout: None,
            store_dir: None,
            create_sessions: false,
            output: None,
            format: OutputFormat::Markdown,
            concurrency: None,
            fail_on: None,
            no_fixture_fallback: false,
            dry_run: false,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_session_list() {
        let args = Args::try_parse_from(["cafescope", "--session", "a,b", "--fail-on", "moderate"])
            .unwrap();
        assert_eq!(args.sessions, vec!["a", "b"]);
        assert_eq!(args.fail_on, Some(FailOnLevel::Moderate));
        assert_eq!(args.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_session_required_unless_init_config() {
        assert!(Args::try_parse_from(["cafescope"]).is_err());
        assert!(Args::try_parse_from(["cafescope", "--init-config"]).is_ok());
    }

    #[test]
    fn test_validation_rejects_path_like_session_ids() {
        for id in ["../x", "a/b", "a\\b", ".."] {
            let mut args = make_args();
            args.sessions = vec![id.to_string()];
            assert!(args.validate().is_err(), "{} should be rejected", id);
        }

        let mut args = make_args();
        args.sessions = vec!["cafe-2024.03".to_string()];
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.source_url = Some("localhost:8001".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_transcript_dir() {
        let mut args = make_args();
        args.transcripts = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_fail_on_maps_to_band() {
        assert_eq!(FailOnLevel::High.band(), SeverityBand::High);
        assert!(FailOnLevel::Low.band() < FailOnLevel::Moderate.band());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
