//! Cafescope - dialogue analytics for World Café sessions
//!
//! A CLI tool that profiles speaking time per speaker, detects
//! interruptions and flags likely conversational bias in session
//! transcripts, then writes a facilitator report.
//!
//! Exit codes:
//!   0 - Success (no findings above threshold, or no --fail-on set)
//!   1 - Runtime error (config, source, a failed session, incomplete persistence)
//!   2 - Findings at or above the --fail-on threshold

mod analysis;
mod bias;
mod cli;
mod config;
mod error;
mod models;
mod pipeline;
mod policy;
mod report;
mod source;
mod store;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, SourceKind, StoreKind, DEFAULT_CONFIG_FILE};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use models::{AnalysisResult, ReportMetadata};
use pipeline::Pipeline;
use source::{FileTranscriptSource, FixtureSource, HttpTranscriptSource, TranscriptSource};
use std::sync::Arc;
use std::time::Instant;
use store::{JsonFileStore, MemoryStore, PersistenceSink};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Cafescope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cafescope.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to choose a transcript source, a store and detection thresholds.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Analyze every requested session and write the report. Returns the exit code.
async fn run_analysis(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let source = build_source(&config)?;
    println!("📥 Transcript source: {}", config.source_label());

    let mut pipeline = Pipeline::new(source, &config.policy)
        .with_fallback(config.source.fixture_fallback);
    if args.dry_run {
        println!("🧪 Dry run: results will not be persisted");
    } else {
        pipeline = pipeline.with_sink(build_store(&config, &args.sessions).await);
    }

    println!(
        "\n🔬 Analyzing {} session(s) (concurrency {})...",
        args.sessions.len(),
        config.general.concurrency
    );
    let (results, failed) =
        analyze_sessions(&pipeline, &args.sessions, config.general.concurrency, args.quiet).await;

    let duration = start_time.elapsed().as_secs_f64();
    let metadata = ReportMetadata {
        analysis_date: Utc::now(),
        source: config.source_label(),
        policy_version: config.policy.version.clone(),
        sessions_analyzed: results.len(),
        sessions_failed: failed,
        sessions_degraded: results.iter().filter(|r| r.degraded).count(),
        duration_seconds: duration,
    };
    let report = report::build_report(metadata, results);

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = &config.general.output;
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    let summary = &report.summary;
    println!("\n📊 Analysis Summary:");
    println!("   Sessions analyzed: {}", report.sessions.len());
    if failed > 0 {
        println!("   Sessions failed: {}", failed);
    }
    println!("   Total findings: {}", summary.total);
    println!(
        "   - 🔴 High: {} | 🟡 Moderate: {} | 🟢 Low: {}",
        summary.high, summary.moderate, summary.low
    );
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Report saved to: {}", output_path.display());

    let incomplete: Vec<&AnalysisResult> = report
        .sessions
        .iter()
        .filter(|r| !r.persistence.is_complete())
        .collect();
    for result in &incomplete {
        eprintln!(
            "⚠️  Session {}: stored {}/{} profiles and {}/{} findings ({})",
            result.session_id,
            result.persistence.profiles_persisted,
            result.persistence.profiles_computed,
            result.persistence.findings_persisted,
            result.persistence.findings_computed,
            result.persistence.failure.as_deref().unwrap_or("unknown error")
        );
    }
    if failed > 0 || !incomplete.is_empty() {
        return Ok(1);
    }

    if let Some(fail_level) = args.fail_on {
        let threshold = fail_level.band();
        let reached = report
            .sessions
            .iter()
            .flat_map(|r| &r.bias_findings)
            .any(|f| f.band() >= threshold);

        if reached {
            eprintln!(
                "\n⛔ Findings at or above {} severity. Failing (exit code 2).",
                threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Run the pipeline over `sessions`, at most `concurrency` at a time.
///
/// Results come back in the order the sessions were requested, together
/// with the number of sessions that failed outright.
async fn analyze_sessions(
    pipeline: &Pipeline,
    sessions: &[String],
    concurrency: usize,
    quiet: bool,
) -> (Vec<AnalysisResult>, usize) {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(sessions.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut outcomes: Vec<(usize, Result<AnalysisResult, error::AnalysisError>)> =
        stream::iter(sessions.iter().enumerate())
            .map(|(index, session_id)| {
                let pb = pb.clone();
                async move {
                    let outcome = pipeline.analyze_session(session_id).await;
                    pb.set_message(session_id.clone());
                    pb.inc(1);
                    (index, outcome)
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;
    pb.finish_and_clear();

    outcomes.sort_by_key(|(index, _)| *index);

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failed = 0;
    for (index, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                error!("Session {} failed: {}", sessions[index], e);
                failed += 1;
            }
        }
    }

    (results, failed)
}

fn build_source(config: &Config) -> Result<Arc<dyn TranscriptSource>> {
    let source: Arc<dyn TranscriptSource> = match config.source.kind {
        SourceKind::File => Arc::new(FileTranscriptSource::new(
            config.source.transcripts_dir.clone(),
        )),
        SourceKind::Http => Arc::new(
            HttpTranscriptSource::new(&config.source.base_url, config.source.timeout_seconds)
                .context("Failed to create HTTP client")?,
        ),
        SourceKind::Fixture => Arc::new(FixtureSource),
    };
    Ok(source)
}

async fn build_store(config: &Config, sessions: &[String]) -> Arc<dyn PersistenceSink> {
    match config.store.kind {
        StoreKind::Json => {
            info!("Persisting results under {}", config.store.output_dir.display());
            Arc::new(JsonFileStore::new(
                config.store.output_dir.clone(),
                config.store.create_missing_sessions,
            ))
        }
        StoreKind::Memory => {
            let store = MemoryStore::new();
            for session_id in sessions {
                store.register_session(session_id).await;
            }
            Arc::new(store)
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
