//! Markdown report generation.
//!
//! This module renders facilitator-facing Markdown reports from the
//! per-session analysis results.

use crate::analysis::facilitator_recommendations;
use crate::models::{
    AnalysisResult, BiasFinding, FindingSummary, Report, ReportMetadata, SeverityBand,
    SpeakingTimeProfile,
};
use anyhow::Result;

const MAX_RECOMMENDATIONS: usize = 5;

/// Assemble a report, computing its summary and recommendations.
pub fn build_report(metadata: ReportMetadata, sessions: Vec<AnalysisResult>) -> Report {
    let summary = FindingSummary::from_results(&sessions);
    let recommendations = facilitator_recommendations(&sessions, MAX_RECOMMENDATIONS);

    Report {
        metadata,
        sessions,
        summary,
        recommendations,
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Cafescope Dialogue Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str(&generate_summary_section(&report.summary));

    for session in &report.sessions {
        output.push_str(&generate_session_section(session));
    }

    output.push_str(&generate_recommendations_section(&report.recommendations));

    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Transcript Source:** {}\n", metadata.source));
    section.push_str(&format!("- **Policy Version:** `{}`\n", metadata.policy_version));
    section.push_str(&format!(
        "- **Sessions Analyzed:** {}\n",
        metadata.sessions_analyzed
    ));
    if metadata.sessions_failed > 0 {
        section.push_str(&format!(
            "- **Sessions Failed:** {}\n",
            metadata.sessions_failed
        ));
    }
    if metadata.sessions_degraded > 0 {
        section.push_str(&format!(
            "- **Sessions on Fixture Data:** {}\n",
            metadata.sessions_degraded
        ));
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

fn generate_summary_section(summary: &FindingSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "| {} High | {} Moderate | {} Low | **Total** |\n",
        SeverityBand::High.emoji(),
        SeverityBand::Moderate.emoji(),
        SeverityBand::Low.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        summary.high, summary.moderate, summary.low, summary.total
    ));

    if !summary.by_category.is_empty() {
        section.push_str("### Findings by Category\n\n");
        section.push_str("| Category | Count |\n");
        section.push_str("|:---|:---:|\n");

        let mut categories: Vec<_> = summary.by_category.iter().collect();
        categories.sort_by_key(|(_, count)| std::cmp::Reverse(*count));

        for (category, count) in categories {
            section.push_str(&format!("| {} | {} |\n", category, count));
        }
        section.push('\n');
    }

    section
}

fn generate_session_section(session: &AnalysisResult) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Session `{}`\n\n", session.session_id));

    if session.degraded {
        section.push_str(
            "> ⚠️ No transcripts were available; these figures come from the built-in \
             demonstration session.\n\n",
        );
    }

    let persistence = &session.persistence;
    if let Some(ref failure) = persistence.failure {
        section.push_str(&format!(
            "> ❗ Persistence incomplete ({}/{} profiles, {}/{} findings stored): {}\n\n",
            persistence.profiles_persisted,
            persistence.profiles_computed,
            persistence.findings_persisted,
            persistence.findings_computed,
            failure
        ));
    }

    section.push_str(&format!(
        "*Speakers: {} | Findings: {} | Processing: {}ms*\n\n",
        session.speaking_time_profiles.len(),
        session.bias_findings.len(),
        session.processing_time_ms
    ));

    section.push_str(&generate_speaking_time_table(&session.speaking_time_profiles));

    if session.bias_findings.is_empty() {
        section.push_str("No bias patterns were detected in this session. 🎉\n\n");
        return section;
    }

    let mut findings: Vec<&BiasFinding> = session.bias_findings.iter().collect();
    findings.sort_by(|a, b| b.severity.total_cmp(&a.severity));

    for finding in findings {
        section.push_str(&generate_finding_block(finding));
    }

    section
}

fn generate_speaking_time_table(profiles: &[SpeakingTimeProfile]) -> String {
    if profiles.is_empty() {
        return "No speech was recorded for this session.\n\n".to_string();
    }

    let mut table = String::new();

    table.push_str("### Speaking Time\n\n");
    table.push_str(
        "| Speaker | Time | Share | Turns | Avg Turn | Interruptions (given/received) | WPM | Dominance | Engagement |\n",
    );
    table.push_str("|:---:|---:|---:|---:|---:|:---:|---:|---:|:---:|\n");

    for p in profiles {
        table.push_str(&format!(
            "| {} | {:.1}s | {:.1}% | {} | {:.1}s | {}/{} | {:.0} | {:.2} | {} |\n",
            p.speaker_index,
            p.total_seconds,
            p.percentage,
            p.turn_count,
            p.average_turn_seconds,
            p.interruptions_given,
            p.interruptions_received,
            p.words_per_minute,
            p.dominance_index,
            p.engagement_level
        ));
    }
    table.push('\n');

    table
}

fn generate_finding_block(finding: &BiasFinding) -> String {
    let mut block = String::new();

    let band = finding.band();
    block.push_str(&format!(
        "#### {} **{}** {} ({})\n\n",
        band.emoji(),
        band.to_string().to_uppercase(),
        finding.category,
        finding.bias_type
    ));

    block.push_str(&format!(
        "**Severity:** {:.2} | **Confidence:** {:.2} | **Method:** {}\n\n",
        finding.severity, finding.confidence, finding.detection_method
    ));

    let evidence = &finding.evidence;
    block.push_str(&format!(
        "**When:** {} | **Speakers:** {}\n\n",
        evidence.time_range,
        join_speakers(&evidence.speakers)
    ));

    if !evidence.context.is_empty() {
        block.push_str(&format!("**Evidence:** {}\n\n", evidence.context));
    }

    if !evidence.excerpt.is_empty() {
        block.push_str("<details>\n<summary>View Excerpt</summary>\n\n```\n");
        block.push_str(&evidence.excerpt);
        block.push_str("\n```\n</details>\n\n");
    }

    let impact = &finding.impact;
    if !impact.affected_participants.is_empty() {
        block.push_str(&format!(
            "**Affected:** {}\n\n",
            join_speakers(&impact.affected_participants)
        ));
    }
    if !impact.group_dynamics.is_empty() {
        block.push_str(&format!("**Group dynamics:** {}\n\n", impact.group_dynamics));
    }
    if !impact.recommended_intervention.is_empty() {
        block.push_str(&format!(
            "> 💡 **Intervention:** {}\n\n",
            impact.recommended_intervention
        ));
    }

    block.push_str("---\n\n");

    block
}

fn join_speakers(speakers: &[u32]) -> String {
    speakers
        .iter()
        .map(|s| format!("#{}", s))
        .collect::<Vec<_>>()
        .join(", ")
}

fn generate_recommendations_section(recommendations: &[String]) -> String {
    if recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Recommendations\n\n");
    section.push_str("Suggested facilitator actions for the next round:\n\n");

    for (i, rec) in recommendations.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, rec));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(
        "*Findings are heuristic signals for facilitators, not judgments about participants.*\n",
    );

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
