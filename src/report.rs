//! Audit report rendering.
//!
//! Two artifacts per batch run: the full per-team-per-check result dump
//! and a separate failure-count summary. Each renders as JSON or as a
//! Markdown document with one `##`-level section per check.

use crate::errors::AuditError;
use crate::models::{FailureCount, ResultRecord, TeamSummary};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl ReportFormat {
    /// File extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            other => Err(AuditError::OutputFormat(other.to_string())),
        }
    }
}

/// Render the full result dump.
pub fn render_team_summary(
    summary: &TeamSummary,
    failures: &BTreeMap<String, String>,
    format: ReportFormat,
) -> Result<String> {
    match format {
        ReportFormat::Json => {
            let doc = serde_json::json!({
                "results": summary,
                "failures": failures,
            });
            serde_json::to_string_pretty(&doc).map_err(Into::into)
        }
        ReportFormat::Markdown => Ok(render_summary_markdown(summary, failures)?),
    }
}

/// Render the failure-count summary.
pub fn render_failure_counts(counts: &FailureCount, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(counts).map_err(Into::into),
        ReportFormat::Markdown => Ok(render_counts_markdown(counts)),
    }
}

/// Invert team -> check -> records into check -> team -> records, so
/// the Markdown document can carry one section per check.
fn by_check(summary: &TeamSummary) -> BTreeMap<&str, BTreeMap<&str, &Vec<ResultRecord>>> {
    let mut inverted: BTreeMap<&str, BTreeMap<&str, &Vec<ResultRecord>>> = BTreeMap::new();
    for (team, checks) in summary {
        for (check, records) in checks {
            inverted
                .entry(check.as_str())
                .or_default()
                .insert(team.as_str(), records);
        }
    }
    inverted
}

fn section_title(check: &str) -> String {
    check
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_summary_markdown(
    summary: &TeamSummary,
    failures: &BTreeMap<String, String>,
) -> Result<String> {
    let mut output = String::new();
    output.push_str("# Repo Radar Audit\n\n");

    for (check, teams) in by_check(summary) {
        output.push_str(&format!("## {}\n\n", section_title(check)));
        let body = serde_json::to_string_pretty(&teams)
            .context("Failed to serialize check results")?;
        output.push_str("```json\n");
        output.push_str(&body);
        output.push_str("\n```\n\n");
    }

    if !failures.is_empty() {
        output.push_str("## Failed Checks\n\n");
        for (check, error) in failures {
            output.push_str(&format!("- **{}**: {}\n", check, error));
        }
        output.push('\n');
    }

    Ok(output)
}

fn render_counts_markdown(counts: &FailureCount) -> String {
    let mut output = String::new();
    output.push_str("# Repo Radar Failure Counts\n\n");

    // One section per check, a table of team counts under each.
    let mut per_check: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    for (team, checks) in counts {
        for (check, count) in checks {
            per_check
                .entry(check.as_str())
                .or_default()
                .insert(team.as_str(), *count);
        }
    }

    for (check, teams) in per_check {
        output.push_str(&format!("## {}\n\n", section_title(check)));
        output.push_str("| Team | Count |\n");
        output.push_str("|:---|:---:|\n");
        for (team, count) in teams {
            output.push_str(&format!("| {} | {} |\n", team, count));
        }
        output.push('\n');
    }

    output
}

/// Write a rendered report to disk.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NO_TEAM;
    use serde_json::Map;

    fn record(number: u64, author: &str, team: &str) -> ResultRecord {
        ResultRecord {
            number,
            title: format!("PR #{}", number),
            author: author.to_string(),
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
            closed_at: None,
            team: team.to_string(),
            html_url: format!("https://example.test/pr/{}", number),
            extra: Map::new(),
        }
    }

    fn sample_summary() -> TeamSummary {
        let mut summary = TeamSummary::new();
        summary
            .entry("backend".to_string())
            .or_default()
            .insert("old_open_prs".to_string(), vec![record(1, "alice", "backend")]);
        summary
            .entry(NO_TEAM.to_string())
            .or_default()
            .insert("old_open_prs".to_string(), vec![record(2, "carol", NO_TEAM)]);
        summary
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("markdown".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);

        let err = "yaml".parse::<ReportFormat>().expect_err("yaml unsupported");
        assert!(matches!(err, AuditError::OutputFormat(f) if f == "yaml"));
    }

    #[test]
    fn test_markdown_has_section_per_check() {
        let markdown =
            render_team_summary(&sample_summary(), &BTreeMap::new(), ReportFormat::Markdown)
                .unwrap();

        assert!(markdown.contains("## Old Open Prs"));
        assert!(markdown.contains("\"backend\""));
        assert!(markdown.contains("\"NA\""));
        assert!(!markdown.contains("Failed Checks"));
    }

    #[test]
    fn test_markdown_lists_failed_checks() {
        let failures: BTreeMap<String, String> = [(
            "large_prs".to_string(),
            "upstream access error: 502".to_string(),
        )]
        .into_iter()
        .collect();

        let markdown =
            render_team_summary(&sample_summary(), &failures, ReportFormat::Markdown).unwrap();
        assert!(markdown.contains("## Failed Checks"));
        assert!(markdown.contains("**large_prs**"));
    }

    #[test]
    fn test_json_round_trips_summary() {
        let json =
            render_team_summary(&sample_summary(), &BTreeMap::new(), ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"]["backend"]["old_open_prs"][0]["number"], 1);
    }

    #[test]
    fn test_counts_markdown_table() {
        let mut counts = FailureCount::new();
        counts
            .entry("backend".to_string())
            .or_default()
            .insert("old_open_prs".to_string(), 3);

        let markdown = render_failure_counts(&counts, ReportFormat::Markdown).unwrap();
        assert!(markdown.contains("## Old Open Prs"));
        assert!(markdown.contains("| backend | 3 |"));
    }

    #[test]
    fn test_write_report_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("audit.md");

        write_report("# hello\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hello\n");
    }
}
