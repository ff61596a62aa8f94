//! Data models for the pull-request auditor.
//!
//! This module contains the core data structures shared by the query
//! units, the dispatch engine and the team aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Sentinel team assigned to authors that belong to no configured team.
pub const NO_TEAM: &str = "NA";

/// A pull request as returned by the repository accessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number within the repository.
    pub number: u64,
    /// PR title.
    pub title: String,
    /// Login of the PR author.
    pub author_login: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Close timestamp, `None` while the PR is open.
    pub closed_at: Option<DateTime<Utc>>,
    /// Whether the PR was merged.
    pub merged: bool,
    /// Number of files touched by the PR.
    pub changed_files: u64,
    /// Web URL of the PR.
    pub html_url: String,
    /// `"open"` or `"closed"`.
    pub state: String,
}

/// One flagged item produced by a query unit.
///
/// The fixed fields carry enough identity to act on the finding; any
/// query-specific fields (age in days, changed-file count, stale vs.
/// long-lived tag, ...) travel in `extra` and serialize inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// PR number.
    pub number: u64,
    /// PR title.
    pub title: String,
    /// Author login.
    pub author: String,
    /// Creation timestamp, ISO formatted.
    pub created_at: String,
    /// Close timestamp, ISO formatted; absent for open PRs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<String>,
    /// Owning team, or [`NO_TEAM`] when the author matches no team.
    pub team: String,
    /// Web URL of the PR.
    pub html_url: String,
    /// Query-specific fields, flattened into the serialized record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResultRecord {
    /// Build a record from a pull request with no query-specific fields.
    pub fn from_pull(pr: &PullRequest, team: String) -> Self {
        Self {
            number: pr.number,
            title: pr.title.clone(),
            author: pr.author_login.clone(),
            created_at: pr.created_at.to_rfc3339(),
            closed_at: pr.closed_at.map(|t| t.to_rfc3339()),
            team,
            html_url: pr.html_url.clone(),
            extra: Map::new(),
        }
    }

    /// Attach a query-specific field to the record.
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// Team name -> login list, as supplied in configuration.
///
/// A `BTreeMap` so that membership lookup precedence (first match wins)
/// is stable: lexicographic by team name.
pub type Teams = BTreeMap<String, Vec<String>>;

/// Team name -> check name -> that team's records for that check.
pub type TeamSummary = BTreeMap<String, BTreeMap<String, Vec<ResultRecord>>>;

/// Team name -> check name -> failure count. A pure view over
/// [`TeamSummary`]: each count equals the length of the matching list.
pub type FailureCount = BTreeMap<String, BTreeMap<String, usize>>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_pull() -> PullRequest {
        PullRequest {
            number: 42,
            title: "Fix flaky test".to_string(),
            author_login: "alice".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            closed_at: None,
            merged: false,
            changed_files: 3,
            html_url: "https://example.test/pr/42".to_string(),
            state: "open".to_string(),
        }
    }

    #[test]
    fn test_record_from_pull() {
        let record = ResultRecord::from_pull(&sample_pull(), "backend".to_string());
        assert_eq!(record.number, 42);
        assert_eq!(record.author, "alice");
        assert_eq!(record.team, "backend");
        assert!(record.closed_at.is_none());
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_extra_fields_serialize_inline() {
        let record = ResultRecord::from_pull(&sample_pull(), NO_TEAM.to_string())
            .with_extra("age_days", serde_json::json!(12))
            .with_extra("type", serde_json::json!("stale"));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["age_days"], 12);
        assert_eq!(value["type"], "stale");
        assert_eq!(value["team"], "NA");
        // closed_at is skipped when absent
        assert!(value.get("closed_at").is_none());
    }
}
