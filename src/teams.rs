//! Team attribution and fan-in aggregation of query results.

use crate::models::{FailureCount, ResultRecord, TeamSummary, Teams, NO_TEAM};
use std::collections::BTreeMap;

/// Find the owning team for a login.
///
/// Membership lookup is case-insensitive. When a login appears in more
/// than one team, the first team in `teams` iteration order wins, which
/// for a `BTreeMap` means the lexicographically smallest team name.
/// Returns [`NO_TEAM`] when no team lists the login.
pub fn team_for_login(login: &str, teams: &Teams) -> String {
    let login_lower = login.to_lowercase();
    for (team, members) in teams {
        if members.iter().any(|m| m.to_lowercase() == login_lower) {
            return team.clone();
        }
    }
    NO_TEAM.to_string()
}

/// Partition each check's records into a team -> check -> records mapping.
///
/// The owning team is looked up from each record's author login against
/// `teams`; every input record lands in exactly one `(team, check)`
/// bucket. Absent team/check keys are created on first insertion.
pub fn group_by_team(
    raw_results: &BTreeMap<String, Vec<ResultRecord>>,
    teams: &Teams,
) -> TeamSummary {
    let mut summary = TeamSummary::new();

    for (check_name, records) in raw_results {
        for record in records {
            let team = team_for_login(&record.author, teams);
            let mut record = record.clone();
            record.team = team.clone();
            summary
                .entry(team)
                .or_default()
                .entry(check_name.clone())
                .or_default()
                .push(record);
        }
    }

    summary
}

/// Derive per-team per-check failure counts from a team summary.
///
/// Purely structural: each count is the length of the matching list; no
/// re-filtering, no re-fetching.
pub fn summarize_failure_counts(summary: &TeamSummary) -> FailureCount {
    summary
        .iter()
        .map(|(team, checks)| {
            let counts = checks
                .iter()
                .map(|(check, records)| (check.clone(), records.len()))
                .collect();
            (team.clone(), counts)
        })
        .collect()
}
