//! Stale (open too long) and long-lived (closed, but took long) PRs.
//!
//! A PR qualifies only when its age strictly exceeds the threshold:
//! exactly `age_threshold_days` days is not flagged.

use crate::config::ResolvedConfig;
use crate::errors::AuditError;
use crate::github::RepoAccessor;
use crate::models::ResultRecord;
use crate::queries::{default_max_items, scan_progress};
use crate::registry::QueryUnit;
use crate::teams::team_for_login;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

const DESCRIPTION: &str = "Identify stale pull requests (open longer than a threshold) and \
long-lived ones (closed within the date range after being open longer than the threshold).";

const CONFIG_DOC: &str = "Config fields: start_date (YYYY-MM-DD, required), \
end_date (YYYY-MM-DD, required), age_threshold_days (integer, default 7), \
max_items_to_analyse (integer, default 200), teams (object mapping team name to logins).";

#[derive(Debug, Clone, Deserialize)]
struct Params {
    #[serde(default = "default_age_threshold")]
    age_threshold_days: i64,
    #[serde(default = "default_max_items")]
    max_items_to_analyse: usize,
}

fn default_age_threshold() -> i64 {
    7
}

pub struct StaleOrLongLivedPrs;

#[async_trait]
impl QueryUnit for StaleOrLongLivedPrs {
    fn name(&self) -> &'static str {
        "stale_or_long_lived_prs"
    }

    fn description(&self) -> String {
        format!("{}\n{}", DESCRIPTION, CONFIG_DOC)
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start_date": {
                    "type": "string",
                    "description": "Start of the closed-PR date range (YYYY-MM-DD)."
                },
                "end_date": {
                    "type": "string",
                    "description": "End of the closed-PR date range (YYYY-MM-DD)."
                },
                "age_threshold_days": {
                    "type": "integer",
                    "description": "Days a PR may stay open before it is flagged (default 7)."
                },
                "max_items_to_analyse": {
                    "type": "integer",
                    "description": "Stop scanning open PRs after this many (default 200)."
                },
                "teams": {
                    "type": "object",
                    "description": "Team name to list of author logins, for attribution."
                }
            },
            "required": ["start_date", "end_date"]
        })
    }

    async fn run(
        &self,
        repo: &dyn RepoAccessor,
        config: &ResolvedConfig,
    ) -> Result<Vec<ResultRecord>, AuditError> {
        let params: Params = config.typed()?;
        let mut results = Vec::new();

        let closed_query = format!(
            "repo:{} is:pr is:closed closed:{}..{}",
            repo.full_name(),
            config.start_date,
            config.end_date
        );
        let closed = repo.search_prs(&closed_query).await?;

        let bar = scan_progress(closed.len(), "Checking closed PRs");
        for number in closed {
            let pr = repo.get_pull(number).await?;
            bar.inc(1);

            let Some(closed_at) = pr.closed_at else {
                continue;
            };
            let age_days = (closed_at - pr.created_at).num_days();
            if age_days > params.age_threshold_days {
                let team = team_for_login(&pr.author_login, &config.teams);
                results.push(
                    ResultRecord::from_pull(&pr, team)
                        .with_extra("age_days", json!(age_days))
                        .with_extra("state", json!("closed"))
                        .with_extra("type", json!("long_lived")),
                );
            }
        }
        bar.finish_and_clear();

        let open_query = format!("repo:{} is:pr is:open", repo.full_name());
        let open = repo.search_prs(&open_query).await?;

        let bar = scan_progress(open.len(), "Checking open PRs");
        for (i, number) in open.into_iter().enumerate() {
            if i >= params.max_items_to_analyse {
                info!(
                    "Too many open PRs, stopping analysis after {} PRs",
                    params.max_items_to_analyse
                );
                break;
            }

            let pr = repo.get_pull(number).await?;
            bar.inc(1);

            let age_days = (Utc::now() - pr.created_at).num_days();
            if age_days > params.age_threshold_days {
                let team = team_for_login(&pr.author_login, &config.teams);
                results.push(
                    ResultRecord::from_pull(&pr, team)
                        .with_extra("age_days", json!(age_days))
                        .with_extra("state", json!("open"))
                        .with_extra("type", json!("stale")),
                );
            }
        }
        bar.finish_and_clear();

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake::{pull, FakeRepo};
    use chrono::Datelike;
    use serde_json::Map;

    fn config_with(args: Value) -> ResolvedConfig {
        let mut layer: Map<String, Value> = args.as_object().unwrap().clone();
        layer
            .entry("start_date".to_string())
            .or_insert(json!("2024-01-01"));
        layer
            .entry("end_date".to_string())
            .or_insert(json!("2024-12-31"));
        ResolvedConfig::resolve(&[layer]).unwrap()
    }

    #[tokio::test]
    async fn test_exactly_at_threshold_is_excluded() {
        // Opened Jan 1, closed Jan 8: exactly 7 days. Strictly greater
        // than the threshold is required, so this PR is not flagged.
        let repo = FakeRepo::new(vec![
            pull(1, "alice", (2024, 1, 1), Some((2024, 1, 8)), true, 2),
            pull(2, "bob", (2024, 1, 1), Some((2024, 1, 9)), true, 2),
        ]);

        let config = config_with(json!({"age_threshold_days": 7}));
        let results = StaleOrLongLivedPrs.run(&repo, &config).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].number, 2);
        assert_eq!(results[0].extra["age_days"], 8);
        assert_eq!(results[0].extra["type"], "long_lived");
    }

    #[tokio::test]
    async fn test_open_prs_are_tagged_stale() {
        let old = Utc::now().date_naive() - chrono::Days::new(30);
        let repo = FakeRepo::new(vec![pull(
            1,
            "alice",
            (old.year(), old.month(), old.day()),
            None,
            false,
            2,
        )]);

        let config = config_with(json!({"teams": {"backend": ["alice"]}}));
        let results = StaleOrLongLivedPrs.run(&repo, &config).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].extra["type"], "stale");
        assert_eq!(results[0].extra["state"], "open");
        assert_eq!(results[0].team, "backend");
    }
}
