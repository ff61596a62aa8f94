//! Open pull requests that have been open too long.

use crate::config::ResolvedConfig;
use crate::errors::AuditError;
use crate::github::RepoAccessor;
use crate::models::ResultRecord;
use crate::queries::{default_max_items, scan_progress};
use crate::registry::QueryUnit;
use crate::teams::team_for_login;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

const DESCRIPTION: &str =
    "Find open pull requests that were created more than a configured number of days ago.";

const CONFIG_DOC: &str = "Config fields: start_date (YYYY-MM-DD, required), \
end_date (YYYY-MM-DD, required), old_pr_days (integer, default 7), \
max_items_to_analyse (integer, default 200), teams (object mapping team name to logins).";

#[derive(Debug, Clone, Deserialize)]
struct Params {
    #[serde(default = "default_old_pr_days")]
    old_pr_days: i64,
    #[serde(default = "default_max_items")]
    max_items_to_analyse: usize,
}

fn default_old_pr_days() -> i64 {
    7
}

pub struct OldOpenPrs;

#[async_trait]
impl QueryUnit for OldOpenPrs {
    fn name(&self) -> &'static str {
        "old_open_prs"
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
                    "description": "Start of the audited date range (YYYY-MM-DD)."
                },
                "end_date": {
                    "type": "string",
                    "description": "End of the audited date range (YYYY-MM-DD)."
                },
                "old_pr_days": {
                    "type": "integer",
                    "description": "Age in days beyond which an open PR is flagged (default 7)."
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
        let threshold = Utc::now() - Duration::days(params.old_pr_days);

        let query = format!("repo:{} is:pr is:open", repo.full_name());
        let numbers = repo.search_prs(&query).await?;

        let bar = scan_progress(numbers.len(), "Checking open PRs");
        let mut results = Vec::new();

        for (i, number) in numbers.into_iter().enumerate() {
            if i >= params.max_items_to_analyse {
                info!(
                    "Too many open PRs, stopping analysis after {} PRs",
                    params.max_items_to_analyse
                );
                break;
            }

            let pr = repo.get_pull(number).await?;
            if pr.created_at < threshold {
                let team = team_for_login(&pr.author_login, &config.teams);
                results.push(ResultRecord::from_pull(&pr, team));
            }
            bar.inc(1);
        }

        bar.finish_and_clear();
        Ok(results)
    }
}
