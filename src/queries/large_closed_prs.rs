//! Closed pull requests touching more files than a configured threshold.
//!
//! Closed-only variant of `large_prs` for audits that only care about
//! merged history within the date range.

use crate::config::ResolvedConfig;
use crate::errors::AuditError;
use crate::github::RepoAccessor;
use crate::models::ResultRecord;
use crate::queries::scan_progress;
use crate::registry::QueryUnit;
use crate::teams::team_for_login;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const DESCRIPTION: &str =
    "Identify pull requests closed in the date range that changed more files than a threshold.";

const CONFIG_DOC: &str = "Config fields: start_date (YYYY-MM-DD, required), \
end_date (YYYY-MM-DD, required), pr_file_threshold (integer, default 20), \
merged_only (boolean, default true), teams (object mapping team name to logins).";

#[derive(Debug, Clone, Deserialize)]
struct Params {
    #[serde(default = "default_file_threshold")]
    pr_file_threshold: u64,
    #[serde(default = "default_true")]
    merged_only: bool,
}

fn default_file_threshold() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

pub struct LargeClosedPrs;

#[async_trait]
impl QueryUnit for LargeClosedPrs {
    fn name(&self) -> &'static str {
        "large_closed_prs"
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
                "pr_file_threshold": {
                    "type": "integer",
                    "description": "Changed-file count above which a PR is large (default 20)."
                },
                "merged_only": {
                    "type": "boolean",
                    "description": "Only consider merged PRs (default true)."
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

        let query = format!(
            "repo:{} is:pr is:closed closed:{}..{}",
            repo.full_name(),
            config.start_date,
            config.end_date
        );
        let numbers = repo.search_prs(&query).await?;

        let bar = scan_progress(numbers.len(), "Checking closed PRs");
        let mut results = Vec::new();

        for number in numbers {
            let pr = repo.get_pull(number).await?;
            bar.inc(1);

            if params.merged_only && !pr.merged {
                continue;
            }
            if pr.changed_files > params.pr_file_threshold {
                let team = team_for_login(&pr.author_login, &config.teams);
                results.push(
                    ResultRecord::from_pull(&pr, team)
                        .with_extra("merged", json!(pr.merged))
                        .with_extra("changed_files", json!(pr.changed_files)),
                );
            }
        }

        bar.finish_and_clear();
        Ok(results)
    }
}
