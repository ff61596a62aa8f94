//! Pull requests touching more files than a configured threshold.
//!
//! Scans PRs closed within the date range and, optionally, currently
//! open PRs. The file-count comparison is strictly greater-than.

use crate::config::ResolvedConfig;
use crate::errors::AuditError;
use crate::github::RepoAccessor;
use crate::models::ResultRecord;
use crate::queries::{default_max_items, scan_progress};
use crate::registry::QueryUnit;
use crate::teams::team_for_login;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

const DESCRIPTION: &str = "Identify large pull requests by changed-file count, \
covering PRs closed in the date range and optionally open PRs.";

const CONFIG_DOC: &str = "Config fields: start_date (YYYY-MM-DD, required), \
end_date (YYYY-MM-DD, required), pr_file_threshold (integer, default 20), \
merged_only (boolean, default true), include_open (boolean, default true), \
max_items_to_analyse (integer, default 200), teams (object mapping team name to logins).";

#[derive(Debug, Clone, Deserialize)]
struct Params {
    #[serde(default = "default_file_threshold")]
    pr_file_threshold: u64,
    #[serde(default = "default_true")]
    merged_only: bool,
    #[serde(default = "default_true")]
    include_open: bool,
    #[serde(default = "default_max_items")]
    max_items_to_analyse: usize,
}

fn default_file_threshold() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

pub struct LargePrs;

#[async_trait]
impl QueryUnit for LargePrs {
    fn name(&self) -> &'static str {
        "large_prs"
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
                    "description": "Only consider merged PRs among closed ones (default true)."
                },
                "include_open": {
                    "type": "boolean",
                    "description": "Also scan currently open PRs (default true)."
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

            if params.merged_only && !pr.merged {
                continue;
            }
            if pr.changed_files > params.pr_file_threshold {
                let team = team_for_login(&pr.author_login, &config.teams);
                results.push(
                    ResultRecord::from_pull(&pr, team)
                        .with_extra("merged", json!(pr.merged))
                        .with_extra("state", json!(pr.state))
                        .with_extra("changed_files", json!(pr.changed_files)),
                );
            }
        }
        bar.finish_and_clear();

        if params.include_open {
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

                if pr.changed_files > params.pr_file_threshold {
                    let team = team_for_login(&pr.author_login, &config.teams);
                    results.push(
                        ResultRecord::from_pull(&pr, team)
                            .with_extra("merged", json!(false))
                            .with_extra("state", json!(pr.state))
                            .with_extra("changed_files", json!(pr.changed_files)),
                    );
                }
            }
            bar.finish_and_clear();
        }

        Ok(results)
    }
}
