//! Dispatch engine: name + raw arguments in, result records out.
//!
//! The engine owns nothing global: the registry, the repository
//! accessor and the base configuration layers are passed in at
//! construction. Batch mode and single-tool mode both reduce to
//! repeated `execute` calls.

use crate::config::{RawConfig, ResolvedConfig};
use crate::errors::AuditError;
use crate::github::RepoAccessor;
use crate::models::ResultRecord;
use crate::registry::QueryRegistry;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Outcome of a batch run: per-check results plus per-check failures.
/// A failing check never aborts its siblings.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: BTreeMap<String, Vec<ResultRecord>>,
    pub failures: BTreeMap<String, String>,
}

pub struct DispatchEngine<'a> {
    registry: &'a QueryRegistry,
    repo: &'a dyn RepoAccessor,
    base_layers: Vec<RawConfig>,
}

impl<'a> DispatchEngine<'a> {
    /// `base_layers` are the configured sources in increasing priority;
    /// caller-supplied arguments are stacked on top per call.
    pub fn new(
        registry: &'a QueryRegistry,
        repo: &'a dyn RepoAccessor,
        base_layers: Vec<RawConfig>,
    ) -> Self {
        Self {
            registry,
            repo,
            base_layers,
        }
    }

    /// Resolve and run one query. Results are returned unmodified; any
    /// filtering is the query unit's own business.
    pub async fn execute(
        &self,
        query_name: &str,
        args: RawConfig,
    ) -> Result<Vec<ResultRecord>, AuditError> {
        let unit = self
            .registry
            .get(query_name)
            .ok_or_else(|| AuditError::UnknownQuery(query_name.to_string()))?;

        let mut layers = self.base_layers.clone();
        layers.push(args);
        let config = ResolvedConfig::resolve(&layers)?;

        info!("Running query '{}'", query_name);
        unit.run(self.repo, &config).await
    }

    /// Run every named check against the shared configuration. Each
    /// check's failure is captured per check; siblings always run.
    pub async fn run_batch(&self, enabled_checks: &[String]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for check in enabled_checks {
            match self.execute(check, RawConfig::new()).await {
                Ok(records) => {
                    info!("Check '{}' flagged {} PRs", check, records.len());
                    outcome.results.insert(check.clone(), records);
                }
                Err(e) => {
                    warn!("Check '{}' failed: {}", check, e);
                    outcome.failures.insert(check.clone(), e.to_string());
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fake::{pull, FakeRepo};
    use serde_json::json;

    fn base_layer() -> RawConfig {
        json!({
            "start_date": "2024-01-01",
            "end_date": "2024-12-31",
            "teams": {"backend": ["alice"]}
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[tokio::test]
    async fn test_unknown_query_is_terminal_and_catalog_unchanged() {
        let registry = QueryRegistry::with_builtin_queries().unwrap();
        let names_before = registry.names();

        let repo = FakeRepo::new(vec![]);
        let engine = DispatchEngine::new(&registry, &repo, vec![base_layer()]);

        let err = engine
            .execute("get_nonexistent", RawConfig::new())
            .await
            .expect_err("unknown name must fail");
        assert!(matches!(err, AuditError::UnknownQuery(name) if name == "get_nonexistent"));
        assert_eq!(registry.names(), names_before);
    }

    #[tokio::test]
    async fn test_caller_args_take_highest_priority() {
        let repo = FakeRepo::new(vec![pull(
            1,
            "alice",
            (2024, 1, 1),
            Some((2024, 1, 5)),
            true,
            15,
        )]);
        let registry = QueryRegistry::with_builtin_queries().unwrap();
        let engine = DispatchEngine::new(&registry, &repo, vec![base_layer()]);

        // Base default threshold (20) does not flag 15 changed files.
        let results = engine
            .execute("large_closed_prs", RawConfig::new())
            .await
            .unwrap();
        assert!(results.is_empty());

        // Caller override drops the threshold below the PR's size.
        let args = json!({"pr_file_threshold": 10})
            .as_object()
            .unwrap()
            .clone();
        let results = engine.execute("large_closed_prs", args).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].team, "backend");
    }

    #[tokio::test]
    async fn test_missing_dates_fail_resolution() {
        let registry = QueryRegistry::with_builtin_queries().unwrap();
        let repo = FakeRepo::new(vec![]);
        let engine = DispatchEngine::new(&registry, &repo, vec![]);

        let err = engine
            .execute("old_open_prs", RawConfig::new())
            .await
            .expect_err("no layer supplies start_date");
        assert!(matches!(err, AuditError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_batch_isolates_failing_checks() {
        let registry = QueryRegistry::with_builtin_queries().unwrap();
        let repo = FakeRepo::failing();
        let engine = DispatchEngine::new(&registry, &repo, vec![base_layer()]);

        let enabled = vec![
            "large_closed_prs".to_string(),
            "get_nonexistent".to_string(),
            "old_open_prs".to_string(),
        ];
        let outcome = engine.run_batch(&enabled).await;

        // The accessor fails every search and one name is unknown, yet
        // every check gets its own entry; nothing aborts the batch.
        assert_eq!(outcome.results.len(), 0);
        assert_eq!(outcome.failures.len(), 3);
        assert!(outcome.failures["get_nonexistent"].contains("unknown query"));
        assert!(outcome.failures["old_open_prs"].contains("upstream"));
    }

    #[tokio::test]
    async fn test_batch_collects_results_per_check() {
        let registry = QueryRegistry::with_builtin_queries().unwrap();
        let repo = FakeRepo::new(vec![pull(
            7,
            "alice",
            (2024, 2, 1),
            Some((2024, 2, 20)),
            true,
            42,
        )]);
        let engine = DispatchEngine::new(&registry, &repo, vec![base_layer()]);

        let enabled = vec![
            "large_closed_prs".to_string(),
            "stale_or_long_lived_prs".to_string(),
        ];
        let outcome = engine.run_batch(&enabled).await;

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.results["large_closed_prs"].len(), 1);
        assert_eq!(outcome.results["stale_or_long_lived_prs"].len(), 1);
        assert_eq!(
            outcome.results["stale_or_long_lived_prs"][0].extra["type"],
            "long_lived"
        );
    }
}
