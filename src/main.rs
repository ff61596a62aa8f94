//! Repo Radar - pull-request auditor for GitHub repositories
//!
//! Runs self-describing PR checks against the GitHub API, attributes
//! flagged PRs to ownership teams, and writes JSON or Markdown reports.
//! The same checks are exposed as a tool catalog that an LLM can select
//! from and invoke with its own arguments.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, network, unknown query, etc.)

mod agent;
mod cli;
mod config;
mod dispatch;
mod errors;
mod github;
mod models;
mod queries;
mod registry;
mod report;
mod teams;

use agent::{SelectorConfig, ToolSelector};
use anyhow::{Context, Result};
use cli::Args;
use config::RawConfig;
use dispatch::DispatchEngine;
use github::GithubClient;
use models::Teams;
use registry::QueryRegistry;
use report::ReportFormat;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    init_logging(&args);

    info!("Repo Radar v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Audit failed: {}", e);
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args) -> Result<()> {
    // The catalog is built once and read-only from here on.
    let registry = QueryRegistry::with_builtin_queries()?;

    if args.list_tools {
        let catalog = registry.tool_catalog();
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    let format: ReportFormat = args.format.parse()?;
    let layers = load_config_layers(&args)?;

    let repo_name = args.repo.as_deref().context("repository is required")?;
    let token = args.github_token.as_deref().context("GitHub token is required")?;
    let client = GithubClient::new(token, repo_name)?;

    let teams = config::parse_teams(&config::merge_layers(&layers))?;
    let engine = DispatchEngine::new(&registry, &client, layers);

    match args.prompt.clone() {
        Some(prompt) => run_single_tool(&args, &registry, &engine, &prompt, format).await,
        None => run_batch_audit(&args, &registry, &engine, &teams, format).await,
    }
}

/// Batch mode: run every enabled check against the shared configuration.
async fn run_batch_audit(
    args: &Args,
    registry: &QueryRegistry,
    engine: &DispatchEngine<'_>,
    team_map: &Teams,
    format: ReportFormat,
) -> Result<()> {
    let enabled = enabled_checks(args, registry)?;

    println!("🔍 Running audit ({} checks)...", enabled.len());
    let outcome = engine.run_batch(&enabled).await;

    let summary = teams::group_by_team(&outcome.results, team_map);
    let counts = teams::summarize_failure_counts(&summary);

    let output_path = args.output_path(format);
    report::write_report(
        &report::render_team_summary(&summary, &outcome.failures, format)?,
        &output_path,
    )?;

    let counts_path = args.counts_path(format);
    report::write_report(&report::render_failure_counts(&counts, format)?, &counts_path)?;

    let flagged: usize = outcome.results.values().map(Vec::len).sum();
    println!("\n📊 Audit Summary:");
    println!("   Checks run: {}", enabled.len());
    println!("   PRs flagged: {}", flagged);
    if !outcome.failures.is_empty() {
        println!("   ⚠️  Failed checks: {}", outcome.failures.len());
        for (check, err) in &outcome.failures {
            println!("      - {}: {}", check, err);
        }
    }
    println!("\n✅ Audit report saved to {}", output_path.display());
    println!("✅ Failure counts saved to {}", counts_path.display());

    Ok(())
}

/// Single-tool mode: the LLM picks one check and its arguments.
async fn run_single_tool(
    args: &Args,
    registry: &QueryRegistry,
    engine: &DispatchEngine<'_>,
    prompt: &str,
    format: ReportFormat,
) -> Result<()> {
    let selector = ToolSelector::new(SelectorConfig {
        llm_url: args.llm_url.clone(),
        model_name: args.model.clone(),
        temperature: args.temperature,
        timeout_seconds: args.timeout,
    })?;

    println!("🤖 Asking {} to pick a tool...", args.model);
    let invocation = selector.select_tool(prompt, &registry.tool_catalog()).await?;

    println!(
        "🤖 LLM picked: {} with args:\n{}",
        invocation.name,
        serde_json::to_string_pretty(&invocation.arguments)?
    );

    let results = engine.execute(&invocation.name, invocation.arguments).await?;

    // Result wrapped under the tool name, per the tool-calling contract.
    let mut wrapped = serde_json::Map::new();
    wrapped.insert(invocation.name.clone(), serde_json::to_value(&results)?);
    let body = serde_json::to_string_pretty(&serde_json::Value::Object(wrapped))?;
    println!("\n✅ Final Result:\n{}", body);

    if let Some(output) = &args.output {
        report::write_report(&body, output)?;
        println!("\n✅ Result saved to {}", output.display());
    }

    // Markdown only applies to batch artifacts; note the mismatch once.
    if format == ReportFormat::Markdown && args.output.is_some() {
        debug!("Single-tool results are always written as JSON");
    }

    Ok(())
}

/// Assemble the layered configuration sources, lowest priority first:
/// the default file from REPO_RADAR_CONFIG_DIR, then --config.
fn load_config_layers(args: &Args) -> Result<Vec<RawConfig>> {
    let mut layers = Vec::new();

    if let Ok(dir) = std::env::var("REPO_RADAR_CONFIG_DIR") {
        let default_path = Path::new(&dir).join("config.json");
        if default_path.exists() {
            info!("Loading default config from {}", default_path.display());
            layers.push(config::load_raw(&default_path)?);
        }
    }

    if let Some(path) = &args.config {
        info!("Loading config from {}", path.display());
        layers.push(config::load_raw(path)?);
    }

    Ok(layers)
}

/// Resolve the enabled-checks list: explicit file, config-dir default,
/// then every registered check.
fn enabled_checks(args: &Args, registry: &QueryRegistry) -> Result<Vec<String>> {
    if let Some(path) = &args.enabled_checks {
        return config::load_enabled_checks(path);
    }

    if let Ok(dir) = std::env::var("REPO_RADAR_CONFIG_DIR") {
        let default_path = Path::new(&dir).join("enabled_checks_config.json");
        if default_path.exists() {
            info!("Loading enabled checks from {}", default_path.display());
            return config::load_enabled_checks(&default_path);
        }
    }

    Ok(registry.names().iter().map(|n| n.to_string()).collect())
}
