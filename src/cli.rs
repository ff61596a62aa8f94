//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

use crate::report::ReportFormat;

/// Repo Radar - pull-request auditor for GitHub repositories
///
/// Runs a configurable set of PR checks (old open PRs, oversized PRs,
/// stale PRs), attributes results to ownership teams, and writes JSON
/// or Markdown reports. With --prompt, an LLM picks one check from the
/// tool catalog and runs it with its own arguments.
///
/// Examples:
///   repo-radar --repo acme/widgets --config ./config.json
///   repo-radar --repo acme/widgets --config ./config.json --format json
///   repo-radar --repo acme/widgets --prompt "find stale PRs from last week"
///   repo-radar --list-tools
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Repository to audit, as owner/name
    ///
    /// Can also be set via the REPO_NAME env var.
    #[arg(short, long, value_name = "OWNER/NAME", env = "REPO_NAME")]
    pub repo: Option<String>,

    /// GitHub API token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Path to the audit configuration JSON file
    ///
    /// Merged on top of the default config from REPO_RADAR_CONFIG_DIR.
    /// Must supply at least start_date and end_date (directly or via
    /// the default layer). Tool-call arguments override both.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the enabled-checks JSON file (array of check names)
    ///
    /// Defaults to enabled_checks_config.json in REPO_RADAR_CONFIG_DIR,
    /// then to every registered check.
    #[arg(long, value_name = "FILE")]
    pub enabled_checks: Option<PathBuf>,

    /// Natural-language prompt: let the LLM pick and run one check
    #[arg(short, long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Print the tool catalog as JSON and exit
    #[arg(long)]
    pub list_tools: bool,

    /// Output file for the full result dump
    ///
    /// Defaults to audit_output.<ext> for the chosen format.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output file for the failure-count summary
    ///
    /// Defaults to audit_counts.<ext> for the chosen format.
    #[arg(long, value_name = "FILE")]
    pub counts_output: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    pub format: String,

    /// Model used for tool selection in --prompt mode
    #[arg(short, long, default_value = "llama3.2:latest", env = "REPO_RADAR_MODEL")]
    pub model: String,

    /// Chat API endpoint for tool selection (Ollama-compatible)
    #[arg(long, default_value = "http://localhost:11434", env = "OLLAMA_URL")]
    pub llm_url: String,

    /// Temperature for the tool-selection call (0.0 - 1.0)
    #[arg(long, default_value = "0.1")]
    pub temperature: f32,

    /// LLM request timeout in seconds
    #[arg(long, default_value = "120", value_name = "SECS")]
    pub timeout: u64,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // --list-tools needs no repository or token
        if self.list_tools {
            return Ok(());
        }

        match self.repo.as_deref() {
            None | Some("") => {
                return Err("Repository is required (use --repo or REPO_NAME)".to_string())
            }
            Some(repo) if !repo.contains('/') => {
                return Err(format!("Repository must be owner/name, got '{}'", repo))
            }
            _ => {}
        }

        if self.github_token.as_deref().unwrap_or("").is_empty() {
            return Err("GitHub token is required (use --github-token or GITHUB_TOKEN)".to_string());
        }

        if self.prompt.is_some()
            && !self.llm_url.starts_with("http://")
            && !self.llm_url.starts_with("https://")
        {
            return Err("LLM URL must start with 'http://' or 'https://'".to_string());
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        if self.timeout == 0 {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Effective path for the full result dump.
    pub fn output_path(&self, format: ReportFormat) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("audit_output.{}", format.extension())))
    }

    /// Effective path for the failure-count summary.
    pub fn counts_path(&self, format: ReportFormat) -> PathBuf {
        self.counts_output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("audit_counts.{}", format.extension())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            repo: Some("acme/widgets".to_string()),
            github_token: Some("ghp_test".to_string()),
            config: None,
            enabled_checks: None,
            prompt: None,
            list_tools: false,
            output: None,
            counts_output: None,
            format: "markdown".to_string(),
            model: "llama3.2:latest".to_string(),
            llm_url: "http://localhost:11434".to_string(),
            temperature: 0.1,
            timeout: 120,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_requires_repo() {
        let mut args = make_args();
        args.repo = None;
        assert!(args.validate().is_err());

        args.repo = Some("no-slash".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_list_tools_skips_validation() {
        let mut args = make_args();
        args.repo = None;
        args.github_token = None;
        args.list_tools = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_llm_url_only_in_prompt_mode() {
        let mut args = make_args();
        args.llm_url = "not-a-url".to_string();
        assert!(args.validate().is_ok());

        args.prompt = Some("find stale PRs".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_default_output_paths_follow_format() {
        let args = make_args();
        assert_eq!(
            args.output_path(ReportFormat::Markdown),
            PathBuf::from("audit_output.md")
        );
        assert_eq!(
            args.counts_path(ReportFormat::Json),
            PathBuf::from("audit_counts.json")
        );
    }
}
