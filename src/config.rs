//! Layered raw configuration and boundary validation.
//!
//! Raw configuration is an unordered JSON object assembled by merging, in
//! increasing priority: the process-level default file, a per-invocation
//! override file, and caller-supplied arguments (e.g. from a tool call).
//! The merge is shallow on purpose: nested values such as `teams` are
//! replaced wholesale, never deep-merged.

use crate::errors::AuditError;
use crate::models::Teams;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;

/// One unvalidated configuration layer.
pub type RawConfig = Map<String, Value>;

/// Fold layers left-to-right; later layers overwrite overlapping keys.
///
/// Shallow merge only: a key present in two layers takes the later
/// layer's value as-is, even when both values are objects.
pub fn merge_layers(layers: &[RawConfig]) -> RawConfig {
    let mut merged = RawConfig::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Load a raw configuration layer from a JSON file.
pub fn load_raw(path: &Path) -> Result<RawConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!(
            "Config file {} must contain a JSON object, got {}",
            path.display(),
            json_kind(&other)
        ),
    }
}

/// Load the enabled-checks list (a JSON array of check names) from a file.
pub fn load_enabled_checks(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read enabled checks file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse enabled checks file: {}", path.display()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Merged, boundary-validated configuration handed to query units.
///
/// Two tiers: the fields every query relies on are parsed into typed
/// form here; everything else stays in `raw` untouched, so unknown keys
/// from any layer pass through without error. Each query unit pulls its
/// own typed parameter struct out of `raw` via [`ResolvedConfig::typed`].
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Start of the audited date range (inclusive).
    pub start_date: NaiveDate,
    /// End of the audited date range (inclusive).
    pub end_date: NaiveDate,
    /// Ownership teams for result attribution. May be empty.
    pub teams: Teams,
    /// The full merged mapping, unknown keys included.
    pub raw: RawConfig,
}

impl ResolvedConfig {
    /// Merge `layers` and validate the boundary contract.
    ///
    /// Fails with [`AuditError::Configuration`] when `start_date` or
    /// `end_date` is missing or unparsable, when `start_date` is after
    /// `end_date`, or when `teams` is present but malformed.
    pub fn resolve(layers: &[RawConfig]) -> Result<Self, AuditError> {
        let raw = merge_layers(layers);

        let start_date = require_date(&raw, "start_date")?;
        let end_date = require_date(&raw, "end_date")?;
        if start_date > end_date {
            return Err(AuditError::Configuration(format!(
                "start_date {} is after end_date {}",
                start_date, end_date
            )));
        }

        let teams = parse_teams(&raw)?;

        Ok(Self {
            start_date,
            end_date,
            teams,
            raw,
        })
    }

    /// Deserialize a query unit's typed parameter struct from the merged
    /// mapping. Absent optional fields take their declared defaults;
    /// unknown keys are ignored. Type coercion failures surface as
    /// [`AuditError::Configuration`].
    pub fn typed<T: DeserializeOwned>(&self) -> Result<T, AuditError> {
        serde_json::from_value(Value::Object(self.raw.clone()))
            .map_err(|e| AuditError::Configuration(e.to_string()))
    }
}

/// Parse the `teams` mapping out of a merged raw configuration.
/// Absent `teams` means no attribution: every record falls back to the
/// no-team sentinel.
pub fn parse_teams(raw: &RawConfig) -> Result<Teams, AuditError> {
    match raw.get("teams") {
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| AuditError::Configuration(format!("invalid 'teams': {}", e))),
        None => Ok(Teams::new()),
    }
}

fn require_date(raw: &RawConfig, field: &str) -> Result<NaiveDate, AuditError> {
    let value = raw
        .get(field)
        .ok_or_else(|| AuditError::Configuration(format!("missing required field '{}'", field)))?;

    let text = value.as_str().ok_or_else(|| {
        AuditError::Configuration(format!("'{}' must be a YYYY-MM-DD string", field))
    })?;

    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| {
        AuditError::Configuration(format!("'{}' is not a valid date ({}): {}", field, text, e))
    })
}
