//! Query registry and tool catalog.
//!
//! Query units are registered explicitly into a table built once at
//! startup; there is no runtime module scanning. The registry is
//! read-only after construction and owns the catalog for the process
//! lifetime. Registering two units under one name fails loudly.

use crate::config::ResolvedConfig;
use crate::errors::AuditError;
use crate::github::RepoAccessor;
use crate::models::ResultRecord;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A named, self-describing check over a repository.
///
/// A unit carries its name, its natural-language description, a
/// JSON-schema rendering of its configuration contract, and the check
/// body. The body takes the accessor explicitly; there is no implicit
/// injection.
#[async_trait]
pub trait QueryUnit: Send + Sync {
    /// Unique name; the aggregation and tool-catalog key.
    fn name(&self) -> &'static str;

    /// What the check does, joined with its config schema documentation.
    fn description(&self) -> String;

    /// JSON-schema object describing every configuration field the unit
    /// reads, required and optional alike.
    fn parameters(&self) -> Value;

    /// Run the check and return the flagged records, unfiltered.
    async fn run(
        &self,
        repo: &dyn RepoAccessor,
        config: &ResolvedConfig,
    ) -> Result<Vec<ResultRecord>, AuditError>;
}

/// Tool-catalog entry in the generic tool-calling shape.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The catalog of query units, built once and read many times.
pub struct QueryRegistry {
    units: BTreeMap<&'static str, Box<dyn QueryUnit>>,
}

impl QueryRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
        }
    }

    /// Registry pre-loaded with the built-in checks.
    pub fn with_builtin_queries() -> Result<Self, AuditError> {
        let mut registry = Self::new();
        registry.register(Box::new(crate::queries::old_open_prs::OldOpenPrs))?;
        registry.register(Box::new(crate::queries::large_prs::LargePrs))?;
        registry.register(Box::new(crate::queries::large_closed_prs::LargeClosedPrs))?;
        registry.register(Box::new(
            crate::queries::stale_or_long_lived_prs::StaleOrLongLivedPrs,
        ))?;
        Ok(registry)
    }

    /// Add a unit; fails with [`AuditError::DuplicateQuery`] when the
    /// name is already taken. Silent last-write-wins is never acceptable.
    pub fn register(&mut self, unit: Box<dyn QueryUnit>) -> Result<(), AuditError> {
        let name = unit.name();
        if self.units.contains_key(name) {
            return Err(AuditError::DuplicateQuery(name.to_string()));
        }
        self.units.insert(name, unit);
        Ok(())
    }

    /// Look up a unit by name.
    pub fn get(&self, name: &str) -> Option<&dyn QueryUnit> {
        self.units.get(name).map(|unit| unit.as_ref())
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.units.keys().copied().collect()
    }

    /// Render the tool catalog. Derivable without executing any query.
    pub fn tool_catalog(&self) -> Vec<ToolDefinition> {
        self.units
            .values()
            .map(|unit| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: unit.name().to_string(),
                    description: unit.description(),
                    parameters: unit.parameters(),
                },
            })
            .collect()
    }
}

impl Default for QueryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
