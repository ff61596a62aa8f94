//! Error taxonomy for the audit core.
//!
//! Every failure mode of a single `execute` call maps onto one of these
//! variants. None of them trigger retries; a failed call is terminal for
//! that call only.

use thiserror::Error;

/// Errors produced by the registry, resolver, dispatch engine and reports.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The requested query name is not present in the catalog.
    #[error("unknown query: '{0}'")]
    UnknownQuery(String),

    /// Two query units were registered under the same name.
    #[error("duplicate query name: '{0}'")]
    DuplicateQuery(String),

    /// A required field is missing or a field failed type coercion.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The repository accessor or LLM endpoint failed (network, auth, API).
    #[error("upstream access error: {0}")]
    UpstreamAccess(String),

    /// The requested report format is not recognized.
    #[error("unsupported output format: '{0}' (use 'json' or 'markdown')")]
    OutputFormat(String),
}

impl AuditError {
    /// Shorthand for configuration failures built from display-able causes.
    pub fn config(msg: impl std::fmt::Display) -> Self {
        AuditError::Configuration(msg.to_string())
    }

    /// Shorthand for upstream failures built from display-able causes.
    pub fn upstream(msg: impl std::fmt::Display) -> Self {
        AuditError::UpstreamAccess(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AuditError::UnknownQuery("get_nonexistent".to_string());
        assert!(err.to_string().contains("get_nonexistent"));

        let err = AuditError::config("start_date missing");
        assert!(err.to_string().contains("start_date missing"));

        let err = AuditError::OutputFormat("yaml".to_string());
        assert!(err.to_string().contains("yaml"));
    }
}
