//! Error types outside the dispatch path.
//!
//! Dispatch itself never returns errors to callers; faults raised there are
//! reported as [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.

use std::path::PathBuf;

/// Errors reading or writing the INI configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config file {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("failed to save config file {path:?}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for [{section}] {key}: {reason}")]
    Invalid {
        section: &'static str,
        key: &'static str,
        reason: String,
    },
}
