//! Error types for the governance engine
//!
//! Only structural and configuration problems are raised as errors.
//! Per-record problems (a malformed version pin, a dependency on a service
//! that is not in the catalog) are reported inside the relevant output
//! instead, so one bad manifest never blocks analysis of the others.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort an analysis pass
#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Invalid catalog: {record}: {reason}")]
    InvalidCatalog { record: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl GovernanceError {
    pub(crate) fn invalid_catalog(record: impl Into<String>, reason: impl Into<String>) -> Self {
        GovernanceError::InvalidCatalog {
            record: record.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        GovernanceError::Config(message.into())
    }
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;
