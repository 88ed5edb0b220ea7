//! Error types for lifecycle tracking

use charts_build_repo::RepoError;
use thiserror::Error;

use crate::status::Status;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Cannot evaluate version {version}: {reason}")]
    PolicyEvaluation { version: String, reason: String },

    #[error("Invalid version rules in {path}: {message}")]
    InvalidRules { path: String, message: String },

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;

/// A status run that failed part-way, with everything computed before the failure
#[derive(Debug, Error)]
#[error("{source}")]
pub struct StatusError {
    pub status: Box<Status>,
    #[source]
    pub source: LifecycleError,
}

impl StatusError {
    pub fn new(status: Status, source: impl Into<LifecycleError>) -> Self {
        Self {
            status: Box::new(status),
            source: source.into(),
        }
    }
}
