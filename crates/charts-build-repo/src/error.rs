//! Error types for repository operations

use charts_build_core::CoreError;
use thiserror::Error;

/// Repository operation errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Git Errors ============
    #[error("Not a git repository: {path}")]
    NotARepository { path: String },

    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    // ============ Index Errors ============
    #[error("Index parse error in {path}: {message}")]
    IndexParse { path: String, message: String },

    // ============ Upstream Errors ============
    #[error("OCI registry error: {message}")]
    Oci { message: String },

    #[error("Invalid OCI reference: {reference}")]
    InvalidOciReference { reference: String },

    // ============ Layout Errors ============
    #[error("Could not find {what} at {path} in repository")]
    NotFound { what: String, path: String },

    #[error("Chart {name} at version {version} is declared in {first} and {second}")]
    DuplicateChartVersion {
        name: String,
        version: String,
        first: String,
        second: String,
    },

    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig { path: String, message: String },

    #[error("Errors while scanning assets:\n{summary}")]
    AssetScan { summary: String },

    // ============ Wrapped Errors ============
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Filesystem walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<semver::Error> for RepoError {
    fn from(e: semver::Error) -> Self {
        RepoError::Serialization(format!("Invalid semver: {}", e))
    }
}
