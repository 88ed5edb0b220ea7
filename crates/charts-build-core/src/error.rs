//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Cannot run {tool}: GNU {tool} was not found on PATH")]
    ToolUnavailable { tool: String },

    #[error(
        "Detected Apple/FreeBSD version of {tool} at {path}. This leads to incompatible patches, install GNU {tool}"
    )]
    IncompatibleToolVariant { tool: String, path: String },

    #[error("{tool} exited with {}: {output}", describe_exit(.code))]
    SubprocessFailure {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    #[error("Chart not found: {path}")]
    ChartNotFound { path: String },

    #[error("Invalid Chart.yaml in {path}: {message}")]
    InvalidChart { path: String, message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Path {path} is not under {base}")]
    PathOutsideBase { path: String, base: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Filesystem walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
