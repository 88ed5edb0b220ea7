//! CLI error type with exit code handling
//!
//! Library errors are folded into a handful of user-facing categories, each
//! with its own diagnostic code and exit code.

use charts_build_core::CoreError;
use charts_build_lifecycle::LifecycleError;
use charts_build_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI error type carrying exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// A configuration or metadata file is invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(charts_build::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// diff or patch could not be used
    #[error("Tool error: {message}")]
    #[diagnostic(code(charts_build::cli::tool))]
    Tool {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Git error: {message}")]
    #[diagnostic(code(charts_build::cli::git))]
    Git {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Pulling an upstream chart failed
    #[error("Upstream error: {message}")]
    #[diagnostic(code(charts_build::cli::upstream))]
    Upstream { message: String },

    #[error("{message}")]
    #[diagnostic(code(charts_build::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Lifecycle error: {message}")]
    #[diagnostic(code(charts_build::cli::lifecycle))]
    Lifecycle { message: String },

    #[error("Found {count} image(s) with release candidate tags")]
    #[diagnostic(
        code(charts_build::cli::rc_tags),
        help("replace the -rc tags or add --ignore <chart>=<tag> for expected ones")
    )]
    RcTags { count: usize },

    #[error("Invalid usage: {message}")]
    #[diagnostic(code(charts_build::cli::usage))]
    Usage { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(charts_build::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough
    #[error("{message}")]
    #[diagnostic(code(charts_build::cli::error))]
    Other { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(charts_build::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Tool { .. } => exit_codes::TOOL_ERROR,
            CliError::Git { .. } => exit_codes::GIT_ERROR,
            CliError::Upstream { .. } => exit_codes::ERROR,
            CliError::NotFound { .. } => exit_codes::IO_ERROR,
            CliError::Lifecycle { .. } => exit_codes::LIFECYCLE_ERROR,
            CliError::RcTags { .. } => exit_codes::RC_TAGS_FOUND,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    fn config(message: impl Into<String>, help: Option<&str>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.map(String::from),
        }
    }

    fn tool(message: impl Into<String>, help: Option<&str>) -> Self {
        Self::Tool {
            message: message.into(),
            help: help.map(String::from),
        }
    }
}

const GNU_TOOLS_HELP: &str = "install GNU diffutils and GNU patch and make sure they come first on PATH";

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ToolUnavailable { .. } | CoreError::IncompatibleToolVariant { .. } => {
                CliError::tool(message, Some(GNU_TOOLS_HELP))
            }
            CoreError::SubprocessFailure { .. } => CliError::tool(message, None),
            CoreError::InvalidChart { .. } | CoreError::YamlParse(_) => {
                CliError::config(message, None)
            }
            CoreError::ChartNotFound { .. } => CliError::NotFound {
                message,
                help: Some("a chart directory needs a Chart.yaml".to_string()),
            },
            CoreError::Io(_) | CoreError::Walk(_) => CliError::Io { message },
            CoreError::Archive { .. } | CoreError::PathOutsideBase { .. } => {
                CliError::Other { message }
            }
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        let message = err.to_string();
        match err {
            RepoError::NotARepository { .. } => CliError::Git {
                message,
                help: Some("run inside a charts repository or pass --repo".to_string()),
            },
            RepoError::Git { .. } => CliError::Git {
                message,
                help: None,
            },
            RepoError::IndexParse { .. }
            | RepoError::InvalidConfig { .. }
            | RepoError::Serialization(_) => CliError::config(message, None),
            RepoError::DuplicateChartVersion { .. } => CliError::config(
                message,
                Some("remove one of the copies before standardizing"),
            ),
            RepoError::Oci { .. } | RepoError::InvalidOciReference { .. } => {
                CliError::Upstream { message }
            }
            RepoError::NotFound { .. } => CliError::NotFound {
                message,
                help: None,
            },
            RepoError::AssetScan { .. } => CliError::Other { message },
            RepoError::Core(core) => CliError::from(core),
            RepoError::Io(_) | RepoError::Walk(_) => CliError::Io { message },
        }
    }
}

impl From<LifecycleError> for CliError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::PolicyEvaluation { .. } => CliError::Lifecycle { message },
            LifecycleError::InvalidRules { .. } => CliError::config(
                message,
                Some("every branch line needs a rule with min and max versions"),
            ),
            LifecycleError::Repo(repo) => CliError::from(repo),
            LifecycleError::Io(_) => CliError::Io { message },
            LifecycleError::Json(_) => CliError::Other { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
