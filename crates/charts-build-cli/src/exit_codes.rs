//! Exit codes of the `charts-build` binary
//!
//! These follow Unix conventions and sysexits.h where applicable.

/// Operation completed without errors
pub const SUCCESS: i32 = 0;

/// Unspecified failure
pub const ERROR: i32 = 1;

/// Invalid configuration: package.yaml, release.yaml, version rules, index.yaml
pub const CONFIG_ERROR: i32 = 2;

/// diff/patch missing, incompatible or failing
pub const TOOL_ERROR: i32 = 3;

/// git failed or the directory is not a repository
pub const GIT_ERROR: i32 = 4;

/// File not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Release candidate image tags were found
pub const RC_TAGS_FOUND: i32 = 6;

/// A chart version could not be evaluated against the lifecycle rules
pub const LIFECYCLE_ERROR: i32 = 7;

/// Invalid arguments or options (sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
