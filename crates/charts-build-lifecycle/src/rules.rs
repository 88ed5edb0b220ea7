//! Version rules and the lifecycle window
//!
//! Each branch line (`2.9`, `2.8`, ...) owns a range of chart major
//! versions. A chart version is inside the lifecycle when its major falls
//! between the minimum of the oldest still-supported line and the maximum
//! of the current line.

use semver::Version;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{LifecycleError, Result};

/// Predicates deciding where a chart version belongs
pub trait LifecyclePolicy {
    /// Whether `version` is inside the supported window
    fn in_lifecycle(&self, version: &str) -> bool;

    /// Whether `version` belongs to the current branch line and must be released
    fn should_release(&self, version: &str) -> Result<bool>;

    /// Whether `version` is a release candidate
    fn is_release_candidate(&self, version: &str) -> bool {
        version.contains("-rc")
    }
}

/// Major version bounds of one branch line, as written in the rules file
#[derive(Debug, Clone, Deserialize)]
pub struct RuleRange {
    pub min: String,
    pub max: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RulesFile {
    branch_version: String,
    #[serde(default = "default_dev_prefix")]
    dev_branch_prefix: String,
    #[serde(default = "default_prod_prefix")]
    prod_branch_prefix: String,
    #[serde(default = "default_lifecycle_branches")]
    lifecycle_branches: usize,
    rules: BTreeMap<String, RuleRange>,
}

fn default_dev_prefix() -> String {
    "dev-v".to_string()
}

fn default_prod_prefix() -> String {
    "release-v".to_string()
}

fn default_lifecycle_branches() -> usize {
    2
}

/// Lifecycle window computed from `config/version-rules.yaml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRules {
    pub branch_version: String,
    pub dev_branch: String,
    pub prod_branch: String,
    /// Inclusive lower bound of the window (major)
    pub min_major: u64,
    /// Exclusive upper bound of the window (major)
    pub max_major: u64,
}

impl VersionRules {
    /// Load the rules file
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_for(path, None)
    }

    /// Load the rules file, computing the window of `branch_version`
    /// instead of the file's `branchVersion` when given
    pub fn load_for(path: &Path, branch_version: Option<&str>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LifecycleError::InvalidRules {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, branch_version).map_err(|e| match e {
            LifecycleError::InvalidRules { message, .. } => LifecycleError::InvalidRules {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parse rules from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::parse(yaml, None)
    }

    fn parse(yaml: &str, branch_version: Option<&str>) -> Result<Self> {
        let file: RulesFile = serde_yaml::from_str(yaml).map_err(|e| invalid(e.to_string()))?;
        Self::from_rules(
            branch_version.unwrap_or(&file.branch_version),
            &file.rules,
            file.lifecycle_branches,
            &file.dev_branch_prefix,
            &file.prod_branch_prefix,
        )
    }

    fn from_rules(
        branch_version: &str,
        rules: &BTreeMap<String, RuleRange>,
        lifecycle_branches: usize,
        dev_prefix: &str,
        prod_prefix: &str,
    ) -> Result<Self> {
        let mut lines = rules
            .iter()
            .map(|(line, range)| {
                let key = line_version(line)
                    .ok_or_else(|| invalid(format!("branch line {} is not a version", line)))?;
                let min = major_of(&range.min)
                    .ok_or_else(|| invalid(format!("invalid min {} for {}", range.min, line)))?;
                let max = major_of(&range.max)
                    .ok_or_else(|| invalid(format!("invalid max {} for {}", range.max, line)))?;
                Ok((key, line.as_str(), min, max))
            })
            .collect::<Result<Vec<_>>>()?;
        lines.sort_by(|a, b| a.0.cmp(&b.0));

        let current = lines
            .iter()
            .position(|(_, line, _, _)| *line == branch_version)
            .ok_or_else(|| invalid(format!("no rule for branch version {}", branch_version)))?;
        let oldest = current.saturating_sub(lifecycle_branches);

        let min_major = lines[oldest].2;
        let max_major = lines[current].3;
        if min_major >= max_major {
            return Err(invalid(format!(
                "empty lifecycle window {}..{} for {}",
                min_major, max_major, branch_version
            )));
        }

        Ok(Self {
            branch_version: branch_version.to_string(),
            dev_branch: format!("{}{}", dev_prefix, branch_version),
            prod_branch: format!("{}{}", prod_prefix, branch_version),
            min_major,
            max_major,
        })
    }

    /// Override the development and/or production branch names
    pub fn with_branches(mut self, dev: Option<String>, prod: Option<String>) -> Self {
        if let Some(dev) = dev {
            self.dev_branch = dev;
        }
        if let Some(prod) = prod {
            self.prod_branch = prod;
        }
        self
    }
}

impl LifecyclePolicy for VersionRules {
    fn in_lifecycle(&self, version: &str) -> bool {
        major_of(version).is_some_and(|major| major >= self.min_major && major < self.max_major)
    }

    fn should_release(&self, version: &str) -> Result<bool> {
        let parsed = Version::parse(version).map_err(|e| LifecycleError::PolicyEvaluation {
            version: version.to_string(),
            reason: e.to_string(),
        })?;
        Ok(parsed.major + 1 == self.max_major)
    }
}

/// Leading numeric component of a version string
fn major_of(version: &str) -> Option<u64> {
    version
        .trim_start_matches('v')
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
}

/// `2.9` → `2.9.0` so branch lines sort as versions
fn line_version(line: &str) -> Option<Version> {
    let padded = match line.matches('.').count() {
        0 => format!("{}.0.0", line),
        1 => format!("{}.0", line),
        _ => line.to_string(),
    };
    Version::parse(&padded).ok()
}

fn invalid(message: String) -> LifecycleError {
    LifecycleError::InvalidRules {
        path: "<inline>".to_string(),
        message,
    }
}
