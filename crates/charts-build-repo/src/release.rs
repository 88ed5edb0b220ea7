//! Release selection (`release.yaml`)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{RepoError, Result};

/// Chart versions selected for the next release, keyed by chart name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseOptions(pub BTreeMap<String, Vec<String>>);

impl ReleaseOptions {
    /// Parse from YAML; an empty document means nothing is selected
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load `release.yaml`; a missing file means nothing is selected
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Self::from_yaml(&content).map_err(|e| RepoError::InvalidConfig {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Whether `chart` at `version` is selected
    pub fn contains(&self, chart: &str, version: &str) -> bool {
        self.0
            .get(chart)
            .is_some_and(|versions| versions.iter().any(|v| v == version))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|v| v.is_empty())
    }

    pub fn charts(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_release_options() {
        let options = ReleaseOptions::from_yaml(
            "rancher-monitoring:\n  - 100.1.0\n  - 100.2.0\nfleet:\n  - 104.0.1\n",
        )
        .unwrap();
        assert!(options.contains("rancher-monitoring", "100.2.0"));
        assert!(options.contains("fleet", "104.0.1"));
        assert!(!options.contains("fleet", "104.0.0"));
        assert!(!options.contains("rancher-logging", "100.1.0"));
    }

    #[test]
    fn test_missing_and_empty_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("release.yaml");
        assert!(ReleaseOptions::load(&path).unwrap().is_empty());

        std::fs::write(&path, "\n").unwrap();
        assert!(ReleaseOptions::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("release.yaml");
        std::fs::write(&path, "fleet: 3\n").unwrap();
        let err = ReleaseOptions::load(&path).unwrap_err();
        assert!(matches!(err, RepoError::InvalidConfig { .. }));
    }
}
