//! Helm Chart.yaml model and standardization
//!
//! Charts pulled from upstreams carry Chart.yaml files in whatever key
//! order and style their authors chose. Packaging rewrites them, so before
//! diffing or archiving every Chart.yaml is rewritten into one canonical
//! form: fixed field order, empty fields dropped.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::layout::CHART_YAML;

/// Helm Chart.yaml metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// API version (v1 or v2)
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Chart name
    pub name: String,

    /// Chart version (SemVer)
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,

    /// Kubernetes version constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_version: Option<String>,

    /// Chart description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Chart type (application or library)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ChartDependency>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<ChartMaintainer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// App version
    #[serde(
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Keys this model does not know, written back after the known ones
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_api_version() -> String {
    "v2".to_string()
}

/// Chart dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDependency {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(
        rename = "import-values",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub import_values: Option<serde_yaml::Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Chart maintainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartMaintainer {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ChartMetadata {
    /// Parse Chart.yaml content
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let chart: Self = serde_yaml::from_str(yaml)?;
        if chart.name.trim().is_empty() {
            return Err(CoreError::InvalidChart {
                path: CHART_YAML.to_string(),
                message: "name must not be empty".to_string(),
            });
        }
        if chart.version.trim().is_empty() {
            return Err(CoreError::InvalidChart {
                path: CHART_YAML.to_string(),
                message: "version must not be empty".to_string(),
            });
        }
        Ok(chart)
    }

    /// Load the Chart.yaml of the chart rooted at `chart_dir`
    pub fn load(chart_dir: &Path) -> Result<Self> {
        let path = chart_dir.join(CHART_YAML);
        if !path.exists() {
            return Err(CoreError::ChartNotFound {
                path: chart_dir.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            CoreError::InvalidChart { message, .. } => CoreError::InvalidChart {
                path: path.display().to_string(),
                message,
            },
            CoreError::YamlParse(e) => CoreError::InvalidChart {
                path: path.display().to_string(),
                message: e.to_string(),
            },
            other => other,
        })
    }

    /// Render the canonical Chart.yaml form
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parse the chart version as semver
    pub fn parsed_version(&self) -> Option<Version> {
        Version::parse(&self.version).ok()
    }

    /// `<name>-<version>`, the key under which a chart version must be unique
    pub fn name_version(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Rewrite the Chart.yaml under `chart_dir` in its canonical form
///
/// Returns whether the file content changed.
pub fn standardize_chart_yaml(chart_dir: &Path) -> Result<bool> {
    let path = chart_dir.join(CHART_YAML);
    let original = std::fs::read_to_string(&path).map_err(|_| CoreError::ChartNotFound {
        path: chart_dir.display().to_string(),
    })?;
    let chart = ChartMetadata::load(chart_dir)?;
    let standardized = chart.to_yaml()?;
    if standardized == original {
        return Ok(false);
    }
    std::fs::write(&path, standardized)?;
    tracing::debug!(path = %path.display(), "standardized Chart.yaml");
    Ok(true)
}

/// Turn a directory of plain manifests into a minimal Helm chart
///
/// A directory that already holds a Chart.yaml only gets standardized.
/// Otherwise every top-level YAML file moves into `templates/` and a
/// placeholder Chart.yaml named after the directory is written.
pub fn ensure_helm_chart(chart_dir: &Path) -> Result<()> {
    if chart_dir.join(CHART_YAML).exists() {
        standardize_chart_yaml(chart_dir)?;
        return Ok(());
    }

    let templates = chart_dir.join("templates");
    std::fs::create_dir_all(&templates)?;
    for entry in std::fs::read_dir(chart_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            std::fs::rename(&path, templates.join(entry.file_name()))?;
        }
    }

    let name = chart_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "chart".to_string());
    let chart = ChartMetadata {
        api_version: default_api_version(),
        name,
        version: "0.0.0".to_string(),
        kube_version: None,
        description: Some("A Helm chart generated from plain manifests".to_string()),
        chart_type: None,
        keywords: vec![],
        home: None,
        sources: vec![],
        dependencies: vec![],
        maintainers: vec![],
        icon: None,
        app_version: None,
        deprecated: false,
        annotations: BTreeMap::new(),
        extra: BTreeMap::new(),
    };
    std::fs::write(chart_dir.join(CHART_YAML), chart.to_yaml()?)?;
    tracing::info!(dir = %chart_dir.display(), "converted plain manifests into a Helm chart");
    Ok(())
}

/// Versions like `1.0` or `2` are often written as YAML numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    scalar_to_string(&value).ok_or_else(|| serde::de::Error::custom("expected a version string"))
}

fn optional_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

/// Render a YAML scalar as a string; `None` for mappings and sequences
pub fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MESSY_CHART: &str = r#"
version: 1.2.0
name: nginx
appVersion: 1.25
description: NGINX
keywords: []
apiVersion: v2
annotations:
  catalog.cattle.io/release-name: nginx
"#;

    #[test]
    fn test_parse_numeric_versions() {
        let chart = ChartMetadata::from_yaml("name: x\nversion: 2\nappVersion: 1.25\n").unwrap();
        assert_eq!(chart.version, "2");
        assert_eq!(chart.app_version.as_deref(), Some("1.25"));
        assert_eq!(chart.api_version, "v2");
    }

    #[test]
    fn test_missing_name_is_invalid() {
        let err = ChartMetadata::from_yaml("name: ''\nversion: 1.0.0\n").unwrap_err();
        assert!(matches!(err, CoreError::InvalidChart { .. }));
    }

    #[test]
    fn test_canonical_field_order() {
        let chart = ChartMetadata::from_yaml(MESSY_CHART).unwrap();
        let yaml = chart.to_yaml().unwrap();
        let keys: Vec<&str> = yaml
            .lines()
            .filter(|l| !l.starts_with(' '))
            .filter_map(|l| l.split(':').next())
            .collect();
        assert_eq!(
            keys,
            vec!["apiVersion", "name", "version", "description", "appVersion", "annotations"]
        );
    }

    #[test]
    fn test_standardize_is_idempotent() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CHART_YAML), MESSY_CHART).unwrap();

        assert!(standardize_chart_yaml(temp.path()).unwrap());
        let first = std::fs::read_to_string(temp.path().join(CHART_YAML)).unwrap();
        assert!(!standardize_chart_yaml(temp.path()).unwrap());
        let second = std::fs::read_to_string(temp.path().join(CHART_YAML)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ensure_helm_chart_from_manifests() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("crds");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("crd.yaml"), "kind: CustomResourceDefinition\n").unwrap();
        std::fs::write(dir.join("README.md"), "docs\n").unwrap();

        ensure_helm_chart(&dir).unwrap();

        assert!(dir.join("templates/crd.yaml").exists());
        assert!(dir.join("README.md").exists());
        let chart = ChartMetadata::load(&dir).unwrap();
        assert_eq!(chart.name, "crds");
        assert_eq!(chart.version, "0.0.0");
    }

    #[test]
    fn test_standardize_keeps_dependency_fields_and_unknown_keys() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CHART_YAML),
            r#"
name: rancher-monitoring
version: 104.0.0
apiVersion: v2
x-vendor-notes: keep me
dependencies:
- name: grafana
  condition: grafana.enabled
  enabled: false
  import-values:
  - data
  - child: default.data
    parent: myimports
  x-pinned: true
"#,
        )
        .unwrap();

        standardize_chart_yaml(temp.path()).unwrap();
        let chart = ChartMetadata::load(temp.path()).unwrap();

        let grafana = &chart.dependencies[0];
        assert_eq!(grafana.enabled, Some(false));
        let imports = grafana.import_values.as_ref().unwrap().as_sequence().unwrap();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].as_str(), Some("data"));
        assert_eq!(
            grafana.extra.get("x-pinned").and_then(|v| v.as_bool()),
            Some(true)
        );
        assert_eq!(
            chart.extra.get("x-vendor-notes").and_then(|v| v.as_str()),
            Some("keep me")
        );

        let yaml = std::fs::read_to_string(temp.path().join(CHART_YAML)).unwrap();
        assert!(yaml.contains("enabled: false"));
        assert!(yaml.contains("import-values:"));
        assert!(yaml.contains("parent: myimports"));
    }

    #[test]
    fn test_load_missing_chart() {
        let temp = TempDir::new().unwrap();
        let err = ChartMetadata::load(temp.path()).unwrap_err();
        assert!(matches!(err, CoreError::ChartNotFound { .. }));
    }
}
