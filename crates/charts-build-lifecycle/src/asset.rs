//! Chart versions as read from a Helm index

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use charts_build_core::layout::HELM_INDEX_FILE;
use charts_build_repo::{HelmIndex, IndexEntry};

use crate::error::Result;

/// Chart name to the versions published for it
pub type AssetsMap = BTreeMap<String, Vec<Asset>>;

/// One published chart version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Asset {
    /// An asset known only by its version
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            app_version: None,
            digest: None,
            created: None,
            annotations: BTreeMap::new(),
        }
    }
}

impl From<&IndexEntry> for Asset {
    fn from(entry: &IndexEntry) -> Self {
        Self {
            version: entry.version().to_string(),
            app_version: entry.metadata.app_version.clone(),
            digest: entry.digest.clone(),
            created: entry.created,
            annotations: entry.metadata.annotations.clone(),
        }
    }
}

/// Every chart version of an index, in index order
pub fn assets_map(index: &HelmIndex) -> AssetsMap {
    index
        .entries
        .iter()
        .map(|(chart, entries)| (chart.clone(), entries.iter().map(Asset::from).collect()))
        .collect()
}

/// Read `index.yaml` at the root of a checkout
pub fn read_index_assets(root: &Path) -> Result<AssetsMap> {
    let index = HelmIndex::load(&root.join(HELM_INDEX_FILE))?;
    Ok(assets_map(&index))
}

/// Build an [`AssetsMap`] from `(chart, [versions])` pairs
pub fn assets_from<'a>(charts: impl IntoIterator<Item = (&'a str, Vec<&'a str>)>) -> AssetsMap {
    charts
        .into_iter()
        .map(|(chart, versions)| {
            (
                chart.to_string(),
                versions.into_iter().map(Asset::new).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_index_assets() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("index.yaml"),
            r#"apiVersion: v1
generated: "2024-01-01T00:00:00Z"
entries:
  rancher-monitoring:
    - name: rancher-monitoring
      version: 104.0.0+up45.31.1
      appVersion: v0.65.1
      digest: abc
      created: "2024-01-01T00:00:00Z"
    - name: rancher-monitoring
      version: 103.1.0+up45.31.1
"#,
        )
        .unwrap();

        let assets = read_index_assets(temp.path()).unwrap();
        let monitoring = &assets["rancher-monitoring"];
        assert_eq!(monitoring.len(), 2);
        assert_eq!(monitoring[0].version, "104.0.0+up45.31.1");
        assert_eq!(monitoring[0].app_version.as_deref(), Some("v0.65.1"));
        assert_eq!(monitoring[0].digest.as_deref(), Some("abc"));
        assert!(monitoring[1].created.is_none());
    }

    #[test]
    fn test_missing_index_fails() {
        let temp = TempDir::new().unwrap();
        assert!(read_index_assets(temp.path()).is_err());
    }
}
