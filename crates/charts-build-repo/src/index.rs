//! Helm repository index (`index.yaml`)

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

use charts_build_core::layout::{ARCHIVE_EXTENSION, ASSETS_DIR, HELM_INDEX_FILE};
use charts_build_core::{ChartMetadata, read_chart_metadata};

use crate::error::{RepoError, Result};

/// Repository index (Helm-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmIndex {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Chart versions indexed by chart name
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<IndexEntry>>,

    /// When this index was generated
    #[serde(default = "Utc::now")]
    pub generated: DateTime<Utc>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

impl Default for HelmIndex {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            entries: BTreeMap::new(),
            generated: Utc::now(),
        }
    }
}

/// One chart version in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(flatten)]
    pub metadata: ChartMetadata,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// SHA256 digest of the archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Archive locations
    #[serde(default)]
    pub urls: Vec<String>,
}

impl IndexEntry {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Parse version as semver
    pub fn parsed_version(&self) -> Option<Version> {
        Version::parse(&self.metadata.version).ok()
    }
}

impl HelmIndex {
    /// Parse index from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RepoError::IndexParse {
            path: HELM_INDEX_FILE.to_string(),
            message: e.to_string(),
        })
    }

    /// Load an index file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RepoError::NotFound {
                    what: "Helm index".to_string(),
                    path: path.display().to_string(),
                }
            } else {
                RepoError::Io(e)
            }
        })?;
        serde_yaml::from_str(&content).map_err(|e| RepoError::IndexParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Write the index as YAML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get all versions of a chart
    pub fn get(&self, name: &str) -> Option<&Vec<IndexEntry>> {
        self.entries.get(name)
    }

    /// Get a specific version of a chart
    pub fn get_version(&self, name: &str, version: &str) -> Option<&IndexEntry> {
        self.entries
            .get(name)?
            .iter()
            .find(|e| e.metadata.version == version)
    }

    /// Add an entry to the index
    pub fn add_entry(&mut self, entry: IndexEntry) {
        self.entries
            .entry(entry.metadata.name.clone())
            .or_default()
            .push(entry);
    }

    /// Order every chart's versions newest first
    pub fn sort_entries(&mut self) {
        for versions in self.entries.values_mut() {
            versions.sort_by(|a, b| {
                match (a.parsed_version(), b.parsed_version()) {
                    (Some(va), Some(vb)) => vb.cmp(&va),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => b.metadata.version.cmp(&a.metadata.version),
                }
            });
        }
    }
}

/// SHA256 of a file, hex encoded
pub fn file_digest(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&data)))
}

/// Rebuild `index.yaml` from every archive under `assets/`
///
/// Entries whose archive digest did not change keep their previous
/// `created` timestamp so regenerating an untouched repository does not
/// churn the index.
pub fn create_or_update_index(root: &Path) -> Result<HelmIndex> {
    let index_path = root.join(HELM_INDEX_FILE);
    let previous = if index_path.exists() {
        HelmIndex::load(&index_path)?
    } else {
        HelmIndex::default()
    };

    let mut index = HelmIndex::default();
    let now = Utc::now();
    let assets = root.join(ASSETS_DIR);

    if assets.exists() {
        for entry in WalkDir::new(&assets).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION)
            {
                continue;
            }

            let metadata = read_chart_metadata(path)?;
            let digest = file_digest(path)?;
            let url = path
                .strip_prefix(root)
                .unwrap_or(path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let created = previous
                .get_version(&metadata.name, &metadata.version)
                .filter(|old| old.digest.as_deref() == Some(digest.as_str()))
                .and_then(|old| old.created)
                .unwrap_or(now);

            index.add_entry(IndexEntry {
                metadata,
                created: Some(created),
                digest: Some(digest),
                urls: vec![url],
            });
        }
    }

    index.sort_entries();
    index.save(&index_path)?;
    tracing::info!(
        charts = index.entries.len(),
        path = %index_path.display(),
        "updated Helm index"
    );
    Ok(index)
}
