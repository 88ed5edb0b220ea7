//! Packages: `packages/<name>/package.yaml` and the prepare/patch workflow
//!
//! A package pulls a chart from its upstream into `workingDir` and carries
//! the repository's modifications under `generated-changes/`:
//!
//! - `exclude/<path>`: files removed from the upstream chart
//! - `overlay/<path>`: files added to (or replacing) the upstream chart
//! - `patch/<path>.patch`: unified diffs against upstream files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use charts_build_core::fs::{copy_file, list_files, remove_all};
use charts_build_core::layout::{
    ARCHIVE_EXTENSION, DEFAULT_WORKING_DIR, GENERATED_CHANGES_DIR, GENERATED_CHANGES_EXCLUDE_DIR,
    GENERATED_CHANGES_OVERLAY_DIR, GENERATED_CHANGES_PATCH_DIR, PACKAGE_OPTIONS_FILE,
    PACKAGES_DIR, PATCH_EXTENSION, original_dir,
};
use charts_build_core::{PatchEngine, ensure_helm_chart, standardize_chart_yaml};

use crate::error::{RepoError, Result};
use crate::oci::OciUpstream;

/// Contents of `package.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageOptions {
    /// Upstream chart (`oci://...`); absent when the chart lives in the package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Directory the chart is prepared into, relative to the package
    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    /// Paths replaced wholesale instead of patched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replace_paths: Vec<String>,
}

fn default_working_dir() -> String {
    DEFAULT_WORKING_DIR.to_string()
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            url: None,
            working_dir: default_working_dir(),
            replace_paths: Vec::new(),
        }
    }
}

/// Changes recorded by [`generate_changes`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub patched: Vec<PathBuf>,
    pub overlaid: Vec<PathBuf>,
    pub excluded: Vec<PathBuf>,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        self.patched.is_empty() && self.overlaid.is_empty() && self.excluded.is_empty()
    }
}

/// A package directory and its options
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub dir: PathBuf,
    pub options: PackageOptions,
}

impl Package {
    /// Load `packages/<name>/package.yaml` under `root`
    pub fn load(root: &Path, name: &str) -> Result<Self> {
        let dir = root.join(PACKAGES_DIR).join(name);
        let options_path = dir.join(PACKAGE_OPTIONS_FILE);
        let content = std::fs::read_to_string(&options_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RepoError::NotFound {
                    what: format!("package {}", name),
                    path: options_path.display().to_string(),
                }
            } else {
                RepoError::Io(e)
            }
        })?;
        let options: PackageOptions =
            serde_yaml::from_str(&content).map_err(|e| RepoError::InvalidConfig {
                path: options_path.display().to_string(),
                message: e.to_string(),
            })?;

        if let Some(url) = &options.url {
            if !url.starts_with("oci://") {
                return Err(RepoError::InvalidConfig {
                    path: options_path.display().to_string(),
                    message: format!("unsupported upstream {}, expected oci://", url),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            dir,
            options,
        })
    }

    /// Whether the chart is kept inside the package instead of pulled
    pub fn is_local(&self) -> bool {
        self.options.url.is_none()
    }

    pub fn working_dir(&self) -> PathBuf {
        self.dir.join(&self.options.working_dir)
    }

    fn upstream(&self) -> Result<Option<OciUpstream>> {
        self.options.url.as_deref().map(OciUpstream::new).transpose()
    }

    /// Pull the upstream chart into the working directory and apply changes
    pub async fn prepare(&self, engine: &dyn PatchEngine) -> Result<()> {
        let working_dir = self.working_dir();
        let Some(upstream) = self.upstream()? else {
            tracing::info!(package = %self.name, "local chart does not need to be prepared");
            if !working_dir.exists() {
                return Err(RepoError::NotFound {
                    what: "local chart".to_string(),
                    path: working_dir.display().to_string(),
                });
            }
            standardize_chart_yaml(&working_dir)?;
            return Ok(());
        };

        tracing::info!(package = %self.name, dir = %working_dir.display(), "cleaning working directory");
        remove_all(&working_dir)?;
        upstream.pull_to(&working_dir).await?;
        ensure_helm_chart(&working_dir)?;
        apply_changes(&self.dir, Path::new(&self.options.working_dir), engine)?;
        tracing::info!(package = %self.name, "prepared package");
        Ok(())
    }

    /// Regenerate `generated-changes/` from the prepared working directory
    pub async fn generate_patch(&self, engine: &dyn PatchEngine) -> Result<ChangeSummary> {
        let Some(upstream) = self.upstream()? else {
            tracing::info!(package = %self.name, "local chart does not need to be patched");
            return Ok(ChangeSummary::default());
        };

        let working_dir = self.working_dir();
        if !working_dir.exists() {
            return Err(RepoError::NotFound {
                what: "prepared working directory".to_string(),
                path: working_dir.display().to_string(),
            });
        }
        standardize_chart_yaml(&working_dir)?;

        let original = original_dir(&self.options.working_dir);
        let original_path = self.dir.join(&original);
        remove_all(&original_path)?;

        let result = async {
            upstream.pull_to(&original_path).await?;
            ensure_helm_chart(&original_path)?;
            generate_changes(
                &self.dir,
                Path::new(&original),
                Path::new(&self.options.working_dir),
                &self.options.replace_paths,
                engine,
            )
        }
        .await;

        remove_all(&original_path)?;
        result
    }
}

/// Apply `generated-changes/` to `working_dir`
///
/// Both paths are relative to `package_dir`, which is also the patch
/// engine's root. Exclusions run first, then overlays, then patches.
pub fn apply_changes(package_dir: &Path, working_dir: &Path, engine: &dyn PatchEngine) -> Result<()> {
    let target = package_dir.join(working_dir);

    let exclude_dir = package_dir.join(GENERATED_CHANGES_EXCLUDE_DIR);
    for rel in list_files(&exclude_dir)? {
        tracing::debug!(path = %rel.display(), "excluding");
        remove_all(&target.join(&rel))?;
    }

    let overlay_dir = package_dir.join(GENERATED_CHANGES_OVERLAY_DIR);
    for rel in list_files(&overlay_dir)? {
        tracing::debug!(path = %rel.display(), "overlaying");
        copy_file(&overlay_dir.join(&rel), &target.join(&rel))?;
    }

    let patch_dir = package_dir.join(GENERATED_CHANGES_PATCH_DIR);
    for rel in list_files(&patch_dir)? {
        if rel.extension().and_then(|e| e.to_str()) != Some(PATCH_EXTENSION) {
            continue;
        }
        let patch_path = Path::new(GENERATED_CHANGES_PATCH_DIR).join(&rel);
        engine.apply(&patch_path, working_dir)?;
    }
    Ok(())
}

/// Record the difference between `original` and `working_dir` as changes
///
/// Paths are relative to `package_dir`. Any previous `generated-changes/`
/// is replaced.
pub fn generate_changes(
    package_dir: &Path,
    original: &Path,
    working_dir: &Path,
    replace_paths: &[String],
    engine: &dyn PatchEngine,
) -> Result<ChangeSummary> {
    remove_all(&package_dir.join(GENERATED_CHANGES_DIR))?;

    let original_abs = package_dir.join(original);
    let working_abs = package_dir.join(working_dir);
    let original_files = list_files(&original_abs)?;
    let working_files = list_files(&working_abs)?;

    let overlay_dir = package_dir.join(GENERATED_CHANGES_OVERLAY_DIR);
    let exclude_dir = package_dir.join(GENERATED_CHANGES_EXCLUDE_DIR);
    let mut summary = ChangeSummary::default();

    for rel in &original_files {
        if working_files.binary_search(rel).is_err() {
            copy_file(&original_abs.join(rel), &exclude_dir.join(rel))?;
            summary.excluded.push(rel.clone());
        }
    }

    for rel in &working_files {
        let working_file = working_abs.join(rel);
        if original_files.binary_search(rel).is_err() {
            copy_file(&working_file, &overlay_dir.join(rel))?;
            summary.overlaid.push(rel.clone());
            continue;
        }

        let original_file = original_abs.join(rel);
        if std::fs::read(&original_file)? == std::fs::read(&working_file)? {
            continue;
        }

        if is_replaced(rel, replace_paths) || is_unpatchable(rel) {
            copy_file(&original_file, &exclude_dir.join(rel))?;
            copy_file(&working_file, &overlay_dir.join(rel))?;
            summary.excluded.push(rel.clone());
            summary.overlaid.push(rel.clone());
            continue;
        }

        let mut patch_name = rel.as_os_str().to_owned();
        patch_name.push(".");
        patch_name.push(PATCH_EXTENSION);
        let patch_path = Path::new(GENERATED_CHANGES_PATCH_DIR).join(patch_name);
        if engine.generate(&original.join(rel), &working_dir.join(rel), &patch_path)? {
            summary.patched.push(rel.clone());
        }
    }

    tracing::info!(
        patched = summary.patched.len(),
        overlaid = summary.overlaid.len(),
        excluded = summary.excluded.len(),
        "generated changes"
    );
    Ok(summary)
}

fn is_replaced(rel: &Path, replace_paths: &[String]) -> bool {
    replace_paths
        .iter()
        .any(|p| rel.starts_with(p))
}

/// Archives and lock files are never diffed
fn is_unpatchable(rel: &Path) -> bool {
    matches!(
        rel.extension().and_then(|e| e.to_str()),
        Some(ext) if ext == ARCHIVE_EXTENSION || ext == "lock"
    )
}
