//! Rebuild a Helm repository into the `charts/` + `assets/` layout

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use charts_build_core::fs::remove_all;
use charts_build_core::layout::{ASSETS_DIR, CHART_YAML, CHARTS_DIR, archive_name};
use charts_build_core::{ChartMetadata, standardize_chart_yaml, write_chart_archive};

use crate::assets::dump_assets;
use crate::error::{RepoError, Result};
use crate::index::create_or_update_index;

/// Regenerate `assets/` from `charts/`, dump it back and rebuild the index
///
/// Every directory under `charts/` holding a `Chart.yaml` is a chart unless
/// it sits inside another chart (a subchart). Two charts declaring the same
/// name and version are rejected before anything is removed.
pub fn restructure_charts_and_assets(root: &Path) -> Result<usize> {
    let charts_dir = root.join(CHARTS_DIR);
    if !charts_dir.is_dir() {
        return Err(RepoError::NotFound {
            what: "charts".to_string(),
            path: charts_dir.display().to_string(),
        });
    }

    tracing::info!(dir = %charts_dir.display(), "collecting valid charts");
    let charts = collect_top_level_charts(&charts_dir)?;

    tracing::info!("ensuring chart versions are unique");
    let mut seen: BTreeMap<(String, String), &PathBuf> = BTreeMap::new();
    for (path, metadata) in &charts {
        let key = (metadata.name.clone(), metadata.version.clone());
        if let Some(first) = seen.insert(key, path) {
            tracing::error!(
                chart = %metadata.name,
                version = %metadata.version,
                "chart version conflict"
            );
            return Err(RepoError::DuplicateChartVersion {
                name: metadata.name.clone(),
                version: metadata.version.clone(),
                first: relative(root, first),
                second: relative(root, path),
            });
        }
    }

    let assets_dir = root.join(ASSETS_DIR);
    remove_all(&assets_dir)?;
    for (path, metadata) in &charts {
        standardize_chart_yaml(path)?;
        let output = assets_dir
            .join(&metadata.name)
            .join(archive_name(&metadata.name, &metadata.version));
        write_chart_archive(path, &metadata.name, &output)?;
    }

    remove_all(&charts_dir)?;
    dump_assets(root, None)?;
    create_or_update_index(root)?;

    tracing::info!(charts = charts.len(), "standardized repository");
    Ok(charts.len())
}

/// Charts under `charts_dir`, excluding subcharts, ordered by path
fn collect_top_level_charts(charts_dir: &Path) -> Result<Vec<(PathBuf, ChartMetadata)>> {
    let mut found: BTreeMap<PathBuf, ChartMetadata> = BTreeMap::new();
    for entry in WalkDir::new(charts_dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == CHART_YAML {
            if let Some(dir) = entry.path().parent() {
                found.insert(dir.to_path_buf(), ChartMetadata::load(dir)?);
            }
        }
    }

    let dirs: Vec<PathBuf> = found.keys().cloned().collect();
    found.retain(|path, _| {
        let is_subchart = path
            .ancestors()
            .skip(1)
            .take_while(|a| a.starts_with(charts_dir))
            .any(|a| dirs.binary_search_by(|d| d.as_path().cmp(a)).is_ok());
        if is_subchart {
            tracing::debug!(path = %path.display(), "skipping subchart");
        }
        !is_subchart
    });

    Ok(found.into_iter().collect())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use charts_build_core::fs::write_file;
    use tempfile::TempDir;

    fn chart_yaml(name: &str, version: &str) -> String {
        format!("name: {}\nversion: {}\napiVersion: v2\n", name, version)
    }

    #[test]
    fn test_restructure_ignores_subcharts() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_file(&root.join("charts/legacy-nginx/Chart.yaml"), chart_yaml("nginx", "1.2.0")).unwrap();
        write_file(
            &root.join("charts/legacy-nginx/charts/common/Chart.yaml"),
            chart_yaml("common", "0.1.0"),
        )
        .unwrap();
        write_file(&root.join("charts/redis/17.0.0/Chart.yaml"), chart_yaml("redis", "17.0.0")).unwrap();

        let count = restructure_charts_and_assets(root).unwrap();
        assert_eq!(count, 2);

        assert!(root.join("assets/nginx/nginx-1.2.0.tgz").exists());
        assert!(root.join("assets/redis/redis-17.0.0.tgz").exists());
        assert!(!root.join("assets/common").exists());
        assert!(!root.join("charts/legacy-nginx").exists());
        assert!(root.join("charts/nginx/1.2.0/charts/common/Chart.yaml").exists());

        let chart = std::fs::read_to_string(root.join("charts/redis/17.0.0/Chart.yaml")).unwrap();
        assert!(chart.starts_with("apiVersion: v2\nname: redis\n"));
        assert!(root.join("index.yaml").exists());
    }

    #[test]
    fn test_restructure_rejects_duplicates() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_file(&root.join("charts/a/Chart.yaml"), chart_yaml("nginx", "1.2.0")).unwrap();
        write_file(&root.join("charts/b/Chart.yaml"), chart_yaml("nginx", "1.2.0")).unwrap();
        write_file(&root.join("assets/keep.txt"), "untouched").unwrap();

        let err = restructure_charts_and_assets(root).unwrap_err();
        match err {
            RepoError::DuplicateChartVersion { name, version, first, second } => {
                assert_eq!(name, "nginx");
                assert_eq!(version, "1.2.0");
                assert_eq!(first, "charts/a");
                assert_eq!(second, "charts/b");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(root.join("assets/keep.txt").exists());
    }

    #[test]
    fn test_restructure_requires_charts_dir() {
        let temp = TempDir::new().unwrap();
        let err = restructure_charts_and_assets(temp.path()).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));
    }
}
