//! Moving charts between `charts/` and `assets/`
//!
//! `charts/<chart>/<version>/` holds the unpacked chart a reviewer reads,
//! `assets/<chart>/<chart>-<version>.tgz` the package Helm serves. Both
//! trees must agree, so archiving always dumps the fresh package back.

use std::path::{Path, PathBuf};

use charts_build_core::fs::{prune_empty_dirs, remove_all};
use charts_build_core::layout::{ARCHIVE_EXTENSION, ASSETS_DIR, CHARTS_DIR, archive_name};
use charts_build_core::{
    ChartMetadata, extract_archive, read_chart_metadata, standardize_chart_yaml,
    write_chart_archive,
};

use crate::error::{RepoError, Result};

/// Package `charts/<chart>/<version>` into `assets/<chart>/`
///
/// `specific` limits the run to `<chart>` or `<chart>/<version>`; a filter
/// that matches nothing is an error. Returns the archives that were
/// (re)written.
pub fn archive_charts(root: &Path, specific: Option<&str>) -> Result<Vec<PathBuf>> {
    let charts_dir = root.join(CHARTS_DIR);
    let mut found = false;
    let mut written = Vec::new();

    for (chart, version) in subdirectory_pairs(&charts_dir)? {
        let chart_version = format!("{}/{}", chart, version);
        if let Some(filter) = specific {
            if filter != chart_version && filter != chart {
                continue;
            }
        }
        found = true;

        let chart_dir = charts_dir.join(&chart).join(&version);
        standardize_chart_yaml(&chart_dir)?;
        let metadata = ChartMetadata::load(&chart_dir)?;
        let file = archive_name(&metadata.name, &metadata.version);
        let asset_rel = format!("{}/{}", chart, file);
        let asset_path = root.join(ASSETS_DIR).join(&chart).join(&file);

        if write_chart_archive(&chart_dir, &metadata.name, &asset_path)? {
            tracing::info!(asset = %asset_path.display(), "archived chart");
            written.push(asset_path);
        } else {
            tracing::debug!(asset = %asset_path.display(), "archive already up to date");
        }

        dump_assets(root, Some(&asset_rel))?;
    }

    if let Some(filter) = specific {
        if !found {
            return Err(RepoError::NotFound {
                what: "chart".to_string(),
                path: format!("{}/{}", CHARTS_DIR, filter),
            });
        }
    }
    Ok(written)
}

/// Unpack `assets/<chart>/*.tgz` into `charts/<name>/<version>`
///
/// `specific` limits the run to `<chart>` or `<chart>/<file>.tgz`. The
/// target directory is cleared first so files dropped from the package do
/// not linger. Returns the chart directories that were written.
pub fn dump_assets(root: &Path, specific: Option<&str>) -> Result<Vec<PathBuf>> {
    let assets_dir = root.join(ASSETS_DIR);
    let mut found = false;
    let mut dumped = Vec::new();

    for (chart, file) in subdirectory_files(&assets_dir, ARCHIVE_EXTENSION)? {
        let asset_rel = format!("{}/{}", chart, file);
        if let Some(filter) = specific {
            if filter != asset_rel && filter != chart {
                continue;
            }
        }
        found = true;

        let tgz_path = assets_dir.join(&chart).join(&file);
        tracing::info!(asset = %tgz_path.display(), "unarchiving");
        let metadata = read_chart_metadata(&tgz_path)?;

        let target = root
            .join(CHARTS_DIR)
            .join(&metadata.name)
            .join(&metadata.version);
        remove_all(&target)?;
        extract_archive(&tgz_path, &target, true)?;
        prune_empty_dirs(&target)?;
        dumped.push(target);
    }

    if let Some(filter) = specific {
        if !found {
            return Err(RepoError::NotFound {
                what: "asset".to_string(),
                path: format!("{}/{}", ASSETS_DIR, filter),
            });
        }
    }
    Ok(dumped)
}

/// `(parent, child)` names of every directory two levels below `dir`
fn subdirectory_pairs(dir: &Path) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for parent in sorted_entries(dir)? {
        if !parent.is_dir() {
            continue;
        }
        for child in sorted_entries(&parent)? {
            if child.is_dir() {
                pairs.push((file_name(&parent), file_name(&child)));
            }
        }
    }
    Ok(pairs)
}

/// `(parent, file)` names of every file with `extension` one level below `dir`
fn subdirectory_files(dir: &Path, extension: &str) -> Result<Vec<(String, String)>> {
    let mut files = Vec::new();
    for parent in sorted_entries(dir)? {
        if !parent.is_dir() {
            continue;
        }
        for child in sorted_entries(&parent)? {
            if child.is_file() && child.extension().and_then(|e| e.to_str()) == Some(extension) {
                files.push((file_name(&parent), file_name(&child)));
            }
        }
    }
    Ok(files)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use charts_build_core::fs::write_file;
    use tempfile::TempDir;

    fn write_chart(root: &Path, name: &str, version: &str) -> PathBuf {
        let dir = root.join(CHARTS_DIR).join(name).join(version);
        write_file(
            &dir.join("Chart.yaml"),
            format!("apiVersion: v2\nname: {}\nversion: {}\n", name, version),
        )
        .unwrap();
        write_file(&dir.join("values.yaml"), "replicas: 1\n").unwrap();
        write_file(&dir.join("templates/deployment.yaml"), "kind: Deployment\n").unwrap();
        dir
    }

    #[test]
    fn test_archive_and_dump_round_trip() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_chart(root, "nginx", "1.2.0");
        write_chart(root, "redis", "17.0.0");

        let written = archive_charts(root, None).unwrap();
        assert_eq!(written.len(), 2);
        let asset = root.join("assets/nginx/nginx-1.2.0.tgz");
        assert!(asset.exists());

        remove_all(&root.join(CHARTS_DIR)).unwrap();
        let dumped = dump_assets(root, None).unwrap();
        assert_eq!(dumped.len(), 2);
        assert_eq!(
            std::fs::read_to_string(root.join("charts/nginx/1.2.0/templates/deployment.yaml"))
                .unwrap(),
            "kind: Deployment\n"
        );
    }

    #[test]
    fn test_unchanged_chart_keeps_archive_bytes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_chart(root, "nginx", "1.2.0");

        archive_charts(root, None).unwrap();
        let asset = root.join("assets/nginx/nginx-1.2.0.tgz");
        let before = std::fs::read(&asset).unwrap();

        let written = archive_charts(root, Some("nginx")).unwrap();
        assert!(written.is_empty());
        assert_eq!(std::fs::read(&asset).unwrap(), before);
    }

    #[test]
    fn test_filters() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_chart(root, "nginx", "1.2.0");
        write_chart(root, "nginx", "1.3.0");
        write_chart(root, "redis", "17.0.0");

        let written = archive_charts(root, Some("nginx/1.3.0")).unwrap();
        assert_eq!(written, vec![root.join("assets/nginx/nginx-1.3.0.tgz")]);
        assert!(!root.join("assets/redis").exists());

        let err = archive_charts(root, Some("postgres")).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));

        let dumped = dump_assets(root, Some("nginx/nginx-1.3.0.tgz")).unwrap();
        assert_eq!(dumped, vec![root.join("charts/nginx/1.3.0")]);
        let err = dump_assets(root, Some("redis")).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));
    }

    #[test]
    fn test_dump_removes_stale_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let chart_dir = write_chart(root, "nginx", "1.2.0");
        archive_charts(root, None).unwrap();

        write_file(&chart_dir.join("templates/stale.yaml"), "kind: Stale\n").unwrap();
        dump_assets(root, Some("nginx")).unwrap();
        assert!(!chart_dir.join("templates/stale.yaml").exists());
    }
}
