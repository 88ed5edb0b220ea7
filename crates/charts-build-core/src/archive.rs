//! Packaged chart (`.tgz`) creation and extraction
//!
//! Archives follow the Helm layout: every entry is prefixed with the chart
//! name (`nginx/Chart.yaml`, `nginx/templates/...`). Entries are written in
//! sorted order with a zero mtime so that packaging the same chart twice
//! yields the same bytes.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Builder, Header};
use walkdir::WalkDir;

use crate::chart::ChartMetadata;
use crate::error::{CoreError, Result};
use crate::layout::CHART_YAML;

/// Package the chart rooted at `chart_dir` into gzip'd tar bytes
pub fn package_chart(chart_dir: &Path, chart_name: &str) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);

    let mut files: Vec<PathBuf> = WalkDir::new(chart_dir)
        .follow_links(false)
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();

    for file_path in files {
        let rel_path = file_path
            .strip_prefix(chart_dir)
            .map_err(|_| CoreError::PathOutsideBase {
                path: file_path.display().to_string(),
                base: chart_dir.display().to_string(),
            })?;
        let archive_path = format!("{}/{}", chart_name, to_slash(rel_path));
        let content = std::fs::read(&file_path)?;
        add_bytes_to_archive(&mut builder, &archive_path, &content)?;
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// Package the chart at `chart_dir` into `output`
///
/// An existing archive with identical contents is left untouched.
/// Returns whether `output` was (re)written.
pub fn write_chart_archive(chart_dir: &Path, chart_name: &str, output: &Path) -> Result<bool> {
    let data = package_chart(chart_dir, chart_name)?;

    if output.exists() {
        let existing = read_all_files(File::open(output)?)?;
        let fresh = read_all_files(std::io::Cursor::new(&data))?;
        if existing == fresh {
            tracing::debug!(archive = %output.display(), "archive contents unchanged");
            return Ok(false);
        }
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(output)?;
    file.write_all(&data)?;
    Ok(true)
}

/// Extract an archive into `dest`
///
/// With `strip_root` the leading chart-name directory of every entry is
/// dropped, so `nginx/Chart.yaml` lands at `dest/Chart.yaml`.
pub fn extract_archive(archive_path: &Path, dest: &Path, strip_root: bool) -> Result<()> {
    extract_from_reader(File::open(archive_path)?, dest, strip_root)
}

/// Extract archive bytes into `dest`, see [`extract_archive`]
pub fn extract_archive_bytes(data: &[u8], dest: &Path, strip_root: bool) -> Result<()> {
    extract_from_reader(std::io::Cursor::new(data), dest, strip_root)
}

fn extract_from_reader<R: Read>(reader: R, dest: &Path, strip_root: bool) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    std::fs::create_dir_all(dest)?;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let Some(relative) = sanitize_entry_path(&path, strip_root) else {
            continue;
        };
        let target = dest.join(&relative);
        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if !entry.header().entry_type().is_file() {
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        std::fs::write(&target, content)?;
    }

    Ok(())
}

/// Read every regular file of an archive, keyed by entry path
pub fn read_archive_files(archive_path: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    read_all_files(File::open(archive_path)?)
}

fn read_all_files<R: Read>(reader: R) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut contents = BTreeMap::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.to_string_lossy().to_string();
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        contents.insert(path, data);
    }

    Ok(contents)
}

/// Read the top-level chart's metadata from a packaged chart
///
/// Subchart Chart.yaml files (`nginx/charts/sub/Chart.yaml`) are ignored.
pub fn read_chart_metadata(archive_path: &Path) -> Result<ChartMetadata> {
    let files = read_archive_files(archive_path)?;
    let (_, content) = files
        .iter()
        .find(|(path, _)| {
            let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
            parts.len() == 2 && parts[1] == CHART_YAML
        })
        .ok_or_else(|| CoreError::Archive {
            message: format!("no {} found in {}", CHART_YAML, archive_path.display()),
        })?;
    let text = std::str::from_utf8(content).map_err(|e| CoreError::Archive {
        message: format!("invalid UTF-8 in {}: {}", CHART_YAML, e),
    })?;
    ChartMetadata::from_yaml(text).map_err(|e| CoreError::InvalidChart {
        path: archive_path.display().to_string(),
        message: e.to_string(),
    })
}

/// Drop the archive root (if asked) and refuse entries escaping `dest`
fn sanitize_entry_path(path: &Path, strip_root: bool) -> Option<PathBuf> {
    let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));
    if strip_root {
        components.next()?;
    }
    let mut out = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => out.push(part),
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Add bytes to a tar archive with a given path
fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();

    builder.append_data(&mut header, archive_path, content)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_chart(dir: &Path) {
        std::fs::create_dir_all(dir.join("templates")).unwrap();
        std::fs::write(
            dir.join(CHART_YAML),
            "apiVersion: v2\nname: nginx\nversion: 1.2.0\n",
        )
        .unwrap();
        std::fs::write(dir.join("values.yaml"), "replicas: 3\n").unwrap();
        std::fs::write(
            dir.join("templates/deployment.yaml"),
            "apiVersion: apps/v1\nkind: Deployment\n",
        )
        .unwrap();
        std::fs::create_dir_all(dir.join("charts/sub")).unwrap();
        std::fs::write(
            dir.join("charts/sub/Chart.yaml"),
            "apiVersion: v2\nname: sub\nversion: 0.1.0\n",
        )
        .unwrap();
    }

    #[test]
    fn test_package_and_extract() {
        let temp = TempDir::new().unwrap();
        let chart_dir = temp.path().join("chart");
        create_test_chart(&chart_dir);

        let archive = temp.path().join("nginx-1.2.0.tgz");
        assert!(write_chart_archive(&chart_dir, "nginx", &archive).unwrap());

        let files = read_archive_files(&archive).unwrap();
        assert!(files.contains_key("nginx/Chart.yaml"));
        assert!(files.contains_key("nginx/templates/deployment.yaml"));

        let out = temp.path().join("out");
        extract_archive(&archive, &out, true).unwrap();
        assert_eq!(
            std::fs::read_to_string(out.join("values.yaml")).unwrap(),
            "replicas: 3\n"
        );
        assert!(out.join("charts/sub/Chart.yaml").exists());
    }

    #[test]
    fn test_repackaging_unchanged_chart_is_noop() {
        let temp = TempDir::new().unwrap();
        let chart_dir = temp.path().join("chart");
        create_test_chart(&chart_dir);
        let archive = temp.path().join("nginx-1.2.0.tgz");

        write_chart_archive(&chart_dir, "nginx", &archive).unwrap();
        let first = std::fs::read(&archive).unwrap();
        assert!(!write_chart_archive(&chart_dir, "nginx", &archive).unwrap());
        assert_eq!(first, std::fs::read(&archive).unwrap());

        std::fs::write(chart_dir.join("values.yaml"), "replicas: 5\n").unwrap();
        assert!(write_chart_archive(&chart_dir, "nginx", &archive).unwrap());
    }

    #[test]
    fn test_read_chart_metadata_ignores_subcharts() {
        let temp = TempDir::new().unwrap();
        let chart_dir = temp.path().join("chart");
        create_test_chart(&chart_dir);
        let archive = temp.path().join("nginx-1.2.0.tgz");
        write_chart_archive(&chart_dir, "nginx", &archive).unwrap();

        let chart = read_chart_metadata(&archive).unwrap();
        assert_eq!(chart.name, "nginx");
        assert_eq!(chart.version, "1.2.0");
    }

    #[test]
    fn test_sanitize_entry_path() {
        assert_eq!(
            sanitize_entry_path(Path::new("nginx/templates/a.yaml"), true),
            Some(PathBuf::from("templates/a.yaml"))
        );
        assert_eq!(sanitize_entry_path(Path::new("nginx"), true), None);
        assert_eq!(sanitize_entry_path(Path::new("nginx/../../etc"), true), None);
        assert_eq!(
            sanitize_entry_path(Path::new("./nginx/Chart.yaml"), false),
            Some(PathBuf::from("nginx/Chart.yaml"))
        );
    }
}
