//! Container image scanning of packaged charts
//!
//! Images are found the way chart authors conventionally declare them in
//! `values.yaml`: any mapping with a string `repository` and a `tag`.

use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

use charts_build_core::chart::scalar_to_string;
use charts_build_core::layout::{ARCHIVE_EXTENSION, ASSETS_DIR};
use charts_build_core::{read_archive_files, read_chart_metadata};

use crate::error::{RepoError, Result};
use crate::release::ReleaseOptions;

/// Image repository to the tags referenced for it
pub type ImageTagMap = BTreeMap<String, Vec<String>>;

const VALUES_FILES: &[&str] = &["values.yaml", "values.yml"];

/// Split `rancher-monitoring-100.1.0.tgz` into its chart name and version
///
/// The version starts after the first `-` whose remainder is a valid
/// SemVer version, so `foo-2fa-1.0.0.tgz` is chart `foo-2fa`. Only a guess
/// from the file name; scans read the packaged Chart.yaml instead.
pub fn chart_name_and_version(filename: &str) -> Result<(String, String)> {
    let stem = filename
        .strip_suffix(&format!(".{}", ARCHIVE_EXTENSION))
        .ok_or_else(|| RepoError::Serialization(format!("{} is not a .tgz file", filename)))?;

    stem.match_indices('-')
        .map(|(i, _)| i)
        .filter(|&i| i > 0)
        .find(|&i| semver::Version::parse(&stem[i + 1..]).is_ok())
        .map(|i| (stem[..i].to_string(), stem[i + 1..].to_string()))
        .ok_or_else(|| {
            RepoError::Serialization(format!("could not extract chart and version from {}", filename))
        })
}

/// Collect every `repository`/`tag` pair of a values document into `images`
///
/// A pair whose tag equals `ignored_tag` is skipped. Tags are deduplicated
/// per repository.
pub fn collect_images(values: &Value, ignored_tag: Option<&str>, images: &mut ImageTagMap) {
    match values {
        Value::Mapping(map) => {
            let repository = map.get("repository").and_then(Value::as_str);
            let tag = map.get("tag").and_then(scalar_to_string);
            if let (Some(repository), Some(tag)) = (repository, tag) {
                if ignored_tag != Some(tag.as_str()) {
                    let tags = images.entry(repository.to_string()).or_default();
                    if !tags.contains(&tag) {
                        tags.push(tag);
                    }
                }
            }
            for value in map.values() {
                collect_images(value, ignored_tag, images);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_images(item, ignored_tag, images);
            }
        }
        Value::Tagged(tagged) => collect_images(&tagged.value, ignored_tag, images),
        _ => {}
    }
}

/// Images of every chart version selected in `release`
///
/// `ignore` maps a chart name to a tag that is expected and not reported.
/// Failures of individual archives are collected and reported together.
pub fn collect_release_images(
    root: &Path,
    release: &ReleaseOptions,
    ignore: &BTreeMap<String, String>,
) -> Result<ImageTagMap> {
    let mut images = ImageTagMap::new();
    let mut failures: BTreeMap<String, String> = BTreeMap::new();
    let assets_dir = root.join(ASSETS_DIR);

    for entry in WalkDir::new(&assets_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION)
        {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().to_string();

        let (chart, version) = match read_chart_metadata(path) {
            Ok(metadata) => (metadata.name, metadata.version),
            Err(e) => {
                failures.insert(filename, e.to_string());
                continue;
            }
        };
        if !release.contains(&chart, &version) {
            continue;
        }

        tracing::info!(chart = %chart, version = %version, "collecting images and tags for chart");
        let ignored_tag = ignore.get(&chart).map(String::as_str);
        if let Err(e) = collect_archive_images(path, ignored_tag, &mut images) {
            failures.insert(filename, e.to_string());
        }
    }

    if !failures.is_empty() {
        let summary = failures
            .iter()
            .map(|(file, error)| format!("  {}: {}", file, error))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(RepoError::AssetScan { summary });
    }
    Ok(images)
}

fn collect_archive_images(
    archive: &Path,
    ignored_tag: Option<&str>,
    images: &mut ImageTagMap,
) -> Result<()> {
    for (entry, content) in read_archive_files(archive)? {
        let is_values = entry
            .rsplit('/')
            .next()
            .is_some_and(|name| VALUES_FILES.contains(&name));
        if !is_values {
            continue;
        }
        let values: Value = serde_yaml::from_slice(&content)?;
        collect_images(&values, ignored_tag, images);
    }
    Ok(())
}

/// Release-selected images whose tags are release candidates (`-rc`)
pub fn check_rc_tags(
    root: &Path,
    release: &ReleaseOptions,
    ignore: &BTreeMap<String, String>,
) -> Result<ImageTagMap> {
    tracing::info!("checking for RC tags in charts");
    let images = collect_release_images(root, release, ignore)?;

    let rc: ImageTagMap = images
        .into_iter()
        .filter_map(|(image, tags)| {
            let rc_tags: Vec<String> = tags.into_iter().filter(|t| t.contains("-rc")).collect();
            (!rc_tags.is_empty()).then_some((image, rc_tags))
        })
        .collect();
    Ok(rc)
}
