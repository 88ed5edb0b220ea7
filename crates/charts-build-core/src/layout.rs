//! Repository layout conventions
//!
//! Every path here is relative to the root of the charts repository.

/// Unpacked charts, laid out as `charts/<chart>/<version>/`
pub const CHARTS_DIR: &str = "charts";

/// Packaged charts, laid out as `assets/<chart>/<chart>-<version>.tgz`
pub const ASSETS_DIR: &str = "assets";

/// Package definitions, one directory per package
pub const PACKAGES_DIR: &str = "packages";

/// Helm repository index
pub const HELM_INDEX_FILE: &str = "index.yaml";

/// Release selection (chart -> versions)
pub const RELEASE_OPTIONS_FILE: &str = "release.yaml";

/// Lifecycle version rules
pub const VERSION_RULES_FILE: &str = "config/version-rules.yaml";

/// Lifecycle status logs
pub const LOGS_DIR: &str = "logs";

/// Package options file inside `packages/<name>/`
pub const PACKAGE_OPTIONS_FILE: &str = "package.yaml";

/// Generated changes, relative to a package directory
pub const GENERATED_CHANGES_DIR: &str = "generated-changes";

/// Patch files, relative to a package directory
pub const GENERATED_CHANGES_PATCH_DIR: &str = "generated-changes/patch";

/// Overlay files, relative to a package directory
pub const GENERATED_CHANGES_OVERLAY_DIR: &str = "generated-changes/overlay";

/// Excluded files, relative to a package directory
pub const GENERATED_CHANGES_EXCLUDE_DIR: &str = "generated-changes/exclude";

/// Default working directory of a package's chart
pub const DEFAULT_WORKING_DIR: &str = "charts";

/// Chart metadata file name
pub const CHART_YAML: &str = "Chart.yaml";

/// Extension of packaged charts
pub const ARCHIVE_EXTENSION: &str = "tgz";

/// Extension of patch files
pub const PATCH_EXTENSION: &str = "patch";

/// Directory a package's upstream is pulled into when generating patches
#[must_use]
pub fn original_dir(working_dir: &str) -> String {
    format!("{}-original", working_dir.trim_end_matches('/'))
}

/// File name of a packaged chart
#[must_use]
pub fn archive_name(chart: &str, version: &str) -> String {
    format!("{}-{}.{}", chart, version, ARCHIVE_EXTENSION)
}
