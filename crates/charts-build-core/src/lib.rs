//! charts-build core - shared types for the chart build tooling
//!
//! This crate provides the foundations used by every other charts-build crate:
//! - `ChartMetadata`: the Helm Chart.yaml model and its canonical form
//! - `archive`: reproducible `.tgz` packaging and extraction
//! - `patch`: the `PatchEngine` over GNU diff/patch
//! - `layout`: where things live in a charts repository

pub mod archive;
pub mod chart;
pub mod error;
pub mod fs;
pub mod layout;
pub mod patch;

pub use archive::{
    extract_archive, extract_archive_bytes, package_chart, read_archive_files,
    read_chart_metadata, write_chart_archive,
};
pub use chart::{
    ChartDependency, ChartMaintainer, ChartMetadata, ensure_helm_chart, standardize_chart_yaml,
};
pub use error::{CoreError, Result};
pub use patch::{GnuPatchEngine, PatchEngine, SystemProbe, ToolProbe, strip_timestamps};
