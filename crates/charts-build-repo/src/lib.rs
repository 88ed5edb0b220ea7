//! charts-build repository operations
//!
//! Everything that reads or rewrites a charts repository checkout:
//!
//! - **Helm index**: `index.yaml` model and regeneration from `assets/`
//! - **Assets**: archiving `charts/` into `assets/` and dumping them back
//! - **Standardize**: rebuilding an arbitrary Helm repository into that layout
//! - **Packages**: pulling upstream charts and maintaining `generated-changes/`
//! - **Git**: the branch operations the lifecycle report needs
//! - **Images**: release-candidate image tags in packaged charts
//!
//! ## Example
//!
//! ```rust,no_run
//! use charts_build_repo::{archive_charts, create_or_update_index};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let root = Path::new(".");
//! archive_charts(root, Some("rancher-monitoring"))?;
//! create_or_update_index(root)?;
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod error;
pub mod git;
pub mod images;
pub mod index;
pub mod oci;
pub mod package;
pub mod release;
pub mod standardize;

// Re-exports for convenience
pub use assets::{archive_charts, dump_assets};
pub use error::{RepoError, Result};
pub use git::{DEFAULT_REMOTE, DETACHED_HEAD, GitRepo, GitWorkspace};
pub use images::{ImageTagMap, chart_name_and_version, check_rc_tags, collect_images};
pub use index::{HelmIndex, IndexEntry, create_or_update_index, file_digest};
pub use oci::{OciReference, OciUpstream};
pub use package::{ChangeSummary, Package, PackageOptions, apply_changes, generate_changes};
pub use release::ReleaseOptions;
pub use standardize::restructure_charts_and_assets;
