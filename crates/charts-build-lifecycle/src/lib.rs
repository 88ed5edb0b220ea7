//! charts-build lifecycle tracking
//!
//! Compares the chart versions of the current, production and development
//! branches against the lifecycle window of the branch line:
//!
//! - [`rules`]: the window (`config/version-rules.yaml`) behind [`LifecyclePolicy`]
//! - [`classify`]: pure bucketing of versions
//! - [`status`]: the git-driven run and the branch guard
//! - [`logs`], [`state`], [`report`]: what a run leaves under `logs/`

pub mod asset;
pub mod classify;
pub mod error;
pub mod logs;
pub mod report;
pub mod rules;
pub mod state;
pub mod status;

pub use asset::{Asset, AssetsMap, assets_from, assets_map, read_index_assets};
pub use classify::{
    CrossBranch, LifecycleSplit, PartialSplit, ReleaseSplit, classify_current_branch,
    compare_released_and_development, separate_release_from_forward_port,
};
pub use error::{LifecycleError, Result, StatusError};
pub use logs::{ReportHeader, write_logs};
pub use report::save_report;
pub use rules::{LifecyclePolicy, VersionRules};
pub use state::write_state;
pub use status::{BranchGuard, Branches, Status, StatusReporter};
