//! Lifecycle status across the current, production and development branches

use serde::Serialize;
use std::path::Path;

use charts_build_repo::{DETACHED_HEAD, GitWorkspace};

use crate::asset::AssetsMap;
use crate::classify::{
    CrossBranch, LifecycleSplit, ReleaseSplit, classify_current_branch,
    compare_released_and_development, separate_release_from_forward_port,
};
use crate::error::{LifecycleError, Result, StatusError};
use crate::rules::LifecyclePolicy;

/// Every classification of one status run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub in_lifecycle_current_branch: AssetsMap,
    pub out_lifecycle_current_branch: AssetsMap,
    pub released_in_lifecycle: AssetsMap,
    pub not_released_out_lifecycle: AssetsMap,
    pub not_released_in_lifecycle: AssetsMap,
    pub released_out_lifecycle: AssetsMap,
    pub to_be_released: AssetsMap,
    pub to_be_forward_ported: AssetsMap,
}

impl Status {
    fn apply_current(&mut self, split: LifecycleSplit) {
        self.in_lifecycle_current_branch = split.in_lifecycle;
        self.out_lifecycle_current_branch = split.out_lifecycle;
    }

    fn apply_cross_branch(&mut self, cross: CrossBranch) {
        self.released_in_lifecycle = cross.released_in_lifecycle;
        self.not_released_out_lifecycle = cross.not_released_out_lifecycle;
        self.not_released_in_lifecycle = cross.not_released_in_lifecycle;
        self.released_out_lifecycle = cross.released_out_lifecycle;
    }

    fn apply_release(&mut self, split: ReleaseSplit) {
        self.to_be_released = split.to_be_released;
        self.to_be_forward_ported = split.to_be_forward_ported;
    }

    /// Reduce every bucket to `chart`
    pub fn retain_chart(&mut self, chart: &str) {
        for map in [
            &mut self.in_lifecycle_current_branch,
            &mut self.out_lifecycle_current_branch,
            &mut self.released_in_lifecycle,
            &mut self.not_released_out_lifecycle,
            &mut self.not_released_in_lifecycle,
            &mut self.released_out_lifecycle,
            &mut self.to_be_released,
            &mut self.to_be_forward_ported,
        ] {
            map.retain(|name, _| name == chart);
        }
    }
}

/// The production and development branches a status run compares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branches {
    pub production: String,
    pub development: String,
}

/// Remembers the branch and commit checked out before a status run
///
/// Acquire before switching and release once the branches have been read.
/// Release is explicit so a failed switch can leave the checkout alone.
#[derive(Debug)]
#[must_use = "release the guard to restore the original branch"]
pub struct BranchGuard {
    original: String,
    original_head: String,
}

impl BranchGuard {
    pub fn acquire<G: GitWorkspace + ?Sized>(git: &G) -> Self {
        Self {
            original: git.branch().to_string(),
            original_head: git.head().to_string(),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn original_head(&self) -> &str {
        &self.original_head
    }

    /// Check the original branch out again
    ///
    /// A detached original is restored by commit.
    pub fn release<G: GitWorkspace + ?Sized>(self, git: &mut G) -> charts_build_repo::Result<()> {
        let detached = self.original == DETACHED_HEAD;
        let moved = if detached {
            git.branch() != DETACHED_HEAD || git.head() != self.original_head
        } else {
            git.branch() != self.original
        };
        if moved {
            let target = if detached { &self.original_head } else { &self.original };
            tracing::info!(branch = %self.original, checkout = %target, "restoring original checkout");
            git.checkout_branch(target)?;
        }
        if git.head() != self.original_head {
            tracing::info!(
                branch = %self.original,
                from = %self.original_head,
                to = %git.head(),
                "original branch was fast-forwarded"
            );
        }
        Ok(())
    }
}

/// Drives a status run over a git checkout
///
/// `read_index` turns the checkout root into the versions of its
/// `index.yaml`; it is called once per branch.
pub struct StatusReporter<'a, G, R> {
    git: &'a mut G,
    policy: &'a dyn LifecyclePolicy,
    branches: Branches,
    read_index: R,
}

impl<'a, G, R> StatusReporter<'a, G, R>
where
    G: GitWorkspace,
    R: FnMut(&Path) -> Result<AssetsMap>,
{
    pub fn new(
        git: &'a mut G,
        policy: &'a dyn LifecyclePolicy,
        branches: Branches,
        read_index: R,
    ) -> Self {
        Self {
            git,
            policy,
            branches,
            read_index,
        }
    }

    /// Classify every version of the three branches
    ///
    /// The original branch is restored once the production and development
    /// indexes have been read, including when reading one of them fails. A
    /// failed branch switch is returned as is, without restoring.
    pub fn status(&mut self) -> std::result::Result<Status, StatusError> {
        let mut status = Status::default();

        let root = self.git.dir().to_path_buf();
        let current = match (self.read_index)(&root) {
            Ok(current) => current,
            Err(e) => return Err(StatusError::new(status, e)),
        };
        status.apply_current(classify_current_branch(&current, self.policy));

        let guard = BranchGuard::acquire(&*self.git);
        let (released, development) = match self.read_branches(&root) {
            Ok(pair) => pair,
            Err(BranchRead::Switch(e)) => {
                tracing::error!(original = %guard.original(), "branch switch failed, not restoring");
                return Err(StatusError::new(status, e));
            }
            Err(BranchRead::Index(e)) => {
                if let Err(restore) = guard.release(&mut *self.git) {
                    tracing::error!(error = %restore, "failed to restore original branch");
                }
                return Err(StatusError::new(status, e));
            }
        };

        status.apply_cross_branch(compare_released_and_development(
            &released,
            &development,
            self.policy,
        ));

        if let Err(e) = guard.release(&mut *self.git) {
            return Err(StatusError::new(status, e));
        }

        match separate_release_from_forward_port(&status.not_released_in_lifecycle, self.policy) {
            Ok(split) => status.apply_release(split),
            Err(partial) => {
                status.apply_release(partial.split);
                return Err(StatusError::new(status, partial.error));
            }
        }

        Ok(status)
    }

    fn read_branches(&mut self, root: &Path) -> std::result::Result<(AssetsMap, AssetsMap), BranchRead> {
        let production = self.branches.production.clone();
        let development = self.branches.development.clone();

        if self.git.branch() == production {
            self.git
                .fetch_and_pull_branch(&production)
                .map_err(|e| BranchRead::Switch(e.into()))?;
        } else {
            self.git
                .fetch_and_checkout_branch(&production)
                .map_err(|e| BranchRead::Switch(e.into()))?;
        }
        let released = (self.read_index)(root).map_err(BranchRead::Index)?;

        self.git
            .fetch_and_checkout_branch(&development)
            .map_err(|e| BranchRead::Switch(e.into()))?;
        let dev = (self.read_index)(root).map_err(BranchRead::Index)?;

        Ok((released, dev))
    }
}

enum BranchRead {
    Switch(LifecycleError),
    Index(LifecycleError),
}
