//! Git working-tree operations
//!
//! Branch switches mutate the one working tree on disk, so everything here
//! is sequential. Callers that leave the original branch are expected to
//! restore it (see the lifecycle crate's branch guard).

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{RepoError, Result};

/// Default remote used for fetches
pub const DEFAULT_REMOTE: &str = "origin";

/// What `branch()` reports while HEAD is detached
pub const DETACHED_HEAD: &str = "HEAD";

/// The git operations the build tooling relies on
pub trait GitWorkspace {
    /// Root of the working tree
    fn dir(&self) -> &Path;

    /// Currently checked out branch, or [`DETACHED_HEAD`]
    fn branch(&self) -> &str;

    /// Commit currently checked out
    fn head(&self) -> &str;

    /// Check out an existing local branch, or a commit when given one
    fn checkout_branch(&mut self, branch: &str) -> Result<()>;

    /// Fetch `branch` from the remote and fast-forward the current checkout
    fn fetch_and_pull_branch(&mut self, branch: &str) -> Result<()>;

    /// Fetch `branch` from the remote and check out the fetched commit
    ///
    /// HEAD is detached at `<remote>/<branch>`; the local branch of that
    /// name is never moved, so commits that only exist locally survive.
    fn fetch_and_checkout_branch(&mut self, branch: &str) -> Result<()>;
}

/// A git repository driven through the `git` binary
#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
    branch: String,
    head: String,
    remote: String,
}

impl GitRepo {
    /// Open the repository containing `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        let toplevel = run_git(dir, &["rev-parse", "--show-toplevel"]).map_err(|_| {
            RepoError::NotARepository {
                path: dir.display().to_string(),
            }
        })?;
        let mut repo = Self {
            dir: PathBuf::from(toplevel.trim()),
            branch: String::new(),
            head: String::new(),
            remote: DEFAULT_REMOTE.to_string(),
        };
        repo.refresh()?;
        tracing::debug!(
            dir = %repo.dir.display(),
            branch = %repo.branch,
            head = %repo.head,
            "opened git repository"
        );
        Ok(repo)
    }

    /// Use a remote other than `origin`
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        run_git(&self.dir, args)
    }

    /// Re-read the branch and commit HEAD points at
    fn refresh(&mut self) -> Result<()> {
        self.branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?.trim().to_string();
        self.head = self.git(&["rev-parse", "HEAD"])?.trim().to_string();
        Ok(())
    }
}

impl GitWorkspace for GitRepo {
    fn dir(&self) -> &Path {
        &self.dir
    }

    fn branch(&self) -> &str {
        &self.branch
    }

    fn head(&self) -> &str {
        &self.head
    }

    fn checkout_branch(&mut self, branch: &str) -> Result<()> {
        self.git(&["checkout", branch])?;
        self.refresh()?;
        tracing::info!(branch, head = %self.head, "checked out branch");
        Ok(())
    }

    fn fetch_and_pull_branch(&mut self, branch: &str) -> Result<()> {
        let remote = self.remote.clone();
        self.git(&["fetch", &remote, branch])?;
        self.git(&["pull", "--ff-only", &remote, branch])?;
        self.refresh()?;
        tracing::info!(branch, remote = %remote, head = %self.head, "pulled branch");
        Ok(())
    }

    fn fetch_and_checkout_branch(&mut self, branch: &str) -> Result<()> {
        let remote = self.remote.clone();
        self.git(&["fetch", &remote, branch])?;
        let upstream = format!("{}/{}", remote, branch);
        self.git(&["checkout", "--detach", &upstream])?;
        self.refresh()?;
        tracing::info!(
            branch,
            remote = %remote,
            head = %self.head,
            "fetched and checked out branch"
        );
        Ok(())
    }
}

/// Run git in `dir`, returning stdout
fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| RepoError::Git {
            command: args.join(" "),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::error!(command = %args.join(" "), "git failed\n{}", stderr);
        return Err(RepoError::Git {
            command: args.join(" "),
            message: stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
