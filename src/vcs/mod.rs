//! vcs
//!
//! Git client capability.
//!
//! # Architecture
//!
//! `VcsClient` is the **only** module that shells out to git. Every
//! invocation goes through [`crate::fsops::FsOps`], so clones and checkouts
//! honor dry-run while queries (remote URL, default branch, commit ids) run
//! for real. The exact command lines are part of the contract:
//!
//! ```text
//! git clone [--branch=...] [--depth=...] [--submodules=...] <url> <path>
//! git fetch <remote> <branch>
//! git checkout <rev>
//! git remote get-url <name>
//! git symbolic-ref refs/remotes/origin/HEAD --short
//! git log -1 --pretty=%H <rev> -- <path>
//! ```

use std::path::Path;

use thiserror::Error;

use crate::fsops::{FsError, FsOps};

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The underlying git invocation failed.
    #[error("git: {0}")]
    Command(#[from] FsError),
}

/// Options for `git clone`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneOptions {
    pub branch: Option<String>,
    pub depth: Option<u32>,
    pub submodules: Option<bool>,
}

/// The git capability.
#[derive(Debug, Clone)]
pub struct VcsClient {
    fs: FsOps,
}

impl VcsClient {
    pub fn new(fs: FsOps) -> Self {
        Self { fs }
    }

    /// Clone `url` to `path`.
    pub fn clone_repo(
        &self,
        opts: &CloneOptions,
        url: &str,
        path: &Path,
        cwd: Option<&Path>,
    ) -> Result<(), VcsError> {
        let mut cmd = String::from("git clone");
        if let Some(branch) = &opts.branch {
            cmd.push_str(&format!(" --branch={branch}"));
        }
        if let Some(depth) = opts.depth {
            cmd.push_str(&format!(" --depth={depth}"));
        }
        if let Some(submodules) = opts.submodules {
            cmd.push_str(&format!(" --submodules={submodules}"));
        }
        cmd.push_str(&format!(" {url} {}", path.display()));
        Ok(self.fs.check_call_in(&cmd, cwd)?)
    }

    /// Fetch `branch` from `remote` inside the clone at `path`.
    pub fn fetch(&self, path: &Path, remote: &str, branch: &str) -> Result<(), VcsError> {
        Ok(self
            .fs
            .check_call_in(&format!("git fetch {remote} {branch}"), Some(path))?)
    }

    /// Check out `revision` inside the clone at `path`.
    pub fn checkout(&self, path: &Path, revision: &str) -> Result<(), VcsError> {
        Ok(self
            .fs
            .check_call_in(&format!("git checkout {revision}"), Some(path))?)
    }

    /// The normalized URL of remote `name` in the clone at `path`.
    pub fn remote_get_url(&self, path: &Path, name: &str) -> Result<String, VcsError> {
        let raw = self
            .fs
            .read_output_in(&format!("git remote get-url {name}"), Some(path))?;
        Ok(normalize_repo_url(raw.trim()))
    }

    /// The branch `refs/remotes/origin/HEAD` points at.
    pub fn default_branch(&self, path: &Path) -> Result<String, VcsError> {
        let raw = self.fs.read_output_in(
            "git symbolic-ref refs/remotes/origin/HEAD --short",
            Some(path),
        )?;
        let short = raw.trim();
        Ok(short.strip_prefix("origin/").unwrap_or(short).to_string())
    }

    /// The last commit id touching `relpath` (or the whole tree) at
    /// `revision` (or HEAD) in the repository at `repo_path`.
    pub fn last_commit_id_of(
        &self,
        repo_path: &Path,
        revision: Option<&str>,
        relpath: Option<&Path>,
    ) -> Result<String, VcsError> {
        let revision = revision.unwrap_or("");
        let relpath = relpath.map(|p| p.display().to_string()).unwrap_or_default();
        let raw = self.fs.read_output_in(
            &format!("git log -1 --pretty=%H {revision} -- {relpath}"),
            Some(repo_path),
        )?;
        Ok(raw.trim().to_string())
    }
}

/// Normalize a git repository URL to `https://<host>/<user>/<repo>`.
///
/// Strips surrounding whitespace and trailing slashes, drops a `.git`
/// suffix, and rewrites the `git@host:...` and `http://...` forms to
/// `https://`.
pub fn normalize_repo_url(url: &str) -> String {
    let mut url = url.trim().trim_end_matches('/').to_string();

    while let Some(stripped) = url.strip_suffix(".git") {
        url = stripped.to_string();
    }

    if url.starts_with("git@") {
        url = url.replace(':', "/").replacen("git@", "https://", 1);
    } else if let Some(rest) = url.strip_prefix("http://") {
        url = format!("https://{rest}");
    }

    url.trim_end_matches('/').to_string()
}
