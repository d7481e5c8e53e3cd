//! requirements
//!
//! Declarative requirements and their installation records.
//!
//! A requirement is a piece of desired state the engine knows how to
//! install, update, uninstall and probe:
//!
//! - [`PackageRequirement`] - a package whose satisfaction is "the probe
//!   command resolves on `$PATH`", installed through a platform-ordered
//!   backend table.
//! - [`GitRepoRequirement`] - a clone whose satisfaction is "the local path
//!   is a directory whose `origin` URL equals the normalized requirement
//!   URL".
//!
//! Installation records remember how a requirement was satisfied, in
//! particular whether the artifact pre-existed (`used_existing`). A
//! pre-existing package survives module removal; a recorded clone does not.

use std::path::PathBuf;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::spec::PackageSpec;
use crate::fsops::{FsError, FsOps};
use crate::pkg::{BackendError, PackageBackend, PlatformBackends};
use crate::vcs::{normalize_repo_url, CloneOptions, VcsClient, VcsError};

/// A required package with its probe command and backend table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRequirement {
    pub spec: PackageSpec,

    /// Probe used for satisfaction detection: the requirement is satisfied
    /// iff this command resolves on `$PATH`.
    pub command: String,

    /// Ordered platform → backends table; the first matching platform wins.
    pub backends: Vec<PlatformBackends>,
}

impl PackageRequirement {
    pub fn new(
        spec: PackageSpec,
        command: impl Into<String>,
        backends: Vec<PlatformBackends>,
    ) -> Self {
        Self {
            spec,
            command: command.into(),
            backends,
        }
    }

    /// Whether the probe command exists on `$PATH`.
    pub fn is_satisfied(&self, fs: &FsOps) -> bool {
        fs.do_commands_exist(&[self.command.as_str()])
    }

    /// Install through the first matching platform's backends.
    ///
    /// Backends of that platform are tried in order; per-backend failures
    /// are accumulated and, if none succeeds, a composite failure naming
    /// every attempted backend is raised. If no declared platform matches
    /// the host, that is its own failure naming the declared platforms.
    pub fn install(&self, fs: &FsOps) -> Result<PackageBackend, BackendError> {
        let row = self
            .backends
            .iter()
            .find(|row| row.platform.matches())
            .ok_or_else(|| BackendError::NoPlatformMatched {
                package: self.spec.to_string(),
                declared: self
                    .backends
                    .iter()
                    .map(|row| row.platform.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let mut attempts = Vec::new();
        for backend in &row.backends {
            info!("installing {} via {}", self.spec, backend.name());
            match backend.install(fs, &self.spec) {
                Ok(()) => return Ok(backend.clone()),
                Err(e) => attempts.push(format!("{}: {e}", backend.name())),
            }
        }

        Err(BackendError::AllBackendsFailed {
            package: self.spec.to_string(),
            attempts: attempts.join("; "),
        })
    }

    /// Update through the backend that originally installed the package.
    pub fn update(&self, fs: &FsOps, backend: &PackageBackend) -> Result<(), BackendError> {
        Ok(backend.update(fs, &self.spec)?)
    }

    /// Uninstall through the recorded backend; no backend means nothing to
    /// undo (the package pre-existed or was never tracked).
    pub fn uninstall(
        &self,
        fs: &FsOps,
        backend: Option<&PackageBackend>,
    ) -> Result<(), BackendError> {
        match backend {
            Some(backend) => {
                info!("uninstalling {} via {}", self.spec, backend.name());
                Ok(backend.uninstall(fs, &self.spec)?)
            }
            None => {
                debug!("{} has no recorded backend, keeping it", self.spec);
                Ok(())
            }
        }
    }
}

/// A required git clone.
///
/// The URL is normalized at construction and on deserialization, so journal
/// entries always compare in `https://host/user/repo` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawGitRepoRequirement")]
pub struct GitRepoRequirement {
    pub url: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submodules: Option<bool>,
}

#[derive(Deserialize)]
struct RawGitRepoRequirement {
    url: String,
    path: PathBuf,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    commit_id: Option<String>,
    #[serde(default)]
    depth: Option<u32>,
    #[serde(default)]
    submodules: Option<bool>,
}

impl From<RawGitRepoRequirement> for GitRepoRequirement {
    fn from(raw: RawGitRepoRequirement) -> Self {
        Self {
            url: normalize_repo_url(&raw.url),
            path: raw.path,
            branch: raw.branch,
            commit_id: raw.commit_id,
            depth: raw.depth,
            submodules: raw.submodules,
        }
    }
}

impl GitRepoRequirement {
    pub fn new(url: impl AsRef<str>, path: impl Into<PathBuf>) -> Self {
        Self {
            url: normalize_repo_url(url.as_ref()),
            path: path.into(),
            branch: None,
            commit_id: None,
            depth: None,
            submodules: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_commit(mut self, commit_id: impl Into<String>) -> Self {
        self.commit_id = Some(commit_id.into());
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_submodules(mut self, submodules: bool) -> Self {
        self.submodules = Some(submodules);
        self
    }

    /// Whether the local path is a clone of this repository.
    pub fn is_satisfied(&self, vcs: &VcsClient) -> bool {
        self.path.is_dir()
            && vcs
                .remote_get_url(&self.path, "origin")
                .map(|origin| origin == self.url)
                .unwrap_or(false)
    }

    /// Clone the repository, checking out the pinned commit if any.
    pub fn install(&self, vcs: &VcsClient) -> Result<(), VcsError> {
        info!("cloning {} -> {}", self.url, self.path.display());
        let opts = CloneOptions {
            branch: self.branch.clone(),
            depth: self.depth,
            submodules: self.submodules,
        };
        vcs.clone_repo(&opts, &self.url, &self.path, None)?;
        if let Some(commit_id) = &self.commit_id {
            vcs.checkout(&self.path, commit_id)?;
        }
        Ok(())
    }

    /// Fetch and check out the tracked branch (and pinned commit, if any).
    pub fn update(&self, vcs: &VcsClient) -> Result<(), VcsError> {
        let branch = match &self.branch {
            Some(branch) => branch.clone(),
            None => vcs.default_branch(&self.path)?,
        };
        vcs.fetch(&self.path, "origin", &branch)?;
        vcs.checkout(&self.path, &branch)?;
        if let Some(commit_id) = &self.commit_id {
            vcs.checkout(&self.path, commit_id)?;
        }
        Ok(())
    }

    /// Remove the clone; a missing directory is a no-op.
    pub fn uninstall(&self, fs: &FsOps) -> Result<bool, FsError> {
        if self.path.is_dir() {
            info!("removing clone at {}", self.path.display());
            fs.rmtree(&self.path)?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// How a package requirement was satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInstallationRecord {
    pub requirement: PackageRequirement,

    /// The backend that installed the package, if the engine installed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<PackageBackend>,

    /// The probe was already on `$PATH` when the engine first saw it; such
    /// packages are never uninstalled on removal.
    pub used_existing: bool,
}

/// How a git-repo requirement was satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitRepoInstallationRecord {
    pub requirement: GitRepoRequirement,
    pub used_existing: bool,
}

/// Convenience for a system package installed through the usual system
/// package managers of each platform.
pub fn system_package(name: &str, command: &str) -> PackageRequirement {
    use crate::core::platform::Platform;
    PackageRequirement::new(
        PackageSpec::new(name),
        command,
        vec![
            PlatformBackends::new(Platform::Macos, vec![PackageBackend::Brew]),
            PlatformBackends::new(
                Platform::Linux,
                vec![
                    PackageBackend::Apt,
                    PackageBackend::Pacman,
                    PackageBackend::Yum,
                ],
            ),
            PlatformBackends::new(
                Platform::Windows,
                vec![PackageBackend::Choco, PackageBackend::Scoop],
            ),
        ],
    )
}
