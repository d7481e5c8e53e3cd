//! pkg
//!
//! Package-manager backends.
//!
//! # Architecture
//!
//! `PackageBackend` is a tagged union rather than a trait object because the
//! backend that installed a package is journaled inside
//! [`crate::requirements::PackageInstallationRecord`] and must round-trip
//! through the YAML persistence. Each variant knows how to build its own
//! command lines; all execution flows through [`FsOps`], so backends honor
//! dry-run and surface non-zero exits as typed failures carrying the command
//! line and captured stderr.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::platform::Platform;
use crate::core::spec::PackageSpec;
use crate::fsops::{FsError, FsOps};

/// Errors from backend selection and execution.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No declared platform matches the running host.
    #[error("cannot install {package}: no declared platform matches (declared: {declared})")]
    NoPlatformMatched {
        package: String,
        /// Comma-joined list of the declared platforms.
        declared: String,
    },

    /// Every backend of the matching platform failed.
    #[error("failed to install {package} using any backend: {attempts}")]
    AllBackendsFailed {
        package: String,
        /// Per-backend failure summaries, `; `-joined.
        attempts: String,
    },

    /// A single backend invocation failed.
    #[error(transparent)]
    Command(#[from] FsError),
}

/// A concrete package-manager backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PackageBackend {
    Apt,
    Brew,
    Cargo,
    Go,
    Pacman,
    Scoop,
    Choco,
    Yum,
    BobNvim,
    /// Installer driven by arbitrary shell one-liners; `{version}` in the
    /// templates is substituted with the spec's version.
    CurlSh {
        install_cmd: String,
        uninstall_cmd: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        update_cmd: Option<String>,
    },
}

impl PackageBackend {
    /// Short name used in logs and composite error messages.
    pub fn name(&self) -> &'static str {
        match self {
            PackageBackend::Apt => "apt",
            PackageBackend::Brew => "brew",
            PackageBackend::Cargo => "cargo",
            PackageBackend::Go => "go",
            PackageBackend::Pacman => "pacman",
            PackageBackend::Scoop => "scoop",
            PackageBackend::Choco => "choco",
            PackageBackend::Yum => "yum",
            PackageBackend::BobNvim => "bob-nvim",
            PackageBackend::CurlSh { .. } => "curl-sh",
        }
    }

    /// Whether the backend's own tooling is present on the host.
    pub fn is_available(&self, fs: &FsOps) -> bool {
        match self {
            PackageBackend::Apt => fs.do_commands_exist(&["apt"]),
            PackageBackend::Brew => fs.do_commands_exist(&["brew"]),
            PackageBackend::Cargo => fs.do_commands_exist(&["cargo"]),
            PackageBackend::Go => fs.do_commands_exist(&["go"]),
            PackageBackend::Pacman => fs.do_commands_exist(&["pacman"]),
            PackageBackend::Scoop => fs.do_commands_exist(&["scoop"]),
            PackageBackend::Choco => fs.do_commands_exist(&["choco"]),
            PackageBackend::Yum => fs.do_commands_exist(&["yum"]),
            PackageBackend::BobNvim => fs.do_commands_exist(&["bob"]),
            PackageBackend::CurlSh { .. } => fs.do_commands_exist(&["curl", "sh"]),
        }
    }

    /// Install `spec`.
    pub fn install(&self, fs: &FsOps, spec: &PackageSpec) -> Result<(), FsError> {
        fs.check_call(&self.install_cmdline(spec))
    }

    /// Uninstall `spec`.
    pub fn uninstall(&self, fs: &FsOps, spec: &PackageSpec) -> Result<(), FsError> {
        match self.uninstall_cmdline(spec) {
            Some(cmd) => fs.check_call(&cmd),
            None => {
                warn!("uninstalling {} via {} is not supported", spec, self.name());
                Ok(())
            }
        }
    }

    /// Update `spec` to the declared version.
    pub fn update(&self, fs: &FsOps, spec: &PackageSpec) -> Result<(), FsError> {
        fs.check_call(&self.update_cmdline(spec))
    }

    fn install_cmdline(&self, spec: &PackageSpec) -> String {
        let p = &spec.package;
        let v = &spec.version;
        match self {
            PackageBackend::Apt if spec.is_latest() => format!("sudo apt install -y {p}"),
            PackageBackend::Apt => format!("sudo apt install -y {p}={v}"),
            PackageBackend::Brew if spec.is_latest() => format!("brew install {p}"),
            PackageBackend::Brew => format!("brew install {p}@{v}"),
            PackageBackend::Cargo if spec.is_latest() => format!("cargo install {p}"),
            PackageBackend::Cargo => format!("cargo install --version {v} {p}"),
            PackageBackend::Go => format!("go install {p}@{v}"),
            PackageBackend::Pacman => format!("sudo pacman -S {p}"),
            PackageBackend::Scoop if spec.is_latest() => format!("scoop install {p}"),
            PackageBackend::Scoop => format!("scoop install {p}@{v}"),
            PackageBackend::Choco if spec.is_latest() => format!("choco install {p}"),
            PackageBackend::Choco => format!("choco install {p} --version {v}"),
            PackageBackend::Yum if spec.is_latest() => format!("sudo yum install -y {p}"),
            PackageBackend::Yum => format!("sudo yum install {p}-{v}"),
            PackageBackend::BobNvim => format!("bob use {v}"),
            PackageBackend::CurlSh { install_cmd, .. } => install_cmd.replace("{version}", v),
        }
    }

    fn uninstall_cmdline(&self, spec: &PackageSpec) -> Option<String> {
        let p = &spec.package;
        let v = &spec.version;
        Some(match self {
            PackageBackend::Apt => format!("sudo apt remove -y {p}"),
            PackageBackend::Brew if spec.is_latest() => format!("brew uninstall {p}"),
            PackageBackend::Brew => format!("brew uninstall {p}@{v}"),
            PackageBackend::Cargo => format!("cargo uninstall --package {p}"),
            PackageBackend::Go => return None,
            PackageBackend::Pacman => format!("sudo pacman -R {p}"),
            PackageBackend::Scoop if spec.is_latest() => format!("scoop uninstall {p}"),
            PackageBackend::Scoop => format!("scoop uninstall {p}@{v}"),
            PackageBackend::Choco if spec.is_latest() => format!("choco uninstall {p}"),
            PackageBackend::Choco => format!("choco uninstall {p} --version {v}"),
            PackageBackend::Yum if spec.is_latest() => format!("sudo yum remove -y {p}"),
            PackageBackend::Yum => format!("sudo yum remove {p}-{v}"),
            PackageBackend::BobNvim => format!("bob uninstall {v}"),
            PackageBackend::CurlSh { uninstall_cmd, .. } => uninstall_cmd.replace("{version}", v),
        })
    }

    fn update_cmdline(&self, spec: &PackageSpec) -> String {
        let p = &spec.package;
        let v = &spec.version;
        match self {
            PackageBackend::Brew if spec.is_latest() => format!("brew upgrade {p}"),
            PackageBackend::Brew => format!("brew upgrade {p}@{v}"),
            PackageBackend::Scoop if spec.is_latest() => format!("scoop update {p}"),
            PackageBackend::Scoop => format!("scoop update {p}@{v}"),
            PackageBackend::CurlSh {
                install_cmd,
                update_cmd,
                ..
            } => update_cmd
                .as_ref()
                .unwrap_or(install_cmd)
                .replace("{version}", v),
            // The rest update by reinstalling.
            _ => self.install_cmdline(spec),
        }
    }
}

/// One row of a requirement's ordered platform → backends table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformBackends {
    pub platform: Platform,
    pub backends: Vec<PackageBackend>,
}

impl PlatformBackends {
    pub fn new(platform: Platform, backends: Vec<PackageBackend>) -> Self {
        Self { platform, backends }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest(p: &str) -> PackageSpec {
        PackageSpec::new(p)
    }

    fn pinned(p: &str, v: &str) -> PackageSpec {
        PackageSpec::versioned(p, v)
    }

    mod cmdlines {
        use super::*;

        #[test]
        fn apt_pins_with_equals() {
            assert_eq!(
                PackageBackend::Apt.install_cmdline(&latest("tmux")),
                "sudo apt install -y tmux"
            );
            assert_eq!(
                PackageBackend::Apt.install_cmdline(&pinned("tmux", "3.3a")),
                "sudo apt install -y tmux=3.3a"
            );
        }

        #[test]
        fn brew_pins_with_at() {
            assert_eq!(
                PackageBackend::Brew.install_cmdline(&pinned("go", "1.21")),
                "brew install go@1.21"
            );
        }

        #[test]
        fn cargo_pins_with_version_flag() {
            assert_eq!(
                PackageBackend::Cargo.install_cmdline(&pinned("bob-nvim", "2.0.0")),
                "cargo install --version 2.0.0 bob-nvim"
            );
        }

        #[test]
        fn curl_sh_substitutes_version() {
            let backend = PackageBackend::CurlSh {
                install_cmd: "curl -sSL https://golang.org/dl/go{version}.tar.gz | tar -xzf -"
                    .to_string(),
                uninstall_cmd: "rm -rf /usr/local/go".to_string(),
                update_cmd: None,
            };
            assert_eq!(
                backend.install_cmdline(&pinned("go", "1.21.6")),
                "curl -sSL https://golang.org/dl/go1.21.6.tar.gz | tar -xzf -"
            );
            // update falls back to the install template
            assert_eq!(
                backend.update_cmdline(&pinned("go", "1.21.6")),
                backend.install_cmdline(&pinned("go", "1.21.6"))
            );
        }

        #[test]
        fn go_has_no_uninstall() {
            assert!(PackageBackend::Go.uninstall_cmdline(&latest("x")).is_none());
        }
    }

    mod serialization {
        use super::*;

        #[test]
        fn unit_backend_round_trips_with_tag() {
            let text = serde_yaml::to_string(&PackageBackend::Apt).unwrap();
            assert!(text.contains("kind: apt"));
            let back: PackageBackend = serde_yaml::from_str(&text).unwrap();
            assert_eq!(back, PackageBackend::Apt);
        }

        #[test]
        fn curl_sh_round_trips_with_fields() {
            let backend = PackageBackend::CurlSh {
                install_cmd: "curl -sSf https://sh.rustup.rs | sh".to_string(),
                uninstall_cmd: "rustup self uninstall".to_string(),
                update_cmd: None,
            };
            let text = serde_yaml::to_string(&backend).unwrap();
            let back: PackageBackend = serde_yaml::from_str(&text).unwrap();
            assert_eq!(back, backend);
        }
    }
}
