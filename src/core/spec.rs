//! core::spec
//!
//! Package specifications.

use serde::{Deserialize, Serialize};

fn latest() -> String {
    "latest".to_string()
}

/// A package name pinned to a version.
///
/// `latest` is the conventional unpinned version; backends translate it to
/// their own notion of "whatever the repository currently ships".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// The package name as the backend knows it.
    pub package: String,

    /// The version of the package.
    #[serde(default = "latest")]
    pub version: String,
}

impl PackageSpec {
    /// An unpinned (`latest`) specification.
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: latest(),
        }
    }

    /// A specification pinned to `version`.
    pub fn versioned(package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
        }
    }

    /// Whether the spec is unpinned.
    pub fn is_latest(&self) -> bool {
        self.version.is_empty() || self.version == "latest"
    }
}

impl std::fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.package, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_to_latest() {
        let spec = PackageSpec::new("ripgrep");
        assert!(spec.is_latest());
        assert_eq!(spec.to_string(), "ripgrep@latest");
    }

    #[test]
    fn version_defaults_on_deserialize() {
        let spec: PackageSpec = serde_yaml::from_str("package: fzf").unwrap();
        assert_eq!(spec.version, "latest");
    }
}
