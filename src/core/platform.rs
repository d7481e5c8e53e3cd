//! core::platform
//!
//! Platform predicates for package-backend selection.

use serde::{Deserialize, Serialize};

/// A predicate over the running host.
///
/// Package requirements carry an ordered `Platform` → backends table; at
/// install time the first entry whose platform matches wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Matches every host.
    Any,
    Linux,
    Macos,
    Windows,
}

impl Platform {
    /// Whether this predicate holds on the running host.
    pub fn matches(self) -> bool {
        match self {
            Platform::Any => true,
            Platform::Linux => cfg!(target_os = "linux"),
            Platform::Macos => cfg!(target_os = "macos"),
            Platform::Windows => cfg!(target_os = "windows"),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Platform::Any => "any",
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
        };
        write!(f, "{name}")
    }
}
