//! core::options
//!
//! Process-wide policy for destructive operations.
//!
//! # Design
//!
//! `Options` is a plain value built once from CLI flags and threaded into the
//! capabilities ([`crate::fsops::FsOps`] and everything constructed from it)
//! at construction time. The core never reads policy through ambient global
//! state, so tests can run engines with different policies side by side.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How a violated filesystem precondition is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Ask the user what to do.
    Ask,

    /// Overwrite in force: delete whatever is in the way.
    Force,

    /// Resolve non-intrusively: move conflicts aside, create what is missing.
    Auto,

    /// Cancel the operation.
    Quit,
}

impl Strategy {
    /// The strategies that resolve without further questions.
    ///
    /// ASK dispatches to one of these (or retries), so the interactive
    /// chooser offers exactly this set plus `TRY-AGAIN`.
    pub fn decidable() -> [Strategy; 3] {
        [Strategy::Force, Strategy::Auto, Strategy::Quit]
    }

    /// Display name used by the ASK chooser.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Ask => "ASK",
            Strategy::Force => "FORCE",
            Strategy::Auto => "AUTO",
            Strategy::Quit => "QUIT",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name().to_lowercase())
    }
}

/// Process-wide options, initialized once at CLI entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Log, but do not perform, any mutating action.
    pub dry_run: bool,

    /// Strategy used whenever a destructive precondition is violated.
    pub strategy: Strategy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dry_run: false,
            strategy: Strategy::Quit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_cautious() {
        let opts = Options::default();
        assert!(!opts.dry_run);
        assert_eq!(opts.strategy, Strategy::Quit);
    }

    #[test]
    fn decidable_excludes_ask() {
        assert!(!Strategy::decidable().contains(&Strategy::Ask));
    }

    #[test]
    fn strategy_round_trips_through_yaml() {
        for strategy in [Strategy::Ask, Strategy::Force, Strategy::Auto, Strategy::Quit] {
            let text = serde_yaml::to_string(&strategy).unwrap();
            let back: Strategy = serde_yaml::from_str(&text).unwrap();
            assert_eq!(back, strategy);
        }
    }
}
