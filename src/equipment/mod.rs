//! equipment
//!
//! The equipment engine: transactions, the synchronizing manager and the
//! persisted journal.
//!
//! # Architecture
//!
//! The manager walks a dependency-ordered blueprint and, per module, runs
//! three reconciliation loops (packages, git repos, commands) against the
//! journaled state. Command execution happens inside per-module
//! [`Transaction`]s which roll back on failure; the whole manager state is
//! persisted atomically after every externally invoked operation, whether it
//! succeeded or not.
//!
//! # Invariants
//!
//! 1. `records[0..effect_len)` of any transaction reflects currently applied
//!    effects; everything from `effect_len` onward has been undone.
//! 2. For every `INSTALLED` module, the concatenation of its transactions'
//!    effect records is exactly what was executed, in order, and not yet
//!    undone.
//! 3. A `used_existing` package is never uninstalled on removal; a
//!    non-`used_existing` package with a recorded backend always is. Git
//!    clones carry no such exemption: removal tears down every recorded
//!    clone, adopted or not.

pub mod manager;
pub mod persistence;
pub mod transaction;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::options::Options;
use crate::core::paths;
use crate::fsops::{FsError, FsOps};
use crate::pkg::BackendError;
use crate::registry::RegistryError;
use crate::requirements::{GitRepoInstallationRecord, PackageInstallationRecord};
use crate::ui::prompts::Prompt;
use crate::vcs::{VcsClient, VcsError};

pub use manager::EquipmentManager;
pub use persistence::PersistenceError;
pub use transaction::{Transaction, TransactionError, TransactionStatus};

/// Status of a module installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    /// Not installed.
    Pristine,
    /// Installed.
    Installed,
    /// Removed.
    Removed,
    /// Broke during installing or removing.
    Broken,
}

/// Errors from equipment operations.
#[derive(Debug, Error)]
pub enum EquipError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Fs(#[from] FsError),

    /// A module command returned non-zero.
    #[error("failed to execute command: {cmdline}: {stderr}")]
    CommandFailed { cmdline: String, stderr: String },

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Everything an equipment operation needs to reach the outside world.
#[derive(Debug, Clone)]
pub struct EquipContext {
    pub fs: FsOps,
    pub vcs: VcsClient,
    /// Root of the dotfiles project; module commit ids are resolved here.
    pub project_root: PathBuf,
    /// Where the journal lives.
    pub persistence_path: PathBuf,
}

impl EquipContext {
    /// Context over the discovered project tree and default journal path.
    pub fn for_project(opts: Options, prompt: Arc<dyn Prompt>) -> Self {
        let fs = FsOps::new(opts, prompt);
        let vcs = VcsClient::new(fs.clone());
        Self {
            fs,
            vcs,
            project_root: paths::project_root(),
            persistence_path: paths::equipment_persistence_file(),
        }
    }

    /// Context with explicit paths, for tests and embedding.
    pub fn with_paths(
        opts: Options,
        prompt: Arc<dyn Prompt>,
        project_root: impl Into<PathBuf>,
        persistence_path: impl Into<PathBuf>,
    ) -> Self {
        let fs = FsOps::new(opts, prompt);
        let vcs = VcsClient::new(fs.clone());
        Self {
            fs,
            vcs,
            project_root: project_root.into(),
            persistence_path: persistence_path.into(),
        }
    }
}

/// Meta information of one module's installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEquipmentMetaInfo {
    pub module_name: String,
    pub package_installations: Vec<PackageInstallationRecord>,
    pub gitrepo_installations: Vec<GitRepoInstallationRecord>,
    pub transactions: Vec<Transaction>,
    pub status: EquipmentStatus,
}

impl ModuleEquipmentMetaInfo {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            package_installations: Vec::new(),
            gitrepo_installations: Vec::new(),
            transactions: Vec::new(),
            status: EquipmentStatus::Pristine,
        }
    }

    pub fn installed(&self) -> bool {
        self.status == EquipmentStatus::Installed
    }

    /// Commit id of the first equip, when any.
    pub fn installed_hashcode(&self) -> Option<&str> {
        self.transactions.first().map(|t| t.commit_id.as_str())
    }

    /// Commit id of the last equip, when any.
    pub fn updated_hashcode(&self) -> Option<&str> {
        self.transactions.last().map(|t| t.commit_id.as_str())
    }

    /// The currently applied commands, across transactions, in execution
    /// order.
    pub fn commands(&self) -> impl Iterator<Item = &crate::undoable::UndoableCommand> {
        self.transactions.iter().flat_map(|t| t.effect_records())
    }

    /// Number of currently applied commands.
    pub fn len_commands(&self) -> usize {
        self.transactions.iter().map(|t| t.effect_len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::transaction::Transaction;

    #[test]
    fn hashcodes_come_from_first_and_last_transactions() {
        let mut meta = ModuleEquipmentMetaInfo::new("zsh");
        assert!(meta.installed_hashcode().is_none());

        meta.transactions.push(Transaction::begin("aaa".into()));
        meta.transactions.push(Transaction::begin("bbb".into()));
        assert_eq!(meta.installed_hashcode(), Some("aaa"));
        assert_eq!(meta.updated_hashcode(), Some("bbb"));
    }

    #[test]
    fn statuses_round_trip() {
        for status in [
            EquipmentStatus::Pristine,
            EquipmentStatus::Installed,
            EquipmentStatus::Removed,
            EquipmentStatus::Broken,
        ] {
            let text = serde_yaml::to_string(&status).unwrap();
            let back: EquipmentStatus = serde_yaml::from_str(&text).unwrap();
            assert_eq!(back, status);
        }
    }
}
