//! undoable
//!
//! Undoable commands: single steps with a forward and a reverse side effect.
//!
//! # Architecture
//!
//! `UndoableCommand` is a tagged union with one variant per concrete step.
//! Each variant carries its declared parameters plus bookkeeping filled in
//! at exec time (what actually happened, so undo can reverse exactly that).
//! The whole union serializes with a `kind` discriminator so journaled
//! commands can be undone by a later process.
//!
//! # Invariants
//!
//! - `exec` and `undo` never raise: any failure is captured as an
//!   [`ExecutionResult`] with `retcode = 1` and the reason in `stderr`.
//! - `spec_tuple` identifies the *declared intent only* - never bookkeeping -
//!   so two instances built from the same static module description compare
//!   equal across runs. Step matching during sync relies on this.

pub mod append_env_var;
pub mod append_env_var_path;
pub mod append_line;
pub mod backup_mv;
pub mod chsh;
pub mod link;
pub mod mkdir;
pub mod move_cmd;
pub mod safe_move;
pub mod symlink;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fsops::ensure::EnsureError;
use crate::fsops::{FsError, FsOps};

pub use append_env_var::AppendEnvVar;
pub use append_env_var_path::AppendEnvVarPath;
pub use append_line::AppendLine;
pub use backup_mv::BackupMv;
pub use chsh::ChSh;
pub use link::Link;
pub use mkdir::Mkdir;
pub use move_cmd::Move;
pub use safe_move::SafeMove;
pub use symlink::Symlink;

/// Internal error of a command's forward or reverse step.
///
/// Never escapes [`UndoableCommand::exec`]/[`UndoableCommand::undo`]; it is
/// flattened into a failed [`ExecutionResult`].
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Precondition(#[from] EnsureError),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{0}")]
    Other(String),
}

/// Captured outcome of one exec or undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Display command line of the step.
    pub cmdline: String,
    /// 0 iff the step succeeded.
    pub retcode: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl ExecutionResult {
    pub fn success(cmdline: String) -> Self {
        Self {
            cmdline,
            retcode: 0,
            stdout: None,
            stderr: None,
        }
    }

    pub fn failure(cmdline: String, reason: &str) -> Self {
        Self {
            cmdline,
            retcode: 1,
            stdout: None,
            stderr: Some(reason.to_string()),
        }
    }

    /// Whether the step succeeded.
    pub fn ok(&self) -> bool {
        self.retcode == 0
    }
}

/// Value identity of a command's declared intent.
///
/// Includes the variant discriminator, so equal parameter lists of different
/// variants never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTuple {
    kind: &'static str,
    fields: Vec<String>,
}

impl SpecTuple {
    pub fn new(kind: &'static str, fields: Vec<String>) -> Self {
        Self { kind, fields }
    }
}

/// A single undoable step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UndoableCommand {
    Symlink(Symlink),
    Link(Link),
    Mkdir(Mkdir),
    Move(Move),
    SafeMove(SafeMove),
    BackupMv(BackupMv),
    AppendLine(AppendLine),
    AppendEnvVar(AppendEnvVar),
    AppendEnvVarPath(AppendEnvVarPath),
    ChSh(ChSh),
}

impl UndoableCommand {
    /// Perform the forward side effect.
    pub fn exec(&mut self, fs: &FsOps) -> ExecutionResult {
        let cmdline = self.cmdline();
        match self.exec_inner(fs) {
            Ok(()) => ExecutionResult::success(cmdline),
            Err(e) => ExecutionResult::failure(cmdline, &e.to_string()),
        }
    }

    /// Reverse the forward side effect recorded by the last `exec`.
    pub fn undo(&mut self, fs: &FsOps) -> ExecutionResult {
        let cmdline = self.cmdline();
        match self.undo_inner(fs) {
            Ok(()) => ExecutionResult::success(cmdline),
            Err(e) => ExecutionResult::failure(cmdline, &e.to_string()),
        }
    }

    /// Human-readable command line, for display only.
    pub fn cmdline(&self) -> String {
        match self {
            UndoableCommand::Symlink(c) => c.cmdline(),
            UndoableCommand::Link(c) => c.cmdline(),
            UndoableCommand::Mkdir(c) => c.cmdline(),
            UndoableCommand::Move(c) => c.cmdline(),
            UndoableCommand::SafeMove(c) => c.cmdline(),
            UndoableCommand::BackupMv(c) => c.cmdline(),
            UndoableCommand::AppendLine(c) => c.cmdline(),
            UndoableCommand::AppendEnvVar(c) => c.cmdline(),
            UndoableCommand::AppendEnvVarPath(c) => c.cmdline(),
            UndoableCommand::ChSh(c) => c.cmdline(),
        }
    }

    /// Value identity used for step matching across runs.
    pub fn spec_tuple(&self) -> SpecTuple {
        match self {
            UndoableCommand::Symlink(c) => c.spec_tuple(),
            UndoableCommand::Link(c) => c.spec_tuple(),
            UndoableCommand::Mkdir(c) => c.spec_tuple(),
            UndoableCommand::Move(c) => c.spec_tuple(),
            UndoableCommand::SafeMove(c) => c.spec_tuple(),
            UndoableCommand::BackupMv(c) => c.spec_tuple(),
            UndoableCommand::AppendLine(c) => c.spec_tuple(),
            UndoableCommand::AppendEnvVar(c) => c.spec_tuple(),
            UndoableCommand::AppendEnvVarPath(c) => c.spec_tuple(),
            UndoableCommand::ChSh(c) => c.spec_tuple(),
        }
    }

    fn exec_inner(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        match self {
            UndoableCommand::Symlink(c) => c.exec(fs),
            UndoableCommand::Link(c) => c.exec(fs),
            UndoableCommand::Mkdir(c) => c.exec(fs),
            UndoableCommand::Move(c) => c.exec(fs),
            UndoableCommand::SafeMove(c) => c.exec(fs),
            UndoableCommand::BackupMv(c) => c.exec(fs),
            UndoableCommand::AppendLine(c) => c.exec(fs),
            UndoableCommand::AppendEnvVar(c) => c.exec(fs),
            UndoableCommand::AppendEnvVarPath(c) => c.exec(fs),
            UndoableCommand::ChSh(c) => c.exec(fs),
        }
    }

    fn undo_inner(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        match self {
            UndoableCommand::Symlink(c) => c.undo(fs),
            UndoableCommand::Link(c) => c.undo(fs),
            UndoableCommand::Mkdir(c) => c.undo(fs),
            UndoableCommand::Move(c) => c.undo(fs),
            UndoableCommand::SafeMove(c) => c.undo(fs),
            UndoableCommand::BackupMv(c) => c.undo(fs),
            UndoableCommand::AppendLine(c) => c.undo(fs),
            UndoableCommand::AppendEnvVar(c) => c.undo(fs),
            UndoableCommand::AppendEnvVarPath(c) => c.undo(fs),
            UndoableCommand::ChSh(c) => c.undo(fs),
        }
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(impl From<$ty> for UndoableCommand {
            fn from(command: $ty) -> Self {
                UndoableCommand::$variant(command)
            }
        })*
    };
}

impl_from_variant! {
    Symlink => Symlink,
    Link => Link,
    Mkdir => Mkdir,
    Move => Move,
    SafeMove => SafeMove,
    BackupMv => BackupMv,
    AppendLine => AppendLine,
    AppendEnvVar => AppendEnvVar,
    AppendEnvVarPath => AppendEnvVarPath,
    ChSh => ChSh,
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn spec_tuple_distinguishes_variants_with_equal_fields() {
        let mv = UndoableCommand::Move(Move::new("/a", "/b"));
        let safe = UndoableCommand::SafeMove(SafeMove::new("/a", "/b"));
        assert_ne!(mv.spec_tuple(), safe.spec_tuple());
    }

    #[test]
    fn spec_tuple_ignores_bookkeeping() {
        let mut symlink = Symlink::new("/src", "/dst");
        let pristine = UndoableCommand::Symlink(symlink.clone()).spec_tuple();
        symlink.real_dst = Some(PathBuf::from("/dst"));
        assert_eq!(UndoableCommand::Symlink(symlink).spec_tuple(), pristine);
    }

    #[test]
    fn commands_round_trip_with_kind_tag() {
        let cmd = UndoableCommand::Mkdir(Mkdir::new("/tmp/x"));
        let text = serde_yaml::to_string(&cmd).unwrap();
        assert!(text.contains("kind: mkdir"));
        let back: UndoableCommand = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn failure_result_carries_reason_in_stderr() {
        let result = ExecutionResult::failure("mv a b".to_string(), "a does not exist");
        assert!(!result.ok());
        assert_eq!(result.stderr.as_deref(), Some("a does not exist"));
    }
}
