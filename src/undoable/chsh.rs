//! undoable::chsh

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{CommandError, SpecTuple};
use crate::fsops::FsOps;

/// Change the login shell to `shell` (resolved against `$PATH`).
///
/// When `$SHELL` already is the resolved shell nothing happens and no
/// original shell is recorded, so undo keeps its hands off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChSh {
    pub shell: String,

    /// Absolute path the shell name resolved to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_shell: Option<PathBuf>,

    /// The `$SHELL` in effect before the change; `None` when no change was
    /// needed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_shell: Option<String>,
}

impl ChSh {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            real_shell: None,
            origin_shell: None,
        }
    }

    pub fn cmdline(&self) -> String {
        format!("chsh -s {}", self.shell)
    }

    pub fn spec_tuple(&self) -> SpecTuple {
        SpecTuple::new("chsh", vec![self.shell.clone()])
    }

    pub(super) fn exec(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        let resolved = fs.command_path(&self.shell).ok_or_else(|| {
            CommandError::Other(format!("shell {} not found on $PATH", self.shell))
        })?;
        let current = std::env::var("SHELL").ok();

        if current.as_deref().map(std::path::Path::new) == Some(resolved.as_path()) {
            self.origin_shell = None;
        } else {
            fs.check_call(&format!("chsh -s {}", resolved.display()))?;
            self.origin_shell = current;
        }
        self.real_shell = Some(resolved);
        Ok(())
    }

    pub(super) fn undo(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if let Some(origin) = &self.origin_shell {
            fs.check_call(&format!("chsh -s {origin}"))?;
            self.origin_shell = None;
        }
        self.real_shell = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::undoable::test_support::dry_fs;

    #[test]
    fn missing_shell_fails() {
        let err = ChSh::new("no-such-shell-x9z").exec(&dry_fs()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn dry_run_records_the_resolved_shell_without_calling_chsh() {
        let fs = dry_fs();
        let mut cmd = ChSh::new("sh");
        cmd.exec(&fs).unwrap();
        assert!(cmd.real_shell.as_ref().unwrap().is_absolute());
        // dry-run undo no-ops through the gated check_call as well
        cmd.undo(&fs).unwrap();
    }
}
