//! undoable::backup_mv

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{CommandError, SpecTuple};
use crate::fsops::ensure::BACKUP_SUFFIX;
use crate::fsops::FsOps;

/// Move `path` aside to a free `.dofu.bak` location; a missing `path` is a
/// recorded no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMv {
    pub path: PathBuf,

    /// Where the original went; `None` when there was nothing to back up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
}

impl BackupMv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_path: None,
        }
    }

    pub fn cmdline(&self) -> String {
        format!(
            "mv {} {}{}",
            self.path.display(),
            self.path.display(),
            BACKUP_SUFFIX
        )
    }

    pub fn spec_tuple(&self) -> SpecTuple {
        SpecTuple::new("backup_mv", vec![self.path.display().to_string()])
    }

    pub(super) fn exec(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if self.path.symlink_metadata().is_ok() {
            let backup = fs.backup_path(&self.path, BACKUP_SUFFIX);
            fs.move_path(&self.path, &backup)?;
            self.backup_path = Some(backup);
        } else {
            self.backup_path = None;
        }
        Ok(())
    }

    pub(super) fn undo(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if let Some(backup) = &self.backup_path {
            fs.move_path(backup, &self.path)?;
            self.backup_path = None;
        }
        Ok(())
    }
}
