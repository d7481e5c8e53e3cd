//! undoable::symlink

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{CommandError, SpecTuple};
use crate::fsops::ensure::{ensure_exists, ensure_not_exists};
use crate::fsops::FsOps;

/// Create a symbolic link `dst` pointing at `src`.
///
/// Idempotent: if `dst` is already a symlink to `src`, exec records nothing
/// to undo and succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symlink {
    pub src: PathBuf,
    pub dst: PathBuf,

    /// The link actually created; `None` when the link pre-existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_dst: Option<PathBuf>,
}

impl Symlink {
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            real_dst: None,
        }
    }

    pub fn cmdline(&self) -> String {
        format!("ln -s {} {}", self.src.display(), self.dst.display())
    }

    pub fn spec_tuple(&self) -> SpecTuple {
        SpecTuple::new(
            "symlink",
            vec![
                self.src.display().to_string(),
                self.dst.display().to_string(),
            ],
        )
    }

    pub(super) fn exec(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if points_at(&self.dst, &self.src) {
            self.real_dst = None;
            return Ok(());
        }
        ensure_exists(fs, &self.src, "ln -s")?;
        ensure_not_exists(fs, &self.dst, "ln -s")?;
        fs.symlink(&self.src, &self.dst)?;
        self.real_dst = Some(self.dst.clone());
        Ok(())
    }

    pub(super) fn undo(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if let Some(real_dst) = &self.real_dst {
            fs.unlink(real_dst)?;
            self.real_dst = None;
        }
        Ok(())
    }
}

fn points_at(dst: &Path, src: &Path) -> bool {
    std::fs::read_link(dst).map(|target| target == src).unwrap_or(false)
}
