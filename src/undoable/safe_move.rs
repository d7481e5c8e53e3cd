//! undoable::safe_move

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{CommandError, SpecTuple};
use crate::core::paths;
use crate::fsops::FsOps;

/// Move `src` to `dst` if `src` exists; a missing `src` is a recorded no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeMove {
    pub src: PathBuf,
    pub dst: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_dst: Option<PathBuf>,

    /// Whether exec actually moved anything.
    #[serde(default)]
    pub moved: bool,
}

impl SafeMove {
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            real_dst: None,
            moved: false,
        }
    }

    /// Move a dotfile out of `$HOME` into `$XDG_CONFIG_HOME`.
    pub fn home_to_xdg_config(src: impl AsRef<std::path::Path>, dst: impl AsRef<std::path::Path>) -> Self {
        Self::new(paths::user_home_path(src), paths::xdg_config_path(dst))
    }

    pub fn cmdline(&self) -> String {
        format!(
            "[ ! -e {} ] || mv {} {}",
            self.src.display(),
            self.src.display(),
            self.dst.display()
        )
    }

    pub fn spec_tuple(&self) -> SpecTuple {
        SpecTuple::new(
            "safe_move",
            vec![
                self.src.display().to_string(),
                self.dst.display().to_string(),
            ],
        )
    }

    pub(super) fn exec(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if self.src.exists() {
            fs.move_path(&self.src, &self.dst)?;
            self.moved = true;
        } else {
            self.moved = false;
        }
        self.real_dst = Some(self.dst.clone());
        Ok(())
    }

    pub(super) fn undo(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if self.moved {
            if let Some(real_dst) = &self.real_dst {
                fs.move_path(real_dst, &self.src)?;
            }
            self.moved = false;
        }
        self.real_dst = None;
        Ok(())
    }
}
