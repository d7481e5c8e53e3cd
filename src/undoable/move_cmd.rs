//! undoable::move_cmd

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{CommandError, SpecTuple};
use crate::fsops::ensure::{ensure_exists, ensure_not_exists};
use crate::fsops::FsOps;

/// Move `src` to `dst`; `src` must exist and `dst` must not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub src: PathBuf,
    pub dst: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_dst: Option<PathBuf>,
}

impl Move {
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            real_dst: None,
        }
    }

    pub fn cmdline(&self) -> String {
        format!("mv {} {}", self.src.display(), self.dst.display())
    }

    pub fn spec_tuple(&self) -> SpecTuple {
        SpecTuple::new(
            "move",
            vec![
                self.src.display().to_string(),
                self.dst.display().to_string(),
            ],
        )
    }

    pub(super) fn exec(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        ensure_exists(fs, &self.src, "mv")?;
        ensure_not_exists(fs, &self.dst, "mv")?;
        fs.move_path(&self.src, &self.dst)?;
        self.real_dst = Some(self.dst.clone());
        Ok(())
    }

    pub(super) fn undo(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if let Some(real_dst) = &self.real_dst {
            fs.move_path(real_dst, &self.src)?;
            self.real_dst = None;
        }
        Ok(())
    }
}
