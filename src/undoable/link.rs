//! undoable::link

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{CommandError, SpecTuple};
use crate::fsops::ensure::{ensure_exists, ensure_not_exists};
use crate::fsops::FsOps;

/// Create a hard link `dst` pointing at `src`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub src: PathBuf,
    pub dst: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_dst: Option<PathBuf>,
}

impl Link {
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            real_dst: None,
        }
    }

    pub fn cmdline(&self) -> String {
        format!("ln {} {}", self.src.display(), self.dst.display())
    }

    pub fn spec_tuple(&self) -> SpecTuple {
        SpecTuple::new(
            "link",
            vec![
                self.src.display().to_string(),
                self.dst.display().to_string(),
            ],
        )
    }

    pub(super) fn exec(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        ensure_exists(fs, &self.src, "ln")?;
        ensure_not_exists(fs, &self.dst, "ln")?;
        fs.link(&self.src, &self.dst)?;
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
