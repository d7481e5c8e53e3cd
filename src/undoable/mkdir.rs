//! undoable::mkdir

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{CommandError, SpecTuple};
use crate::fsops::FsOps;

/// Create a directory and all missing ancestors.
///
/// Exec records the nearest pre-existing ancestor so undo can remove exactly
/// the directories that were created, walking back up until it reaches that
/// ancestor. A non-empty intermediate directory makes the undo fail rather
/// than delete foreign content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mkdir {
    pub path: PathBuf,

    /// Nearest ancestor that already existed; `None` when `path` itself did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exist_path: Option<PathBuf>,
}

impl Mkdir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_exist_path: None,
        }
    }

    pub fn cmdline(&self) -> String {
        format!("mkdir -p {}", self.path.display())
    }

    pub fn spec_tuple(&self) -> SpecTuple {
        SpecTuple::new("mkdir", vec![self.path.display().to_string()])
    }

    pub(super) fn exec(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if self.path.exists() {
            self.last_exist_path = None;
            return Ok(());
        }

        let mut ancestor: &Path = &self.path;
        while !ancestor.exists() {
            match ancestor.parent() {
                Some(parent) => ancestor = parent,
                None => break,
            }
        }
        let ancestor = ancestor.to_path_buf();

        fs.mkdir_p(&self.path)?;
        self.last_exist_path = Some(ancestor);
        Ok(())
    }

    pub(super) fn undo(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if let Some(stop) = &self.last_exist_path {
            if stop.exists() {
                let mut current = self.path.clone();
                while current != *stop {
                    if current.exists() {
                        fs.rmdir(&current)?;
                    }
                    match current.parent() {
                        Some(parent) => current = parent.to_path_buf(),
                        None => break,
                    }
                }
            }
        }
        self.last_exist_path = None;
        Ok(())
    }
}
