//! equipment::persistence
//!
//! Atomic load/save of the equipment journal.
//!
//! # Layout
//!
//! One YAML document at `<cache_root>/.persistence/equipment.yaml`: the
//! manager's `meta` mapping, with every enum, tagged command and requirement
//! round-tripping through serde. Writes go through the guarded temp-file
//! swap, so a crash mid-write can never corrupt the journal.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::manager::EquipmentManager;
use super::EquipContext;
use crate::fsops::guard::file_update_guarder;
use crate::fsops::FsError;

/// Errors from journal persistence.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The journal exists but cannot be deserialized.
    #[error("journal corrupt at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// The manager state cannot be serialized.
    #[error("failed to serialize journal: {0}")]
    Serialize(serde_yaml::Error),

    /// Reading or writing the journal file failed.
    #[error("journal i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Fs(#[from] FsError),
}

/// Load the journal at `path`; a missing file is an empty manager.
pub fn load(path: &Path) -> Result<EquipmentManager, PersistenceError> {
    if !path.is_file() {
        return Ok(EquipmentManager::new());
    }
    let text = std::fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `manager` and atomically swap it over the journal file.
///
/// The temp file is written for real even under dry-run (the guard then
/// logs the rename and discards it), so operators see the full plan.
pub fn save(manager: &EquipmentManager, ctx: &EquipContext) -> Result<(), PersistenceError> {
    let path = &ctx.persistence_path;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    file_update_guarder(&ctx.fs, path, |temp| {
        let text = serde_yaml::to_string(manager).map_err(PersistenceError::Serialize)?;
        std::fs::write(temp, text).map_err(|source| PersistenceError::Io {
            path: temp.to_path_buf(),
            source,
        })
    })
}
