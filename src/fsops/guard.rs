//! fsops::guard
//!
//! Guarded temp-file swap for atomic file updates.
//!
//! # Protocol
//!
//! [`file_update_guarder`] allocates a unique temp path next to the target
//! (`<file>.dofu.tmp`, extended with `.tmp` until free) and hands it to the
//! caller's closure. On a clean exit the temp file replaces the target; a
//! crash or error anywhere inside the scope never touches the original.
//! Under dry-run the replacement is logged through the dry-gated move and
//! the temp file is discarded.

use std::path::{Path, PathBuf};

use super::{FsError, FsOps};

/// Run `write` against a guarded temp path that atomically becomes `path`.
///
/// The closure receives the temp path and is expected to write the new
/// content there (a real write, even under dry-run, so the swap itself can
/// be exercised). On `Ok` the target is replaced; on `Err` the temp file is
/// removed and the error re-raised.
pub fn file_update_guarder<T, E, F>(fs: &FsOps, path: &Path, write: F) -> Result<T, E>
where
    E: From<FsError>,
    F: FnOnce(&Path) -> Result<T, E>,
{
    let temp = temp_path_for(path);

    let value = match write(&temp) {
        Ok(value) => value,
        Err(e) => {
            let _ = std::fs::remove_file(&temp);
            return Err(e);
        }
    };

    if path.exists() {
        fs.remove_file(path)?;
    }
    fs.move_path(&temp, path)?;

    if fs.dry_run() {
        // The move above only logged; drop the temp for real.
        let _ = std::fs::remove_file(&temp);
    }

    Ok(value)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut temp = PathBuf::from(format!("{}.dofu.tmp", path.display()));
    while temp.symlink_metadata().is_ok() {
        temp = PathBuf::from(format!("{}.tmp", temp.display()));
    }
    temp
}
