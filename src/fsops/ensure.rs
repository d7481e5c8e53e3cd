//! fsops::ensure
//!
//! The Ensure protocol: destructive filesystem preconditions resolved
//! through the active [`Strategy`].
//!
//! # Protocol
//!
//! A condition (`PathExists`, `PathNotExists`) is checked; if it holds the
//! operation proceeds. Otherwise the strategy decides:
//!
//! - `QUIT` fails with `failed to <action>: <reason>`.
//! - `FORCE` takes the overwriting remedy: delete the conflicting path, or
//!   create the missing file.
//! - `AUTO` takes the non-intrusive remedy: move the conflicting path aside
//!   to a free backup location, or create the missing file.
//! - `ASK` prompts for `TRY-AGAIN` or one of the decidable strategies and
//!   dispatches.
//!
//! Under dry-run Ensure succeeds without performing any remedy; the wrapped
//! operation no-ops as well, so no state changes.

use std::path::Path;

use log::info;
use thiserror::Error;

use super::{FsError, FsOps};
use crate::core::options::Strategy;

/// Suffix for backups taken by the AUTO remedy.
pub const BACKUP_SUFFIX: &str = ".dofu.bak";

const TRY_AGAIN: &str = "TRY-AGAIN";

/// Errors from the Ensure protocol.
#[derive(Debug, Error)]
pub enum EnsureError {
    /// The condition could not be satisfied under the active strategy.
    #[error("failed to {action}: {reason}")]
    Unsatisfied { action: String, reason: String },

    /// A remedy itself failed.
    #[error(transparent)]
    Fs(#[from] FsError),
}

/// Require that `path` exists before performing `action`.
///
/// Remedy for a missing path (both FORCE and AUTO): create it as an empty
/// file, together with any missing parent directories.
pub fn ensure_exists(fs: &FsOps, path: &Path, action: &str) -> Result<(), EnsureError> {
    if fs.dry_run() {
        if !path.exists() {
            info!("would require {} to exist for `{action}`", path.display());
        }
        return Ok(());
    }

    let mut strategy = fs.strategy();
    loop {
        if path.exists() {
            return Ok(());
        }
        match strategy {
            Strategy::Quit => {
                return Err(EnsureError::Unsatisfied {
                    action: action.to_string(),
                    reason: format!("{} does not exist", path.display()),
                })
            }
            Strategy::Force | Strategy::Auto => {
                if let Some(parent) = path.parent() {
                    fs.mkdir_p(parent)?;
                }
                fs.write_file(path, "")?;
            }
            Strategy::Ask => match ask(fs, action, &format!("{} does not exist", path.display()))? {
                None => {} // try again
                Some(chosen) => strategy = chosen,
            },
        }
    }
}

/// Require that `path` does not exist before performing `action`.
///
/// FORCE deletes the conflicting path; AUTO moves it aside to a free
/// `.dofu.bak` location.
pub fn ensure_not_exists(fs: &FsOps, path: &Path, action: &str) -> Result<(), EnsureError> {
    if fs.dry_run() {
        if exists_at(path) {
            info!("would require {} to be absent for `{action}`", path.display());
        }
        return Ok(());
    }

    let mut strategy = fs.strategy();
    loop {
        if !exists_at(path) {
            return Ok(());
        }
        match strategy {
            Strategy::Quit => {
                return Err(EnsureError::Unsatisfied {
                    action: action.to_string(),
                    reason: format!("{} already exists", path.display()),
                })
            }
            Strategy::Force => {
                if path.is_dir() && !path.is_symlink() {
                    fs.rmtree(path)?;
                } else {
                    fs.unlink(path)?;
                }
            }
            Strategy::Auto => {
                let backup = fs.backup_path(path, BACKUP_SUFFIX);
                fs.move_path(path, &backup)?;
            }
            Strategy::Ask => match ask(fs, action, &format!("{} already exists", path.display()))? {
                None => {}
                Some(chosen) => strategy = chosen,
            },
        }
    }
}

/// Whether anything (including a dangling symlink) occupies `path`.
fn exists_at(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Ask the user how to resolve a violated precondition.
///
/// Returns `None` for `TRY-AGAIN`, or the decidable strategy to dispatch.
fn ask(fs: &FsOps, action: &str, reason: &str) -> Result<Option<Strategy>, EnsureError> {
    let mut items = vec![TRY_AGAIN.to_string()];
    items.extend(Strategy::decidable().iter().map(|s| s.name().to_string()));

    let header = format!("cannot {action}: {reason}; how to proceed?");
    let chosen = fs
        .prompt()
        .choose(&items, &header, &[])
        .map_err(|e| EnsureError::Unsatisfied {
            action: action.to_string(),
            reason: format!("{reason} (prompt failed: {e})"),
        })?;

    match chosen.first().map(String::as_str) {
        Some(TRY_AGAIN) | None => Ok(None),
        Some("FORCE") => Ok(Some(Strategy::Force)),
        Some("AUTO") => Ok(Some(Strategy::Auto)),
        _ => Ok(Some(Strategy::Quit)),
    }
}
