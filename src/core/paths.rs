//! core::paths
//!
//! Centralized path routing for user, XDG and project locations.
//!
//! # Architecture
//!
//! Every storage location dofu reads or writes is computed here, so that the
//! rest of the crate never concatenates `$HOME`-relative paths by hand:
//!
//! - `<home>/...` - dotfiles in the user's home directory
//! - `<xdg_config>/...` - `$XDG_CONFIG_HOME` (default `<home>/.config`)
//! - `<project>/xdg-config/...` - configuration shipped inside the dotfiles
//!   project itself
//! - `<project>/.cache/.persistence/equipment.yaml` - the equipment journal
//!
//! The project root is discovered by walking up from the running executable
//! to the nearest directory containing a `Cargo.toml` marker; when no marker
//! exists (an installed binary outside a checkout) the current directory is
//! used.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// The user's home directory.
pub fn user_home() -> PathBuf {
    dirs::home_dir()
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// `$XDG_CONFIG_HOME`, defaulting to `<home>/.config`.
pub fn xdg_config_home() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .unwrap_or_else(|| user_home().join(".config"))
}

/// A path under the user's home directory.
pub fn user_home_path(nested: impl AsRef<Path>) -> PathBuf {
    user_home().join(nested)
}

/// A path under `$XDG_CONFIG_HOME`.
pub fn xdg_config_path(nested: impl AsRef<Path>) -> PathBuf {
    xdg_config_home().join(nested)
}

/// A path under the project's own `xdg-config` tree.
pub fn dot_config_path(nested: impl AsRef<Path>) -> PathBuf {
    project_root().join("xdg-config").join(nested)
}

/// A path under the project root.
pub fn project_path(nested: impl AsRef<Path>) -> PathBuf {
    project_root().join(nested)
}

/// Like [`xdg_config_path`] but rewritten to start with the literal `$HOME`,
/// for embedding in shell rc files.
pub fn xdg_config_path_relhome(nested: impl AsRef<Path>) -> String {
    relhome(&xdg_config_path(nested))
}

/// Like [`dot_config_path`] but rewritten to start with the literal `$HOME`.
pub fn dot_config_path_relhome(nested: impl AsRef<Path>) -> String {
    relhome(&dot_config_path(nested))
}

/// Like [`project_path`] but rewritten to start with the literal `$HOME`.
pub fn project_path_relhome(nested: impl AsRef<Path>) -> String {
    relhome(&project_path(nested))
}

fn relhome(path: &Path) -> String {
    match path.strip_prefix(user_home()) {
        Ok(rel) => format!("$HOME/{}", rel.display()),
        Err(_) => path.display().to_string(),
    }
}

/// The root of the dotfiles project, discovered once per process.
pub fn project_root() -> PathBuf {
    static ROOT: OnceLock<PathBuf> = OnceLock::new();
    ROOT.get_or_init(discover_project_root).clone()
}

fn discover_project_root() -> PathBuf {
    let start = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    if let Some(start) = start {
        let mut dir = start.as_path();
        loop {
            if dir.join("Cargo.toml").is_file() {
                return dir.to_path_buf();
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// The cache directory under the project root.
pub fn cache_root() -> PathBuf {
    project_root().join(".cache")
}

/// The persistence directory under the cache root.
pub fn persistence_root() -> PathBuf {
    cache_root().join(".persistence")
}

/// The equipment journal file.
pub fn equipment_persistence_file() -> PathBuf {
    persistence_root().join("equipment.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_paths_nest() {
        assert_eq!(user_home_path(".zshrc"), user_home().join(".zshrc"));
        assert!(xdg_config_path("tmux/tmux.conf").ends_with("tmux/tmux.conf"));
    }

    #[test]
    fn relhome_rewrites_under_home() {
        let rewritten = relhome(&user_home().join(".config/fzf/fzf.zsh"));
        assert_eq!(rewritten, "$HOME/.config/fzf/fzf.zsh");
    }

    #[test]
    fn relhome_leaves_foreign_paths_alone() {
        assert_eq!(relhome(Path::new("/opt/thing")), "/opt/thing");
    }

    #[test]
    fn persistence_file_lives_under_cache() {
        let file = equipment_persistence_file();
        assert!(file.starts_with(cache_root()));
        assert!(file.ends_with(".persistence/equipment.yaml"));
    }
}
