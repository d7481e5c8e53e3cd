//! fsops
//!
//! Filesystem and shell operations.
//!
//! # Architecture
//!
//! `FsOps` is the **single doorway** for every real side effect dofu performs
//! on the host: file manipulation, directory manipulation and shell
//! invocations all funnel through it. No other module may call `std::fs`
//! mutators or spawn processes directly. This ensures:
//!
//! - Dry-run is enforced exactly once: every mutating operation consults
//!   [`Options::dry_run`] and, when set, logs the intended action, performs
//!   no change and returns a success-shaped result.
//! - Destructive preconditions are resolved uniformly through the Ensure
//!   protocol in [`ensure`].
//! - External command failures surface as one typed error carrying the
//!   command line and captured stderr.
//!
//! Read-only queries (`read_output`, `command_path`, `read_to_string`) run
//! even under dry-run so that plans can still be computed.

pub mod ensure;
pub mod guard;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;

use crate::core::options::{Options, Strategy};
use crate::ui::prompts::Prompt;

/// Errors from filesystem and shell operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// An external command exited non-zero.
    #[error("command failed ({retcode}): {cmdline}: {stderr}")]
    CommandFailed {
        /// The shell command line that was run.
        cmdline: String,
        /// The exit code (or -1 when killed by a signal).
        retcode: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// An I/O operation on `path` failed.
    #[error("{action} {}: {source}", path.display())]
    Io {
        /// What was being attempted, e.g. `mkdir -p`.
        action: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl FsError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        FsError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Captured result of a shell invocation.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    /// Exit status (0 on success, -1 when killed by a signal).
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

/// The filesystem/shell capability.
///
/// Cheap to clone; clones share the prompt handle and the immutable options.
#[derive(Clone)]
pub struct FsOps {
    opts: Options,
    prompt: Arc<dyn Prompt>,
}

impl std::fmt::Debug for FsOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsOps").field("opts", &self.opts).finish()
    }
}

impl FsOps {
    pub fn new(opts: Options, prompt: Arc<dyn Prompt>) -> Self {
        Self { opts, prompt }
    }

    pub fn options(&self) -> Options {
        self.opts
    }

    pub fn dry_run(&self) -> bool {
        self.opts.dry_run
    }

    pub fn strategy(&self) -> Strategy {
        self.opts.strategy
    }

    pub fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }

    // =========================================================================
    // File and directory mutations (dry-run honored)
    // =========================================================================

    /// Copy a file.
    pub fn copy(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
        if self.dry_run() {
            info!("cp {} {}", src.display(), dst.display());
            return Ok(());
        }
        std::fs::copy(src, dst)
            .map(|_| ())
            .map_err(|e| FsError::io("cp", dst, e))
    }

    /// Create a hard link `dst` pointing at `src`.
    pub fn link(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
        if self.dry_run() {
            info!("ln {} {}", src.display(), dst.display());
            return Ok(());
        }
        std::fs::hard_link(src, dst).map_err(|e| FsError::io("ln", dst, e))
    }

    /// Create a symbolic link `dst` pointing at `src`.
    pub fn symlink(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
        if self.dry_run() {
            info!("ln -s {} {}", src.display(), dst.display());
            return Ok(());
        }
        #[cfg(unix)]
        let result = std::os::unix::fs::symlink(src, dst);
        #[cfg(windows)]
        let result = std::os::windows::fs::symlink_file(src, dst);
        result.map_err(|e| FsError::io("ln -s", dst, e))
    }

    /// Remove a file or symlink.
    pub fn unlink(&self, path: &Path) -> Result<(), FsError> {
        if self.dry_run() {
            info!("unlink {}", path.display());
            return Ok(());
        }
        std::fs::remove_file(path).map_err(|e| FsError::io("unlink", path, e))
    }

    /// Remove a file.
    pub fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        if self.dry_run() {
            info!("rm {}", path.display());
            return Ok(());
        }
        std::fs::remove_file(path).map_err(|e| FsError::io("rm", path, e))
    }

    /// Create a directory and all missing ancestors.
    pub fn mkdir_p(&self, path: &Path) -> Result<(), FsError> {
        if self.dry_run() {
            info!("mkdir -p {}", path.display());
            return Ok(());
        }
        std::fs::create_dir_all(path).map_err(|e| FsError::io("mkdir -p", path, e))
    }

    /// Move (rename) a file or directory.
    pub fn move_path(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
        if self.dry_run() {
            info!("mv {} {}", src.display(), dst.display());
            return Ok(());
        }
        std::fs::rename(src, dst).map_err(|e| FsError::io("mv", dst, e))
    }

    /// Remove an empty directory.
    pub fn rmdir(&self, path: &Path) -> Result<(), FsError> {
        if self.dry_run() {
            info!("rmdir {}", path.display());
            return Ok(());
        }
        std::fs::remove_dir(path).map_err(|e| FsError::io("rmdir", path, e))
    }

    /// Remove a directory tree.
    pub fn rmtree(&self, path: &Path) -> Result<(), FsError> {
        if self.dry_run() {
            info!("rm -rf {}", path.display());
            return Ok(());
        }
        std::fs::remove_dir_all(path).map_err(|e| FsError::io("rm -rf", path, e))
    }

    /// Overwrite `path` with `contents`.
    pub fn write_file(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        if self.dry_run() {
            info!("write {} ({} bytes)", path.display(), contents.len());
            return Ok(());
        }
        std::fs::write(path, contents).map_err(|e| FsError::io("write", path, e))
    }

    // =========================================================================
    // Reads and probes (never dry-gated)
    // =========================================================================

    /// Read a file to a string.
    pub fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        std::fs::read_to_string(path).map_err(|e| FsError::io("read", path, e))
    }

    /// Read a file for a rewrite flow.
    ///
    /// Under dry-run a missing file reads as empty, so rewrite commands can
    /// still log the edit they would make.
    pub fn input_file(&self, path: &Path) -> Result<String, FsError> {
        if self.dry_run() && !path.exists() {
            return Ok(String::new());
        }
        self.read_to_string(path)
    }

    /// A free backup location for `path`: `<path><suffix>`, with `.bak`
    /// appended repeatedly until the name is unused.
    pub fn backup_path(&self, path: &Path, suffix: &str) -> PathBuf {
        let mut candidate = PathBuf::from(format!("{}{}", path.display(), suffix));
        while candidate.symlink_metadata().is_ok() {
            candidate = PathBuf::from(format!("{}.bak", candidate.display()));
        }
        candidate
    }

    /// Resolve a command name against `$PATH`.
    pub fn command_path(&self, cmd: &str) -> Option<PathBuf> {
        if cmd.contains(std::path::MAIN_SEPARATOR) {
            let path = PathBuf::from(cmd);
            return is_executable(&path).then_some(path);
        }
        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(cmd))
            .find(|candidate| is_executable(candidate))
    }

    /// Whether every one of `commands` resolves on `$PATH`.
    pub fn do_commands_exist(&self, commands: &[&str]) -> bool {
        commands.iter().all(|cmd| self.command_path(cmd).is_some())
    }

    // =========================================================================
    // Shell invocations
    // =========================================================================

    /// Run a shell command, returning its exit code.
    pub fn call(&self, sh: &str) -> Result<i32, FsError> {
        Ok(self.run(sh)?.status)
    }

    /// Run a shell command, capturing output (dry-run fabricates success).
    pub fn run(&self, sh: &str) -> Result<ShellOutput, FsError> {
        self.run_in(sh, None)
    }

    /// Run a shell command, failing on a non-zero exit.
    pub fn check_call(&self, sh: &str) -> Result<(), FsError> {
        self.check_call_in(sh, None)
    }

    /// Like [`FsOps::check_call`] with a working directory.
    pub fn check_call_in(&self, sh: &str, cwd: Option<&Path>) -> Result<(), FsError> {
        let output = self.run_in(sh, cwd)?;
        if output.status != 0 {
            return Err(FsError::CommandFailed {
                cmdline: sh.to_string(),
                retcode: output.status,
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    /// Run a shell command, failing on a non-zero exit and returning stdout.
    pub fn check_output(&self, sh: &str) -> Result<String, FsError> {
        let output = self.run(sh)?;
        if output.status != 0 {
            return Err(FsError::CommandFailed {
                cmdline: sh.to_string(),
                retcode: output.status,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }

    /// Run a side-effect-free query command, even under dry-run.
    pub fn read_output(&self, sh: &str) -> Result<String, FsError> {
        self.read_output_in(sh, None)
    }

    /// Like [`FsOps::read_output`] with a working directory.
    pub fn read_output_in(&self, sh: &str, cwd: Option<&Path>) -> Result<String, FsError> {
        let output = shell(sh, cwd)?;
        if output.status != 0 {
            return Err(FsError::CommandFailed {
                cmdline: sh.to_string(),
                retcode: output.status,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }

    fn run_in(&self, sh: &str, cwd: Option<&Path>) -> Result<ShellOutput, FsError> {
        if self.dry_run() {
            info!("{sh}");
            return Ok(ShellOutput {
                status: 0,
                stdout: String::new(),
                stderr: String::new(),
            });
        }
        debug!("$ {sh}");
        shell(sh, cwd)
    }
}

fn shell(sh: &str, cwd: Option<&Path>) -> Result<ShellOutput, FsError> {
    let mut command = Command::new("sh");
    command.arg("-c").arg(sh);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    let output = command.output().map_err(|e| FsError::Io {
        action: "spawn",
        path: PathBuf::from(sh),
        source: e,
    })?;
    Ok(ShellOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::prompts::StaticPrompt;
    use tempfile::TempDir;

    fn real_fs() -> FsOps {
        FsOps::new(Options::default(), Arc::new(StaticPrompt::default()))
    }

    fn dry_fs() -> FsOps {
        FsOps::new(
            Options {
                dry_run: true,
                ..Options::default()
            },
            Arc::new(StaticPrompt::default()),
        )
    }

    mod mutations {
        use super::*;

        #[test]
        fn mkdir_p_creates_nested_directories() {
            let tmp = TempDir::new().unwrap();
            let deep = tmp.path().join("a/b/c");
            real_fs().mkdir_p(&deep).unwrap();
            assert!(deep.is_dir());
        }

        #[test]
        fn dry_run_mkdir_p_changes_nothing() {
            let tmp = TempDir::new().unwrap();
            let deep = tmp.path().join("a/b");
            dry_fs().mkdir_p(&deep).unwrap();
            assert!(!deep.exists());
        }

        #[test]
        fn move_path_renames() {
            let tmp = TempDir::new().unwrap();
            let src = tmp.path().join("src");
            let dst = tmp.path().join("dst");
            std::fs::write(&src, "x").unwrap();
            real_fs().move_path(&src, &dst).unwrap();
            assert!(!src.exists());
            assert!(dst.exists());
        }

        #[test]
        fn dry_run_write_leaves_file_absent() {
            let tmp = TempDir::new().unwrap();
            let file = tmp.path().join("f");
            dry_fs().write_file(&file, "content").unwrap();
            assert!(!file.exists());
        }
    }

    mod backup_paths {
        use super::*;

        #[test]
        fn first_backup_uses_suffix() {
            let tmp = TempDir::new().unwrap();
            let path = tmp.path().join("conf");
            let backup = real_fs().backup_path(&path, ".dofu.bak");
            assert_eq!(backup, tmp.path().join("conf.dofu.bak"));
        }

        #[test]
        fn occupied_backup_appends_bak() {
            let tmp = TempDir::new().unwrap();
            let path = tmp.path().join("conf");
            std::fs::write(tmp.path().join("conf.dofu.bak"), "").unwrap();
            let backup = real_fs().backup_path(&path, ".dofu.bak");
            assert_eq!(backup, tmp.path().join("conf.dofu.bak.bak"));
        }
    }

    mod shell_commands {
        use super::*;

        #[test]
        fn check_output_captures_stdout() {
            let out = real_fs().check_output("echo hello").unwrap();
            assert_eq!(out.trim(), "hello");
        }

        #[test]
        fn failure_carries_cmdline_and_stderr() {
            let err = real_fs()
                .check_call("echo oops >&2; exit 3")
                .unwrap_err();
            match err {
                FsError::CommandFailed {
                    cmdline,
                    retcode,
                    stderr,
                } => {
                    assert_eq!(retcode, 3);
                    assert!(cmdline.contains("oops"));
                    assert!(stderr.contains("oops"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn dry_run_check_call_fabricates_success() {
            dry_fs().check_call("exit 1").unwrap();
        }

        #[test]
        fn read_output_runs_even_under_dry_run() {
            let out = dry_fs().read_output("echo queried").unwrap();
            assert_eq!(out.trim(), "queried");
        }
    }

    mod probes {
        use super::*;

        #[test]
        fn sh_exists_on_path() {
            assert!(real_fs().do_commands_exist(&["sh"]));
        }

        #[test]
        fn bogus_command_does_not_exist() {
            assert!(!real_fs().do_commands_exist(&["sh", "definitely-not-a-command-k7q"]));
        }

        #[test]
        fn command_path_resolves_sh() {
            let path = real_fs().command_path("sh").unwrap();
            assert!(path.is_absolute());
        }
    }
}
