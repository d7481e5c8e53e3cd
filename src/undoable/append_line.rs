//! undoable::append_line

use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{CommandError, SpecTuple};
use crate::fsops::ensure::ensure_exists;
use crate::fsops::FsOps;

/// Replace the first line matching `pattern` with `repl`, or append `repl`
/// as a new line when nothing matches.
///
/// The replaced line is stored verbatim (including its line ending) so undo
/// restores byte-exact content; an appended line is recorded as an empty
/// `replaced_line`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendLine {
    pub path: PathBuf,
    pub pattern: String,
    pub repl: String,

    /// The line that was replaced; `""` when `repl` was appended instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_line: Option<String>,

    /// Whether the append had to newline-terminate the previous last line.
    #[serde(default)]
    pub terminated: bool,
}

impl AppendLine {
    pub fn new(
        path: impl Into<PathBuf>,
        pattern: impl Into<String>,
        repl: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            pattern: pattern.into(),
            repl: repl.into(),
            replaced_line: None,
            terminated: false,
        }
    }

    /// A `source <file>` line guarded by `pattern`.
    pub fn source_line(
        path: impl Into<PathBuf>,
        pattern: impl Into<String>,
        file_to_source: impl AsRef<str>,
    ) -> Self {
        Self::new(
            path,
            pattern,
            format!("source {}", file_to_source.as_ref()),
        )
    }

    pub fn cmdline(&self) -> String {
        format!(
            "sed -i.dofu.bak 's/{}/{}/g' {}",
            self.pattern,
            self.repl,
            self.path.display()
        )
    }

    pub fn spec_tuple(&self) -> SpecTuple {
        SpecTuple::new(
            "append_line",
            vec![
                self.path.display().to_string(),
                self.pattern.clone(),
                self.repl.clone(),
            ],
        )
    }

    pub(super) fn exec(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        ensure_exists(fs, &self.path, "append line")?;
        let pattern = Regex::new(&self.pattern)?;
        let content = fs.input_file(&self.path)?;

        let mut replaced = None;
        let mut out = String::with_capacity(content.len());
        for line in content.split_inclusive('\n') {
            if replaced.is_none() && pattern.is_match(line) {
                replaced = Some(line.to_string());
                out.push_str(self.repl.trim_end_matches('\n'));
                if line.ends_with('\n') {
                    out.push('\n');
                }
            } else {
                out.push_str(line);
            }
        }

        match replaced {
            Some(line) => {
                self.replaced_line = Some(line);
                self.terminated = false;
            }
            None => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                    self.terminated = true;
                } else {
                    self.terminated = false;
                }
                out.push_str(self.repl.trim_end_matches('\n'));
                out.push('\n');
                self.replaced_line = Some(String::new());
            }
        }

        fs.write_file(&self.path, &out)?;
        Ok(())
    }

    pub(super) fn undo(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        let Some(replaced_line) = self.replaced_line.clone() else {
            return Ok(());
        };
        ensure_exists(fs, &self.path, "restore line")?;
        let content = fs.input_file(&self.path)?;

        let out = if replaced_line.is_empty() {
            // Drop the appended line (and the newline terminator the append
            // introduced, if any).
            let appended = format!("{}\n", self.repl.trim_end_matches('\n'));
            match content.strip_suffix(&appended) {
                Some(rest) if self.terminated => {
                    rest.strip_suffix('\n').unwrap_or(rest).to_string()
                }
                Some(rest) => rest.to_string(),
                None => remove_first_line_starting_with(&content, &self.repl),
            }
        } else {
            let mut out = String::with_capacity(content.len());
            let mut restored = false;
            for line in content.split_inclusive('\n') {
                if !restored && line.trim_end_matches('\n').starts_with(&self.repl) {
                    out.push_str(&replaced_line);
                    restored = true;
                } else {
                    out.push_str(line);
                }
            }
            out
        };

        fs.write_file(&self.path, &out)?;
        self.replaced_line = None;
        self.terminated = false;
        Ok(())
    }
}

fn remove_first_line_starting_with(content: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut removed = false;
    for line in content.split_inclusive('\n') {
        if !removed && line.trim_end_matches('\n').starts_with(prefix) {
            removed = true;
        } else {
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::undoable::test_support::real_fs;
    use tempfile::TempDir;

    fn rc(tmp: &TempDir, content: &str) -> PathBuf {
        let path = tmp.path().join("rc");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn replaces_first_match_and_undo_is_byte_exact() {
        let tmp = TempDir::new().unwrap();
        let original = "alpha\nsource old-shrc\ngamma\nsource old-shrc\n";
        let path = rc(&tmp, original);

        let fs = real_fs();
        let mut cmd = AppendLine::new(&path, ".*old-shrc", "source new-shrc");
        cmd.exec(&fs).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "alpha\nsource new-shrc\ngamma\nsource old-shrc\n"
        );
        assert_eq!(cmd.replaced_line.as_deref(), Some("source old-shrc\n"));

        cmd.undo(&fs).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn appends_when_nothing_matches_and_undo_is_byte_exact() {
        let tmp = TempDir::new().unwrap();
        let original = "alpha\nbeta\n";
        let path = rc(&tmp, original);

        let fs = real_fs();
        let mut cmd = AppendLine::new(&path, ".*fzf\\.zsh", "source fzf.zsh");
        cmd.exec(&fs).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "alpha\nbeta\nsource fzf.zsh\n"
        );
        assert_eq!(cmd.replaced_line.as_deref(), Some(""));

        cmd.undo(&fs).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn append_terminates_unterminated_file_and_undo_restores_it() {
        let tmp = TempDir::new().unwrap();
        let original = "alpha";
        let path = rc(&tmp, original);

        let fs = real_fs();
        let mut cmd = AppendLine::new(&path, "never-matches-q", "appended");
        cmd.exec(&fs).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "alpha\nappended\n"
        );
        assert!(cmd.terminated);

        cmd.undo(&fs).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn preserves_missing_trailing_newline_on_replace() {
        let tmp = TempDir::new().unwrap();
        let path = rc(&tmp, "keep\nreplace-me");

        let fs = real_fs();
        let mut cmd = AppendLine::new(&path, "replace-me", "replaced");
        cmd.exec(&fs).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep\nreplaced");

        cmd.undo(&fs).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep\nreplace-me");
    }
}
