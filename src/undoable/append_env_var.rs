//! undoable::append_env_var

use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{CommandError, SpecTuple};
use crate::fsops::ensure::ensure_exists;
use crate::fsops::FsOps;

fn export_pattern() -> Regex {
    Regex::new(r"^export\s+([a-zA-Z_][a-zA-Z0-9_]*)=(.*)$").unwrap()
}

/// Ensure the rc file exports `varname=value`.
///
/// If the last export line already sets `varname` to `value` this is a
/// recorded no-op. Otherwise the last export of `varname` is rewritten in
/// place, or a fresh export line is inserted after the last existing export
/// (at the top when the file has none). Undo restores the previous value or
/// deletes the inserted line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendEnvVar {
    pub varname: String,
    pub value: String,
    pub rc: PathBuf,

    /// The previous value of `varname`, when a line was rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_value: Option<String>,

    /// Whether exec inserted a brand-new export line.
    #[serde(default)]
    pub inserted: bool,
}

impl AppendEnvVar {
    pub fn new(
        varname: impl Into<String>,
        value: impl Into<String>,
        rc: impl Into<PathBuf>,
    ) -> Self {
        Self {
            varname: varname.into(),
            value: value.into(),
            rc: rc.into(),
            origin_value: None,
            inserted: false,
        }
    }

    pub fn cmdline(&self) -> String {
        format!(
            "echo 'export {}={}' >> {}",
            self.varname,
            self.value,
            self.rc.display()
        )
    }

    pub fn spec_tuple(&self) -> SpecTuple {
        SpecTuple::new(
            "append_env_var",
            vec![
                self.varname.clone(),
                self.value.clone(),
                self.rc.display().to_string(),
            ],
        )
    }

    fn export_line(&self) -> String {
        format!("export {}={}", self.varname, self.value)
    }

    pub(super) fn exec(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        ensure_exists(fs, &self.rc, "append env var")?;
        let pattern = export_pattern();
        let content = fs.input_file(&self.rc)?;
        let mut lines: Vec<String> = content.split_inclusive('\n').map(String::from).collect();

        let mut last_export = None; // (index, var, value)
        let mut last_of_var = None; // (index, value)
        for (i, line) in lines.iter().enumerate() {
            if let Some(captures) = pattern.captures(line.trim_end_matches('\n')) {
                let var = captures.get(1).unwrap().as_str().to_string();
                let value = captures.get(2).unwrap().as_str().to_string();
                if var == self.varname {
                    last_of_var = Some((i, value.clone()));
                }
                last_export = Some((i, var, value));
            }
        }

        // Already exported with the wanted value by the last export line.
        if let Some((_, var, value)) = &last_export {
            if *var == self.varname && *value == self.value {
                self.origin_value = None;
                self.inserted = false;
                return Ok(());
            }
        }

        match last_of_var {
            Some((i, origin)) => {
                let ending = if lines[i].ends_with('\n') { "\n" } else { "" };
                lines[i] = format!("{}{ending}", self.export_line());
                self.origin_value = Some(origin);
                self.inserted = false;
            }
            None => {
                match last_export {
                    Some((i, _, _)) => {
                        if !lines[i].ends_with('\n') {
                            lines[i].push('\n');
                        }
                        lines.insert(i + 1, format!("{}\n", self.export_line()));
                    }
                    None => lines.insert(0, format!("{}\n", self.export_line())),
                }
                self.origin_value = None;
                self.inserted = true;
            }
        }

        fs.write_file(&self.rc, &lines.concat())?;
        Ok(())
    }

    pub(super) fn undo(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        if self.origin_value.is_none() && !self.inserted {
            return Ok(());
        }
        ensure_exists(fs, &self.rc, "restore env var")?;
        let pattern = export_pattern();
        let content = fs.input_file(&self.rc)?;
        let mut lines: Vec<String> = content.split_inclusive('\n').map(String::from).collect();

        let var_line = lines.iter().rposition(|line| {
            pattern
                .captures(line.trim_end_matches('\n'))
                .map(|c| c.get(1).unwrap().as_str() == self.varname)
                .unwrap_or(false)
        });

        if let Some(i) = var_line {
            match &self.origin_value {
                Some(origin) => {
                    let ending = if lines[i].ends_with('\n') { "\n" } else { "" };
                    lines[i] = format!("export {}={origin}{ending}", self.varname);
                }
                None => {
                    lines.remove(i);
                }
            }
        }

        fs.write_file(&self.rc, &lines.concat())?;
        self.origin_value = None;
        self.inserted = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::undoable::test_support::real_fs;
    use tempfile::TempDir;

    fn rc(tmp: &TempDir, content: &str) -> PathBuf {
        let path = tmp.path().join("zshrc");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn rewrites_existing_export_and_undo_restores_it() {
        let tmp = TempDir::new().unwrap();
        let original = "# header\nexport EDITOR=vi\nalias ll='ls -l'\n";
        let path = rc(&tmp, original);

        let fs = real_fs();
        let mut cmd = AppendEnvVar::new("EDITOR", "nvim", &path);
        cmd.exec(&fs).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# header\nexport EDITOR=nvim\nalias ll='ls -l'\n"
        );
        assert_eq!(cmd.origin_value.as_deref(), Some("vi"));

        cmd.undo(&fs).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn inserts_after_last_export_and_undo_removes_it() {
        let tmp = TempDir::new().unwrap();
        let original = "export A=1\nexport B=2\nalias x=y\n";
        let path = rc(&tmp, original);

        let fs = real_fs();
        let mut cmd = AppendEnvVar::new("EDITOR", "nvim", &path);
        cmd.exec(&fs).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "export A=1\nexport B=2\nexport EDITOR=nvim\nalias x=y\n"
        );
        assert!(cmd.inserted);

        cmd.undo(&fs).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn prepends_when_no_exports_exist() {
        let tmp = TempDir::new().unwrap();
        let path = rc(&tmp, "alias x=y\n");

        let fs = real_fs();
        let mut cmd = AppendEnvVar::new("EDITOR", "nvim", &path);
        cmd.exec(&fs).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "export EDITOR=nvim\nalias x=y\n"
        );

        cmd.undo(&fs).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "alias x=y\n");
    }

    #[test]
    fn matching_value_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let original = "export EDITOR=nvim\n";
        let path = rc(&tmp, original);

        let fs = real_fs();
        let mut cmd = AppendEnvVar::new("EDITOR", "nvim", &path);
        cmd.exec(&fs).unwrap();
        assert!(cmd.origin_value.is_none());
        assert!(!cmd.inserted);

        cmd.undo(&fs).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }
}
