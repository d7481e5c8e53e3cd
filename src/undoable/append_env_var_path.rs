//! undoable::append_env_var_path

use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{CommandError, SpecTuple};
use crate::fsops::ensure::ensure_exists;
use crate::fsops::FsOps;

/// Maximum length of a PATH export line before a fresh line is emitted.
const MAX_LINE_LEN: usize = 80;

fn path_export_pattern() -> Regex {
    Regex::new(r#"^export\s+PATH=["']?([^"']*)["']?$"#).unwrap()
}

/// What exec changed, so undo can remove exactly that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathInsertion {
    /// The path was spliced into an existing PATH export line.
    Token,
    /// A whole new `export PATH="$PATH:<path>"` line was emitted.
    Line,
}

/// Ensure `path` appears in the rc file's `export PATH="...:$PATH:..."` line.
///
/// A path already present in the token list is a recorded no-op, so repeated
/// exec converges. The token is inserted immediately before `$PATH` (at the
/// end when `$PATH` is the first token); when the line would grow past 80
/// characters a fresh `export PATH="$PATH:<path>"` line is emitted after it
/// instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendEnvVarPath {
    pub path: PathBuf,
    pub rc: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted: Option<PathInsertion>,
}

impl AppendEnvVarPath {
    pub fn new(path: impl Into<PathBuf>, rc: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rc: rc.into(),
            inserted: None,
        }
    }

    pub fn cmdline(&self) -> String {
        format!(
            "echo 'export PATH=\"$PATH:{}\"' >> {}",
            self.path.display(),
            self.rc.display()
        )
    }

    pub fn spec_tuple(&self) -> SpecTuple {
        SpecTuple::new(
            "append_env_var_path",
            vec![
                self.path.display().to_string(),
                self.rc.display().to_string(),
            ],
        )
    }

    fn fresh_line(&self) -> String {
        format!("export PATH=\"$PATH:{}\"", self.path.display())
    }

    pub(super) fn exec(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        ensure_exists(fs, &self.rc, "append PATH entry")?;
        let content = fs.input_file(&self.rc)?;
        let mut lines: Vec<String> = content.split_inclusive('\n').map(String::from).collect();
        let token = self.path.display().to_string();

        let last_path_line = find_last_path_export(&lines);

        let Some((i, tokens)) = last_path_line else {
            lines.insert(0, format!("{}\n", self.fresh_line()));
            fs.write_file(&self.rc, &lines.concat())?;
            self.inserted = Some(PathInsertion::Line);
            return Ok(());
        };

        if tokens.iter().any(|t| *t == token) {
            self.inserted = None;
            return Ok(());
        }

        if lines[i].trim_end_matches('\n').len() + token.len() + 1 >= MAX_LINE_LEN {
            if !lines[i].ends_with('\n') {
                lines[i].push('\n');
            }
            lines.insert(i + 1, format!("{}\n", self.fresh_line()));
            self.inserted = Some(PathInsertion::Line);
        } else {
            let mut tokens = tokens;
            let dollar = tokens.iter().position(|t| t == "$PATH").unwrap_or(0);
            if dollar == 0 {
                tokens.push(token);
            } else {
                tokens.insert(dollar, token);
            }
            let ending = if lines[i].ends_with('\n') { "\n" } else { "" };
            lines[i] = format!("export PATH=\"{}\"{ending}", tokens.join(":"));
            self.inserted = Some(PathInsertion::Token);
        }

        fs.write_file(&self.rc, &lines.concat())?;
        Ok(())
    }

    pub(super) fn undo(&mut self, fs: &FsOps) -> Result<(), CommandError> {
        let Some(insertion) = self.inserted else {
            return Ok(());
        };
        ensure_exists(fs, &self.rc, "remove PATH entry")?;
        let content = fs.input_file(&self.rc)?;
        let mut lines: Vec<String> = content.split_inclusive('\n').map(String::from).collect();
        let token = self.path.display().to_string();

        match insertion {
            PathInsertion::Line => {
                let target = self.fresh_line();
                if let Some(i) = lines
                    .iter()
                    .position(|line| line.trim_end_matches('\n') == target)
                {
                    lines.remove(i);
                }
            }
            PathInsertion::Token => {
                if let Some((i, mut tokens)) = find_last_path_export(&lines)
                    .filter(|(_, tokens)| tokens.iter().any(|t| *t == token))
                    .or_else(|| {
                        // The edited line may no longer be the last one.
                        lines.iter().enumerate().rev().find_map(|(i, line)| {
                            parse_path_export(line)
                                .filter(|tokens| tokens.iter().any(|t| *t == token))
                                .map(|tokens| (i, tokens))
                        })
                    })
                {
                    tokens.retain(|t| *t != token);
                    let ending = if lines[i].ends_with('\n') { "\n" } else { "" };
                    lines[i] = format!("export PATH=\"{}\"{ending}", tokens.join(":"));
                }
            }
        }

        fs.write_file(&self.rc, &lines.concat())?;
        self.inserted = None;
        Ok(())
    }
}

/// The last line exporting a PATH that references `$PATH`, with its tokens.
fn find_last_path_export(lines: &[String]) -> Option<(usize, Vec<String>)> {
    lines
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, line)| parse_path_export(line).map(|tokens| (i, tokens)))
}

fn parse_path_export(line: &str) -> Option<Vec<String>> {
    let captures = path_export_pattern().captures(line.trim_end_matches('\n'))?;
    let tokens: Vec<String> = captures
        .get(1)
        .unwrap()
        .as_str()
        .split(':')
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();
    tokens.iter().any(|t| t == "$PATH").then_some(tokens)
}
