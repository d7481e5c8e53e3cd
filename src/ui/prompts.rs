//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Prompting is a capability behind the [`Prompt`] trait so that the engine
//! (notably the Ensure protocol's ASK strategy) and the CLI choosers never
//! talk to a terminal directly. Tests substitute [`StaticPrompt`].

use std::io::{BufRead, Write};

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("prompt unavailable: {0}")]
    Io(String),
}

/// Capability for asking the user questions.
pub trait Prompt {
    /// Present `items` and return the chosen subset, in choice order.
    ///
    /// `selected` seeds the default selection: an empty answer returns it
    /// unchanged. Answers may be given as 1-based indices or literal item
    /// names, separated by spaces or commas.
    fn choose(
        &self,
        items: &[String],
        header: &str,
        selected: &[String],
    ) -> Result<Vec<String>, PromptError>;

    /// Ask a yes/no question; `default` is returned on an empty answer.
    fn confirm(&self, body: &str, default: bool) -> Result<bool, PromptError>;
}

/// Prompt implementation over stdin/stdout.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn read_line(&self) -> Result<String, PromptError> {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| PromptError::Io(e.to_string()))?;
        Ok(line.trim().to_string())
    }
}

impl Prompt for TerminalPrompt {
    fn choose(
        &self,
        items: &[String],
        header: &str,
        selected: &[String],
    ) -> Result<Vec<String>, PromptError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{header}").map_err(|e| PromptError::Io(e.to_string()))?;
        for (i, item) in items.iter().enumerate() {
            let mark = if selected.contains(item) { "*" } else { " " };
            writeln!(out, "{mark} {:>2}) {item}", i + 1)
                .map_err(|e| PromptError::Io(e.to_string()))?;
        }
        write!(out, "> ").map_err(|e| PromptError::Io(e.to_string()))?;
        out.flush().map_err(|e| PromptError::Io(e.to_string()))?;
        drop(out);

        let answer = self.read_line()?;
        if answer.is_empty() {
            return Ok(selected.to_vec());
        }

        let mut chosen = Vec::new();
        for token in answer.split([' ', ',']).filter(|t| !t.is_empty()) {
            let item = match token.parse::<usize>() {
                Ok(n) if n >= 1 && n <= items.len() => items[n - 1].clone(),
                _ => items
                    .iter()
                    .find(|i| i.as_str() == token)
                    .cloned()
                    .ok_or_else(|| PromptError::Io(format!("no such choice: {token}")))?,
            };
            if !chosen.contains(&item) {
                chosen.push(item);
            }
        }
        Ok(chosen)
    }

    fn confirm(&self, body: &str, default: bool) -> Result<bool, PromptError> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        print!("{body} {hint} ");
        std::io::stdout()
            .flush()
            .map_err(|e| PromptError::Io(e.to_string()))?;
        let answer = self.read_line()?;
        Ok(match answer.to_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }
}

/// Prompt double with canned answers, for tests and non-interactive runs.
#[derive(Debug, Clone, Default)]
pub struct StaticPrompt {
    /// Returned verbatim from every `choose` call.
    pub choices: Vec<String>,
    /// Returned from every `confirm` call.
    pub confirmed: bool,
}

impl StaticPrompt {
    /// A prompt that always picks the given items.
    pub fn choosing<I: Into<String>>(choices: impl IntoIterator<Item = I>) -> Self {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
            confirmed: true,
        }
    }
}

impl Prompt for StaticPrompt {
    fn choose(
        &self,
        _items: &[String],
        _header: &str,
        _selected: &[String],
    ) -> Result<Vec<String>, PromptError> {
        Ok(self.choices.clone())
    }

    fn confirm(&self, _body: &str, _default: bool) -> Result<bool, PromptError> {
        Ok(self.confirmed)
    }
}
