//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse arguments and global flags
//! - Initialize logging and the process-wide options
//! - Delegate to command handlers
//!
//! The CLI layer is thin: it builds the registry from the catalog, the
//! [`crate::equipment::EquipContext`] from the flags, and dispatches. All
//! state changes flow through the equipment manager.

pub mod args;
pub mod commands;

use std::sync::Arc;

use anyhow::Result;

use crate::catalog;
use crate::equipment::EquipContext;
use crate::ui::prompts::TerminalPrompt;

pub use args::{Cli, Command, LogLevel};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    env_logger::Builder::new()
        .filter_level(cli.loglevel.filter())
        .format_timestamp(None)
        .init();

    let registry = catalog::registry()?;
    let ctx = EquipContext::for_project(cli.options(), Arc::new(TerminalPrompt));

    commands::dispatch(cli.command, &registry, &ctx)
}
