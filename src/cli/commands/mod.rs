//! cli::commands
//!
//! Command handlers: thin glue between parsed arguments and the equipment
//! manager.

mod equip;
mod list;
mod remove;
mod sync;

use anyhow::Result;

use super::args::Command;
use crate::equipment::EquipContext;
use crate::registry::ModuleRegistry;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, registry: &ModuleRegistry, ctx: &EquipContext) -> Result<()> {
    match command {
        Command::Equip { names } | Command::Install { names } => equip::run(registry, ctx, names),
        Command::Remove { names } => remove::run(registry, ctx, names),
        Command::Sync { names } => sync::run(registry, ctx, names),
        Command::List {
            names,
            installed_only,
        } => list::run(registry, ctx, names, installed_only),
    }
}

/// Ask the user to pick module names when none were given on the command
/// line. Returns the given names untouched otherwise.
fn names_or_choose(
    ctx: &EquipContext,
    names: Vec<String>,
    items: Vec<String>,
    header: &str,
    selected: &[String],
) -> Result<Vec<String>> {
    if !names.is_empty() {
        return Ok(names);
    }
    let chosen = ctx.fs.prompt().choose(&items, header, selected)?;
    Ok(chosen.into_iter().filter(|n| !n.is_empty()).collect())
}
