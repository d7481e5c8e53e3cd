//! equip / install commands

use anyhow::Result;
use log::warn;

use super::names_or_choose;
use crate::equipment::{EquipContext, EquipmentManager};
use crate::registry::ModuleRegistry;

/// Equip the named modules (and their dependencies).
///
/// With no names, opens a chooser over the modules not yet equipped.
/// `install` dispatches here as well; the two differ only in wording.
pub fn run(registry: &ModuleRegistry, ctx: &EquipContext, names: Vec<String>) -> Result<()> {
    let mut manager = EquipmentManager::load(ctx)?;
    let equipped = manager.equipped_module_names();

    let uninstalled: Vec<String> = registry
        .all_module_names()
        .into_iter()
        .filter(|name| !equipped.contains(name))
        .collect();

    let names = names_or_choose(ctx, names, uninstalled, "Choose modules to equip", &[])?;
    if names.is_empty() {
        warn!("no modules chosen, quit.");
        return Ok(());
    }

    manager.equip(registry, ctx, &names)?;
    Ok(())
}
