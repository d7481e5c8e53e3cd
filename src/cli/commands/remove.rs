//! remove command

use anyhow::Result;
use log::warn;

use super::names_or_choose;
use crate::equipment::{EquipContext, EquipmentManager};
use crate::registry::ModuleRegistry;

/// Remove the named modules (and their dependents).
///
/// With no names, opens a chooser restricted to the equipped modules.
pub fn run(registry: &ModuleRegistry, ctx: &EquipContext, names: Vec<String>) -> Result<()> {
    let mut manager = EquipmentManager::load(ctx)?;

    let equipped = manager.equipped_module_names();
    if equipped.is_empty() {
        warn!("no modules have been equipped, quit.");
        return Ok(());
    }

    let names = names_or_choose(ctx, names, equipped, "Choose modules to remove", &[])?;
    if names.is_empty() {
        warn!("no modules chosen, quit.");
        return Ok(());
    }

    manager.remove(registry, ctx, &names)?;
    Ok(())
}
