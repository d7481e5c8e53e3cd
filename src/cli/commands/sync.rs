//! sync command

use anyhow::Result;
use log::warn;

use super::names_or_choose;
use crate::equipment::{EquipContext, EquipmentManager};
use crate::registry::ModuleRegistry;

/// Equip the chosen modules and remove every other equipped one.
///
/// With no names, opens a chooser over the whole catalog seeded with the
/// currently equipped modules.
pub fn run(registry: &ModuleRegistry, ctx: &EquipContext, names: Vec<String>) -> Result<()> {
    let mut manager = EquipmentManager::load(ctx)?;

    let equipped = manager.equipped_module_names();
    let names = names_or_choose(
        ctx,
        names,
        registry.all_module_names(),
        "Choose modules to sync",
        &equipped,
    )?;
    if names.is_empty() {
        warn!("no modules chosen, quit.");
        return Ok(());
    }

    manager.sync(registry, ctx, &names)?;
    Ok(())
}
