//! list command

use anyhow::Result;
use log::{debug, info};

use crate::equipment::{EquipContext, EquipmentManager};
use crate::registry::ModuleRegistry;

/// List modules in blueprint order with their equipment state.
///
/// Requirement details go to the debug level.
pub fn run(
    registry: &ModuleRegistry,
    ctx: &EquipContext,
    names: Vec<String>,
    installed_only: bool,
) -> Result<()> {
    let manager = EquipmentManager::load(ctx)?;
    let equipped = manager.equipped_module_names();

    let names = if names.is_empty() {
        registry.all_module_names()
    } else {
        names
    };
    let blueprint = registry.resolve_equip_blueprint(&names)?;

    for module in blueprint {
        let is_installed = equipped.iter().any(|name| name == module.name());
        if installed_only && !is_installed {
            continue;
        }

        let state = if is_installed { "installed" } else { "not installed" };
        info!("module {} [{state}]", module.name());

        debug!("- packages:");
        for package in module.packages() {
            debug!("    {}", package.spec);
        }
        debug!("- gitrepos:");
        for repo in module.gitrepos() {
            debug!("    {}", repo.url);
        }
        debug!("- commands:");
        for command in module.commands() {
            debug!("    {}", command.cmdline());
        }
    }

    Ok(())
}
