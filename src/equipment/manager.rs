//! equipment::manager
//!
//! The synchronizer: reconciles installed state against declared
//! requirements with minimum effort, module by module in dependency order.
//!
//! # Reconciliation
//!
//! Per module the manager runs three loops:
//!
//! 1. **Packages** - drop (and uninstall, unless `used_existing`) records
//!    that are no longer declared or no longer satisfied; install what is
//!    declared but missing, remembering pre-existing commands as
//!    `used_existing`.
//! 2. **Git repos** - keyed by normalized URL: uninstall the unrequired or
//!    broken, relocate clones whose declared path moved, update the healthy,
//!    clone the missing.
//! 3. **Commands** - diff the journaled sequence against the declared one by
//!    `spec_tuple`, keep the common prefix, roll the surplus back newest
//!    first, then execute the remainder inside a fresh transaction.
//!
//! Every externally invoked operation persists the journal afterwards,
//! whether it succeeded or not; the operation's own error takes precedence
//! over a secondary persistence error.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::persistence;
use super::transaction::Transaction;
use super::{EquipContext, EquipError, EquipmentStatus, ModuleEquipmentMetaInfo};
use crate::registry::{Module, ModuleRegistry};
use crate::requirements::{GitRepoInstallationRecord, PackageInstallationRecord};
use crate::undoable::UndoableCommand;

/// Manager of module equipment: the journal plus the sync algorithms.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentManager {
    /// Journal: module name → its equipment meta info.
    #[serde(default)]
    pub meta: BTreeMap<String, ModuleEquipmentMetaInfo>,
}

impl EquipmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the journal, or an empty manager when none exists.
    pub fn load(ctx: &EquipContext) -> Result<Self, EquipError> {
        Ok(persistence::load(&ctx.persistence_path)?)
    }

    /// Names of the currently equipped modules.
    pub fn equipped_module_names(&self) -> Vec<String> {
        self.meta.keys().cloned().collect()
    }

    /// Equip `names` (and their dependencies) and remove every other
    /// currently equipped module (and its dependents).
    pub fn sync(
        &mut self,
        registry: &ModuleRegistry,
        ctx: &EquipContext,
        names: &[String],
    ) -> Result<(), EquipError> {
        let result = self.sync_inner(registry, ctx, names);
        self.persist_after(ctx, result)
    }

    /// Equip `names` and their dependencies.
    pub fn equip(
        &mut self,
        registry: &ModuleRegistry,
        ctx: &EquipContext,
        names: &[String],
    ) -> Result<(), EquipError> {
        let result = registry
            .resolve_equip_blueprint(names)
            .map_err(EquipError::from)
            .and_then(|blueprint| self.equip_modules(&blueprint, ctx));
        self.persist_after(ctx, result)
    }

    /// Remove `names` and their dependents.
    pub fn remove(
        &mut self,
        registry: &ModuleRegistry,
        ctx: &EquipContext,
        names: &[String],
    ) -> Result<(), EquipError> {
        let result = registry
            .resolve_remove_blueprint(names)
            .map_err(EquipError::from)
            .and_then(|blueprint| self.remove_modules(&blueprint, ctx));
        self.persist_after(ctx, result)
    }

    /// Persistence runs whether or not the operation succeeded; the
    /// operation error wins over a secondary persistence error.
    fn persist_after(
        &self,
        ctx: &EquipContext,
        result: Result<(), EquipError>,
    ) -> Result<(), EquipError> {
        let saved = persistence::save(self, ctx);
        result.and(saved.map_err(EquipError::from))
    }

    fn sync_inner(
        &mut self,
        registry: &ModuleRegistry,
        ctx: &EquipContext,
        names: &[String],
    ) -> Result<(), EquipError> {
        let equip_blueprint = registry.resolve_equip_blueprint(names)?;
        let keep: BTreeSet<&str> = equip_blueprint.iter().map(|m| m.name()).collect();
        let to_remove: Vec<String> = self
            .meta
            .keys()
            .filter(|name| !keep.contains(name.as_str()))
            .cloned()
            .collect();
        let remove_blueprint = registry.resolve_remove_blueprint(&to_remove)?;

        self.remove_modules(&remove_blueprint, ctx)?;
        self.equip_modules(&equip_blueprint, ctx)
    }

    // =========================================================================
    // Equip
    // =========================================================================

    fn equip_modules(
        &mut self,
        blueprint: &[&Module],
        ctx: &EquipContext,
    ) -> Result<(), EquipError> {
        for module in blueprint {
            let mut meta = self
                .meta
                .get(module.name())
                .cloned()
                .unwrap_or_else(|| ModuleEquipmentMetaInfo::new(module.name()));

            info!("equipping module {}", module.name());
            let result = Self::equip_one_step(module, &mut meta, ctx);
            meta.status = match &result {
                Ok(()) => EquipmentStatus::Installed,
                Err(_) => EquipmentStatus::Broken,
            };
            // Persisted either way, so a broken module can be retried.
            self.meta.insert(module.name().to_string(), meta);
            result?;
        }
        Ok(())
    }

    fn equip_one_step(
        module: &Module,
        meta: &mut ModuleEquipmentMetaInfo,
        ctx: &EquipContext,
    ) -> Result<(), EquipError> {
        Self::sync_packages_step(module, meta, ctx)?;
        Self::sync_gitrepos_step(module, meta, ctx)?;
        Self::sync_commands_step(module, meta, ctx)
    }

    fn sync_packages_step(
        module: &Module,
        meta: &mut ModuleEquipmentMetaInfo,
        ctx: &EquipContext,
    ) -> Result<(), EquipError> {
        let fs = &ctx.fs;

        // Drop stale records: no longer declared, or no longer satisfied.
        let mut kept = Vec::with_capacity(meta.package_installations.len());
        for installation in meta.package_installations.drain(..) {
            let declared = module
                .packages()
                .iter()
                .any(|req| *req == installation.requirement);
            if !declared || !installation.requirement.is_satisfied(fs) {
                if !installation.used_existing {
                    installation
                        .requirement
                        .uninstall(fs, installation.backend.as_ref())?;
                }
                debug!("dropping package record {}", installation.requirement.spec);
            } else {
                kept.push(installation);
            }
        }
        meta.package_installations = kept;

        // Install what is declared but not yet recorded.
        for requirement in module.packages() {
            let recorded = meta
                .package_installations
                .iter_mut()
                .find(|r| r.requirement == *requirement);

            match recorded {
                Some(record) => {
                    if !requirement.is_satisfied(fs) {
                        // Broken since we last saw it: reinstall.
                        record.backend = Some(requirement.install(fs)?);
                        record.used_existing = false;
                    }
                    // A declared version change surfaces as a new
                    // requirement value and is handled by the drop loop
                    // above, not by an update here.
                }
                None => {
                    let (backend, used_existing) = if requirement.is_satisfied(fs) {
                        (None, true)
                    } else {
                        (Some(requirement.install(fs)?), false)
                    };
                    meta.package_installations.push(PackageInstallationRecord {
                        requirement: requirement.clone(),
                        backend,
                        used_existing,
                    });
                }
            }
        }
        Ok(())
    }

    fn sync_gitrepos_step(
        module: &Module,
        meta: &mut ModuleEquipmentMetaInfo,
        ctx: &EquipContext,
    ) -> Result<(), EquipError> {
        let fs = &ctx.fs;
        let vcs = &ctx.vcs;

        // Drop stale clones; relocate the ones whose declared path moved.
        let mut kept = Vec::with_capacity(meta.gitrepo_installations.len());
        for mut installation in meta.gitrepo_installations.drain(..) {
            let declared = module
                .gitrepos()
                .iter()
                .find(|req| req.url == installation.requirement.url);

            match declared {
                None => {
                    installation.requirement.uninstall(fs)?;
                    debug!("dropping gitrepo record {}", installation.requirement.url);
                }
                Some(_) if !installation.requirement.is_satisfied(vcs) => {
                    installation.requirement.uninstall(fs)?;
                    debug!("dropping broken gitrepo {}", installation.requirement.url);
                }
                Some(required) => {
                    if required.path != installation.requirement.path {
                        fs.move_path(&installation.requirement.path, &required.path)?;
                        installation.requirement.path = required.path.clone();
                    }
                    kept.push(installation);
                }
            }
        }
        meta.gitrepo_installations = kept;

        // Clone or update what is declared.
        for requirement in module.gitrepos() {
            let recorded = meta
                .gitrepo_installations
                .iter_mut()
                .find(|r| r.requirement.url == requirement.url);

            match recorded {
                Some(record) => {
                    if record.requirement.is_satisfied(vcs) {
                        requirement.update(vcs)?;
                    } else {
                        requirement.install(vcs)?;
                        record.used_existing = false;
                    }
                }
                None => {
                    let used_existing = requirement.is_satisfied(vcs);
                    if !used_existing {
                        requirement.install(vcs)?;
                    }
                    meta.gitrepo_installations.push(GitRepoInstallationRecord {
                        requirement: requirement.clone(),
                        used_existing,
                    });
                }
            }
        }
        Ok(())
    }

    fn sync_commands_step(
        module: &Module,
        meta: &mut ModuleEquipmentMetaInfo,
        ctx: &EquipContext,
    ) -> Result<(), EquipError> {
        let fs = &ctx.fs;

        // Walk the journaled sequence and the declared one in lockstep until
        // their spec tuples diverge.
        let mut declared: VecDeque<UndoableCommand> = module.commands().iter().cloned().collect();
        let mut divergence = None;
        'walk: for (ti, transaction) in meta.transactions.iter().enumerate() {
            for ri in 0..transaction.effect_len() {
                let journaled = &transaction.records[ri];
                let matches = declared
                    .front()
                    .is_some_and(|next| next.spec_tuple() == journaled.spec_tuple());
                if matches {
                    declared.pop_front();
                } else {
                    divergence = Some((ti, ri));
                    break 'walk;
                }
            }
        }

        // Roll back the surplus journaled commands, in reverse of execution
        // order: newest transactions entirely, the divergent one down to the
        // common prefix.
        if let Some((ti, ri)) = divergence {
            for transaction in meta.transactions[ti + 1..].iter_mut().rev() {
                transaction.rollback(fs)?;
            }
            meta.transactions[ti].rollback_keeping(ri, fs)?;
        }

        if declared.is_empty() {
            return Ok(());
        }

        // Execute the remaining declared commands in a fresh transaction.
        let commit_id = Self::module_commit_id(module, ctx);
        let mut transaction = Transaction::begin(commit_id);
        let mut failure = None;
        for mut command in declared {
            let result = command.exec(fs);
            if result.ok() {
                transaction.records.push(command);
            } else {
                failure = Some(EquipError::CommandFailed {
                    cmdline: result.cmdline,
                    stderr: result.stderr.unwrap_or_default(),
                });
                break;
            }
        }

        match failure {
            None => {
                transaction.commit()?;
                meta.transactions.push(transaction);
                Ok(())
            }
            Some(error) => {
                // Only this transaction's commands are undone; earlier
                // transactions keep their effects.
                transaction.fail();
                let rollback = transaction.rollback(fs);
                meta.transactions.push(transaction);
                rollback?;
                Err(error)
            }
        }
    }

    /// Commit id versioning `module` in the project tree.
    ///
    /// Degrades to an empty id when the project root is not a git checkout,
    /// so equipping still works from plain directory installs.
    fn module_commit_id(module: &Module, ctx: &EquipContext) -> String {
        ctx.vcs
            .last_commit_id_of(&ctx.project_root, None, Some(module.source_path()))
            .unwrap_or_default()
    }

    // =========================================================================
    // Remove
    // =========================================================================

    fn remove_modules(
        &mut self,
        blueprint: &[&Module],
        ctx: &EquipContext,
    ) -> Result<(), EquipError> {
        for module in blueprint {
            let Some(mut meta) = self.meta.get(module.name()).cloned() else {
                continue; // never equipped, nothing to undo
            };

            info!("removing module {}", module.name());
            match Self::remove_one_step(&mut meta, ctx) {
                Ok(()) => {
                    meta.status = EquipmentStatus::Removed;
                    self.meta.remove(module.name());
                }
                Err(error) => {
                    // The record stays so the removal can be retried.
                    meta.status = EquipmentStatus::Broken;
                    self.meta.insert(module.name().to_string(), meta);
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    fn remove_one_step(
        meta: &mut ModuleEquipmentMetaInfo,
        ctx: &EquipContext,
    ) -> Result<(), EquipError> {
        let fs = &ctx.fs;

        // Undo config patches, newest transaction first.
        while let Some(transaction) = meta.transactions.last_mut() {
            transaction.rollback(fs)?;
            meta.transactions.pop();
        }

        // Remove git repos, newest first.
        while let Some(record) = meta.gitrepo_installations.last() {
            record.requirement.uninstall(fs)?;
            meta.gitrepo_installations.pop();
        }

        // Uninstall packages, newest first, honoring used_existing.
        while let Some(record) = meta.package_installations.last() {
            if !record.used_existing {
                record.requirement.uninstall(fs, record.backend.as_ref())?;
            }
            meta.package_installations.pop();
        }

        Ok(())
    }
}
