//! registry
//!
//! Typed module data and the registration manager.
//!
//! # Architecture
//!
//! A [`Module`] is pure data: a named bundle of package requirements, git
//! repo requirements, an ordered command sequence and the names of the
//! modules it depends on. The [`ModuleRegistry`] owns every registered
//! module in an arena, maintains the dependency graph over arena indices,
//! validates it (unique names, known dependencies, no cycles) and resolves
//! the equip/remove blueprints the equipment manager walks.
//!
//! # Invariants
//!
//! - Equip blueprints list dependencies before their dependents; the modules
//!   asked for come last.
//! - Remove blueprints list dependents before their dependencies; the
//!   modules asked for come first.
//! - Blueprint order is deterministic regardless of input order.

pub mod graph;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::requirements::{GitRepoRequirement, PackageRequirement};
use crate::undoable::UndoableCommand;

use graph::DepGraph;

/// Errors from module registration and blueprint resolution.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A second module was registered under an existing name.
    #[error("module {0} is already registered")]
    DuplicateModule(String),

    /// A module name was looked up that no registration provides.
    #[error("module {0} is not registered")]
    UnknownModule(String),

    /// A module requires a module that was never registered.
    #[error("module {module} requires {dependency} but it is not registered")]
    UnknownDependency { module: String, dependency: String },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected: {0}")]
    DependencyCycle(String),
}

/// A declarative module: a named bundle of requirements and undoable
/// commands, plus the modules it depends on.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    requires: Vec<String>,
    packages: Vec<PackageRequirement>,
    gitrepos: Vec<GitRepoRequirement>,
    commands: Vec<UndoableCommand>,
    source_path: PathBuf,
}

impl Module {
    /// A new empty module named `name`.
    ///
    /// `source_path` defaults to the conventional catalog location; override
    /// it with [`Module::defined_in`] when the module lives elsewhere. The
    /// path identifies the file whose last commit id versions the module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            packages: Vec::new(),
            gitrepos: Vec::new(),
            commands: Vec::new(),
            source_path: PathBuf::from("src/catalog/mod.rs"),
        }
    }

    pub fn requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = requires.into_iter().map(Into::into).collect();
        self
    }

    pub fn package(mut self, requirement: PackageRequirement) -> Self {
        self.packages.push(requirement);
        self
    }

    pub fn gitrepo(mut self, requirement: GitRepoRequirement) -> Self {
        self.gitrepos.push(requirement);
        self
    }

    pub fn command(mut self, command: impl Into<UndoableCommand>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn defined_in(mut self, source_path: impl Into<PathBuf>) -> Self {
        self.source_path = source_path.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_names(&self) -> &[String] {
        &self.requires
    }

    pub fn packages(&self) -> &[PackageRequirement] {
        &self.packages
    }

    pub fn gitrepos(&self) -> &[GitRepoRequirement] {
        &self.gitrepos
    }

    pub fn commands(&self) -> &[UndoableCommand] {
        &self.commands
    }

    /// The file in the project tree that defines this module.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}

/// Registration manager: owns the modules and their dependency graph.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
    by_name: BTreeMap<String, usize>,
    graph: DepGraph,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module; a duplicate name fails.
    ///
    /// Edges to dependencies are recorded lazily: they are resolved and
    /// checked by [`ModuleRegistry::validate`], so registration order does
    /// not matter.
    pub fn register(&mut self, module: Module) -> Result<(), RegistryError> {
        if self.by_name.contains_key(module.name()) {
            return Err(RegistryError::DuplicateModule(module.name().to_string()));
        }
        let index = self.graph.add_node();
        self.by_name.insert(module.name().to_string(), index);
        self.modules.push(module);
        Ok(())
    }

    /// Check the registry: every dependency registered, no cycles.
    ///
    /// Must be called once after all registrations and before resolving
    /// blueprints; it also freezes the dependency edges.
    pub fn validate(&mut self) -> Result<(), RegistryError> {
        // (Re)build edges from the declared names.
        let mut edges = Vec::new();
        for (index, module) in self.modules.iter().enumerate() {
            for dependency in module.required_names() {
                let dep_index = *self.by_name.get(dependency).ok_or_else(|| {
                    RegistryError::UnknownDependency {
                        module: module.name().to_string(),
                        dependency: dependency.clone(),
                    }
                })?;
                edges.push((index, dep_index));
            }
        }

        let mut graph = DepGraph::new();
        for _ in 0..self.modules.len() {
            graph.add_node();
        }
        for (dependent, dependency) in edges {
            graph.add_edge(dependent, dependency);
        }

        if let Some(cycle) = graph.find_cycle() {
            let names: Vec<&str> = cycle
                .iter()
                .chain(cycle.first())
                .map(|&i| self.modules[i].name())
                .collect();
            return Err(RegistryError::DependencyCycle(names.join(" -> ")));
        }

        self.graph = graph;
        Ok(())
    }

    /// All registered module names, in name order.
    pub fn all_module_names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    /// Look up a module by name.
    pub fn module_by_name(&self, name: &str) -> Result<&Module, RegistryError> {
        self.by_name
            .get(name)
            .map(|&i| &self.modules[i])
            .ok_or_else(|| RegistryError::UnknownModule(name.to_string()))
    }

    /// The modules to equip for `names`, dependencies first.
    ///
    /// Collects the requested modules and all of their transitive
    /// dependencies, in reverse topological order. Input order is
    /// irrelevant.
    pub fn resolve_equip_blueprint(&self, names: &[String]) -> Result<Vec<&Module>, RegistryError> {
        let seeds = self.indices_of(names)?;
        let closure = self.graph.dependencies_closure(&seeds);
        let order = self
            .graph
            .topo_dependencies_first(&closure)
            .ok_or_else(|| RegistryError::DependencyCycle(self.cycle_names()))?;
        Ok(order.into_iter().map(|i| &self.modules[i]).collect())
    }

    /// The modules to remove for `names`, dependents first.
    ///
    /// Collects the requested modules and all of their transitive
    /// dependents, in forward topological order.
    pub fn resolve_remove_blueprint(&self, names: &[String]) -> Result<Vec<&Module>, RegistryError> {
        let seeds = self.indices_of(names)?;
        let closure = self.graph.dependents_closure(&seeds);
        let order = self
            .graph
            .topo_dependents_first(&closure)
            .ok_or_else(|| RegistryError::DependencyCycle(self.cycle_names()))?;
        Ok(order.into_iter().map(|i| &self.modules[i]).collect())
    }

    fn indices_of(&self, names: &[String]) -> Result<Vec<usize>, RegistryError> {
        names
            .iter()
            .map(|name| {
                self.by_name
                    .get(name)
                    .copied()
                    .ok_or_else(|| RegistryError::UnknownModule(name.clone()))
            })
            .collect()
    }

    fn cycle_names(&self) -> String {
        match self.graph.find_cycle() {
            Some(cycle) => cycle
                .iter()
                .chain(cycle.first())
                .map(|&i| self.modules[i].name())
                .collect::<Vec<_>>()
                .join(" -> "),
            None => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_chain() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register(Module::new("a")).unwrap();
        registry.register(Module::new("b").requires(["a"])).unwrap();
        registry.register(Module::new("c").requires(["b"])).unwrap();
        registry.validate().unwrap();
        registry
    }

    fn names(modules: &[&Module]) -> Vec<String> {
        modules.iter().map(|m| m.name().to_string()).collect()
    }

    #[test]
    fn duplicate_name_fails() {
        let mut registry = ModuleRegistry::new();
        registry.register(Module::new("zsh")).unwrap();
        let err = registry.register(Module::new("zsh")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateModule(_)));
    }

    #[test]
    fn unknown_dependency_fails_validation() {
        let mut registry = ModuleRegistry::new();
        registry
            .register(Module::new("vim").requires(["rust"]))
            .unwrap();
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("vim requires rust"));
    }

    #[test]
    fn cycle_fails_validation_naming_the_cycle() {
        let mut registry = ModuleRegistry::new();
        registry.register(Module::new("a").requires(["b"])).unwrap();
        registry.register(Module::new("b").requires(["a"])).unwrap();
        let err = registry.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cycle"));
        assert!(message.contains('a') && message.contains('b'));
    }

    #[test]
    fn equip_blueprint_lists_dependencies_first() {
        let registry = registry_with_chain();
        let blueprint = registry
            .resolve_equip_blueprint(&["c".to_string()])
            .unwrap();
        assert_eq!(names(&blueprint), vec!["a", "b", "c"]);
        assert_eq!(blueprint.last().unwrap().name(), "c");
    }

    #[test]
    fn equip_blueprint_ignores_input_order() {
        let registry = registry_with_chain();
        let blueprint = registry
            .resolve_equip_blueprint(&["c".to_string(), "a".to_string()])
            .unwrap();
        assert_eq!(names(&blueprint), vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_blueprint_lists_dependents_first() {
        let registry = registry_with_chain();
        let blueprint = registry
            .resolve_remove_blueprint(&["a".to_string()])
            .unwrap();
        assert_eq!(names(&blueprint), vec!["c", "b", "a"]);
        assert_eq!(blueprint.first().unwrap().name(), "c");
    }

    #[test]
    fn unknown_module_fails_lookup_and_blueprints() {
        let registry = registry_with_chain();
        assert!(registry.module_by_name("ghost").is_err());
        assert!(registry
            .resolve_equip_blueprint(&["ghost".to_string()])
            .is_err());
    }
}
