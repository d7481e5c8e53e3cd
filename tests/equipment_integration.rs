//! Integration tests for the equipment engine.
//!
//! These tests exercise the full sync/equip/remove flows against real
//! temporary directories and real git repositories, asserting the journal,
//! the filesystem and the rollback behavior together.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use dofu::core::options::{Options, Strategy};
use dofu::equipment::{
    EquipContext, EquipmentManager, EquipmentStatus, TransactionStatus,
};
use dofu::pkg::{PackageBackend, PlatformBackends};
use dofu::core::platform::Platform;
use dofu::core::spec::PackageSpec;
use dofu::registry::{Module, ModuleRegistry};
use dofu::requirements::{GitRepoRequirement, PackageRequirement};
use dofu::ui::prompts::StaticPrompt;
use dofu::undoable::{AppendLine, BackupMv, Mkdir, Move, Symlink};

// =============================================================================
// Fixtures
// =============================================================================

/// A workspace with its own journal location and scratch area.
struct TestBench {
    dir: TempDir,
}

impl TestBench {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn scratch(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    fn journal_path(&self) -> PathBuf {
        self.path().join(".persistence/equipment.yaml")
    }

    fn context(&self) -> EquipContext {
        self.context_with(Options::default())
    }

    fn dry_context(&self) -> EquipContext {
        self.context_with(Options {
            dry_run: true,
            strategy: Strategy::Quit,
        })
    }

    fn context_with(&self, opts: Options) -> EquipContext {
        EquipContext::with_paths(
            opts,
            Arc::new(StaticPrompt::default()),
            self.path(),
            self.journal_path(),
        )
    }

    /// Initialize a local git repository usable as a clone origin.
    fn init_origin(&self, name: &str) -> PathBuf {
        let origin = self.scratch(name);
        std::fs::create_dir_all(&origin).unwrap();
        run_git(&origin, &["init"]);
        run_git(&origin, &["config", "user.email", "test@example.com"]);
        run_git(&origin, &["config", "user.name", "Test User"]);
        std::fs::write(origin.join("README.md"), "# origin\n").unwrap();
        run_git(&origin, &["add", "README.md"]);
        run_git(&origin, &["commit", "-m", "initial"]);
        origin
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {args:?} failed in {dir:?}");
}

fn registry_of(modules: Vec<Module>) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    for module in modules {
        registry.register(module).unwrap();
    }
    registry.validate().unwrap();
    registry
}

fn echo_backend() -> PackageBackend {
    PackageBackend::CurlSh {
        install_cmd: "echo backend install".to_string(),
        uninstall_cmd: "echo backend uninstall".to_string(),
        update_cmd: None,
    }
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Dry-run
// =============================================================================

#[test]
fn dry_run_sync_changes_nothing_and_persists_nothing() {
    let bench = TestBench::new();
    let repo_path = bench.scratch("r");
    let rc_path = bench.scratch("f");

    let module = Module::new("dummy")
        .package(PackageRequirement::new(
            PackageSpec::new("dummy-pkg"),
            "dofu-no-such-probe",
            vec![PlatformBackends::new(Platform::Any, vec![echo_backend()])],
        ))
        .gitrepo(GitRepoRequirement::new(
            "https://github.com/x/empty-repo",
            &repo_path,
        ))
        .command(AppendLine::new(&rc_path, "foo", "bar"));
    let registry = registry_of(vec![module]);

    let ctx = bench.dry_context();
    let mut manager = EquipmentManager::new();
    manager.sync(&registry, &ctx, &names(&["dummy"])).unwrap();

    // Nothing on disk changed and no journal was written.
    assert!(!repo_path.exists());
    assert!(!rc_path.exists());
    assert!(!bench.journal_path().exists());

    // A fresh load sees an empty journal.
    let loaded = EquipmentManager::load(&ctx).unwrap();
    assert!(loaded.meta.is_empty());
}

// =============================================================================
// Sync, idempotence, diffing
// =============================================================================

#[test]
fn sync_executes_commands_and_journals_them() {
    let bench = TestBench::new();
    let dir = bench.scratch("test-config-dir");
    let link = bench.scratch("test-config-link");

    let module = Module::new("test-one-module")
        .command(Mkdir::new(&dir))
        .command(Symlink::new(&dir, &link))
        .command(BackupMv::new(&dir));
    let registry = registry_of(vec![module]);

    let ctx = bench.context();
    let mut manager = EquipmentManager::new();
    manager
        .sync(&registry, &ctx, &names(&["test-one-module"]))
        .unwrap();

    let meta = &manager.meta["test-one-module"];
    assert_eq!(meta.status, EquipmentStatus::Installed);
    assert_eq!(meta.transactions.len(), 1);
    assert_eq!(meta.len_commands(), 3);

    assert!(!dir.exists());
    assert!(link.is_symlink());
    assert!(bench.scratch("test-config-dir.dofu.bak").is_dir());
    assert!(bench.journal_path().is_file());
}

#[test]
fn second_sync_is_idempotent() {
    let bench = TestBench::new();
    let origin = bench.init_origin("origin");
    let clone_path = bench.scratch("clone");
    let rc = bench.scratch("rc");
    std::fs::write(&rc, "# rc\n").unwrap();

    let module = Module::new("dummy")
        .package(PackageRequirement::new(
            PackageSpec::new("shell"),
            "sh",
            vec![PlatformBackends::new(Platform::Any, vec![echo_backend()])],
        ))
        .gitrepo(GitRepoRequirement::new(
            origin.to_str().unwrap(),
            &clone_path,
        ))
        .command(AppendLine::new(&rc, "never-present", "marker-line"));
    let registry = registry_of(vec![module]);

    let ctx = bench.context();
    let mut manager = EquipmentManager::new();
    manager.sync(&registry, &ctx, &names(&["dummy"])).unwrap();

    let after_first = std::fs::read_to_string(&rc).unwrap();
    let journal_first = std::fs::read_to_string(bench.journal_path()).unwrap();
    assert!(clone_path.join("README.md").is_file());

    // The probe `sh` pre-existed, so no backend is recorded.
    let meta = &manager.meta["dummy"];
    assert!(meta.package_installations[0].used_existing);
    assert!(meta.package_installations[0].backend.is_none());

    // Reload from disk, as a fresh process would, and sync again.
    let mut manager = EquipmentManager::load(&ctx).unwrap();
    manager.sync(&registry, &ctx, &names(&["dummy"])).unwrap();

    // No new transaction, no second marker line; journal rewritten intact.
    let meta = &manager.meta["dummy"];
    assert_eq!(meta.transactions.len(), 1);
    assert_eq!(meta.len_commands(), 1);
    assert_eq!(std::fs::read_to_string(&rc).unwrap(), after_first);
    assert_eq!(
        std::fs::read_to_string(bench.journal_path()).unwrap(),
        journal_first
    );
}

#[test]
fn edited_module_keeps_common_prefix_and_rolls_back_the_rest() {
    let bench = TestBench::new();
    let dir = bench.scratch("test-config-dir");
    let link = bench.scratch("test-config-link");
    let moved = bench.scratch("test-config-moved");

    let original = Module::new("test-one-module")
        .command(Mkdir::new(&dir))
        .command(Symlink::new(&dir, &link))
        .command(BackupMv::new(&dir));
    let registry = registry_of(vec![original]);

    let ctx = bench.context();
    let mut manager = EquipmentManager::new();
    manager
        .sync(&registry, &ctx, &names(&["test-one-module"]))
        .unwrap();

    // The module definition changes: the backup-mv becomes a move.
    let edited = Module::new("test-one-module")
        .command(Mkdir::new(&dir))
        .command(Symlink::new(&dir, &link))
        .command(Move::new(&link, &moved));
    let registry = registry_of(vec![edited]);

    let mut manager = EquipmentManager::load(&ctx).unwrap();
    manager
        .sync(&registry, &ctx, &names(&["test-one-module"]))
        .unwrap();

    let meta = &manager.meta["test-one-module"];
    assert_eq!(meta.transactions.len(), 2);
    assert_eq!(meta.transactions[0].len(), 3);
    assert_eq!(meta.transactions[0].effect_len(), 2);
    assert_eq!(meta.transactions[1].len(), 1);
    assert_eq!(meta.transactions[1].effect_len(), 1);
    assert_eq!(meta.len_commands(), 3);

    // The backup-mv was rolled back, the move executed.
    assert!(dir.is_dir());
    assert!(!link.exists());
    assert!(!bench.scratch("test-config-dir.dofu.bak").exists());
    assert!(moved.is_symlink());
}

#[test]
fn disjoint_sync_swaps_module_sets() {
    let bench = TestBench::new();
    let dir_a = bench.scratch("a-dir");
    let dir_b = bench.scratch("b-dir");

    let registry = registry_of(vec![
        Module::new("a").command(Mkdir::new(&dir_a)),
        Module::new("b").command(Mkdir::new(&dir_b)),
    ]);

    let ctx = bench.context();
    let mut manager = EquipmentManager::new();
    manager.sync(&registry, &ctx, &names(&["a"])).unwrap();
    assert!(dir_a.is_dir());

    manager.sync(&registry, &ctx, &names(&["b"])).unwrap();
    assert!(!manager.meta.contains_key("a"));
    assert!(manager.meta.contains_key("b"));
    assert!(!dir_a.exists());
    assert!(dir_b.is_dir());
}

// =============================================================================
// Dependencies
// =============================================================================

#[test]
fn dependency_chain_equips_in_order_and_removes_in_reverse() {
    let bench = TestBench::new();
    let registry = registry_of(vec![
        Module::new("a"),
        Module::new("b").requires(["a"]),
        Module::new("c").requires(["b"]),
    ]);

    let blueprint = registry.resolve_equip_blueprint(&names(&["c"])).unwrap();
    let order: Vec<&str> = blueprint.iter().map(|m| m.name()).collect();
    assert_eq!(order, vec!["a", "b", "c"]);

    let ctx = bench.context();
    let mut manager = EquipmentManager::new();
    manager.sync(&registry, &ctx, &names(&["c"])).unwrap();
    for name in ["a", "b", "c"] {
        assert_eq!(manager.meta[name].status, EquipmentStatus::Installed);
    }

    let blueprint = registry.resolve_remove_blueprint(&names(&["a"])).unwrap();
    let order: Vec<&str> = blueprint.iter().map(|m| m.name()).collect();
    assert_eq!(order, vec!["c", "b", "a"]);

    manager.remove(&registry, &ctx, &names(&["a"])).unwrap();
    assert!(manager.meta.is_empty());
}

// =============================================================================
// Failure and rollback
// =============================================================================

#[test]
fn failing_command_rolls_back_its_transaction_and_marks_broken() {
    let bench = TestBench::new();
    let dir = bench.scratch("x");
    let link = bench.scratch("y");

    let module = Module::new("broken")
        .command(Mkdir::new(&dir))
        .command(Symlink::new(&dir, &link))
        // `src` does not exist, so under QUIT this command fails.
        .command(Move::new(bench.scratch("missing"), bench.scratch("z")));
    let registry = registry_of(vec![module]);

    let ctx = bench.context();
    let mut manager = EquipmentManager::new();
    let err = manager
        .sync(&registry, &ctx, &names(&["broken"]))
        .unwrap_err();
    assert!(err.to_string().contains("failed to execute command"));

    // Both applied commands were undone.
    assert!(!dir.exists());
    assert!(!link.exists());

    let meta = &manager.meta["broken"];
    assert_eq!(meta.status, EquipmentStatus::Broken);
    let transaction = &meta.transactions[0];
    assert_eq!(transaction.status, TransactionStatus::Failed);
    assert_eq!(transaction.records.len(), 2);
    assert_eq!(transaction.rollback_cursor, 0);
    assert_eq!(transaction.effect_len(), 0);

    // The journal was persisted despite the failure.
    let loaded = EquipmentManager::load(&ctx).unwrap();
    assert_eq!(loaded.meta["broken"].status, EquipmentStatus::Broken);
    assert_eq!(
        loaded.meta["broken"].transactions[0].status,
        TransactionStatus::Failed
    );
}

#[test]
fn removal_undoes_commands_and_removes_adopted_clones() {
    let bench = TestBench::new();
    let origin = bench.init_origin("origin");
    let existing_clone = bench.scratch("existing");
    run_git(
        bench.path(),
        &["clone", origin.to_str().unwrap(), existing_clone.to_str().unwrap()],
    );
    let dir = bench.scratch("made-dir");

    let module = Module::new("dummy")
        .gitrepo(GitRepoRequirement::new(
            origin.to_str().unwrap(),
            &existing_clone,
        ))
        .command(Mkdir::new(&dir));
    let registry = registry_of(vec![module]);

    let ctx = bench.context();
    let mut manager = EquipmentManager::new();
    manager.sync(&registry, &ctx, &names(&["dummy"])).unwrap();
    assert!(manager.meta["dummy"].gitrepo_installations[0].used_existing);
    assert!(dir.is_dir());

    manager.remove(&registry, &ctx, &names(&["dummy"])).unwrap();
    assert!(manager.meta.is_empty());
    assert!(!dir.exists());
    // Unlike pre-existing packages, an adopted clone is still torn down:
    // only packages honor used_existing on removal.
    assert!(!existing_clone.exists());
}

#[test]
fn packages_installed_by_the_engine_are_uninstalled_exactly_once() {
    let bench = TestBench::new();
    let install_log = bench.scratch("install.log");
    let uninstall_log = bench.scratch("uninstall.log");
    let logging_backend = PackageBackend::CurlSh {
        install_cmd: format!("echo install >> {}", install_log.display()),
        uninstall_cmd: format!("echo uninstall >> {}", uninstall_log.display()),
        update_cmd: None,
    };

    let module = Module::new("dummy")
        // missing probe: the engine installs it
        .package(PackageRequirement::new(
            PackageSpec::new("ghost"),
            "dofu-no-such-probe",
            vec![PlatformBackends::new(
                Platform::Any,
                vec![logging_backend.clone()],
            )],
        ))
        // satisfied probe: recorded as pre-existing
        .package(PackageRequirement::new(
            PackageSpec::new("shell"),
            "sh",
            vec![PlatformBackends::new(
                Platform::Any,
                vec![logging_backend.clone()],
            )],
        ));
    let registry = registry_of(vec![module]);

    let ctx = bench.context();
    let mut manager = EquipmentManager::new();
    manager.sync(&registry, &ctx, &names(&["dummy"])).unwrap();

    let meta = &manager.meta["dummy"];
    assert_eq!(meta.package_installations.len(), 2);
    let ghost = &meta.package_installations[0];
    assert!(!ghost.used_existing);
    assert_eq!(ghost.backend.as_ref(), Some(&logging_backend));
    let shell = &meta.package_installations[1];
    assert!(shell.used_existing);
    assert!(shell.backend.is_none());
    assert_eq!(std::fs::read_to_string(&install_log).unwrap(), "install\n");

    manager.remove(&registry, &ctx, &names(&["dummy"])).unwrap();
    // Only the engine-installed package was uninstalled, exactly once.
    assert_eq!(
        std::fs::read_to_string(&uninstall_log).unwrap(),
        "uninstall\n"
    );
}

#[test]
fn removal_uninstalls_cloned_repos() {
    let bench = TestBench::new();
    let origin = bench.init_origin("origin");
    let clone_path = bench.scratch("clone");

    let module = Module::new("dummy").gitrepo(GitRepoRequirement::new(
        origin.to_str().unwrap(),
        &clone_path,
    ));
    let registry = registry_of(vec![module]);

    let ctx = bench.context();
    let mut manager = EquipmentManager::new();
    manager.sync(&registry, &ctx, &names(&["dummy"])).unwrap();
    assert!(!manager.meta["dummy"].gitrepo_installations[0].used_existing);
    assert!(clone_path.is_dir());

    manager.remove(&registry, &ctx, &names(&["dummy"])).unwrap();
    assert!(!clone_path.exists());
}
