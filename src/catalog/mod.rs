//! catalog
//!
//! The built-in module catalog.
//!
//! Modules are plain data consumed by the engine: each bundles the packages,
//! git repos and undoable commands that equip one tool, plus the modules it
//! depends on. The binary registers this catalog at startup; the engine
//! itself never depends on it.

use crate::core::paths;
use crate::core::platform::Platform;
use crate::core::spec::PackageSpec;
use crate::pkg::{PackageBackend, PlatformBackends};
use crate::registry::{Module, ModuleRegistry, RegistryError};
use crate::requirements::{system_package, GitRepoRequirement, PackageRequirement};
use crate::undoable::{AppendLine, BackupMv, ChSh, Mkdir, SafeMove, Symlink};

const SOURCE_PATH: &str = "src/catalog/mod.rs";

/// Build and validate the registry over the built-in catalog.
pub fn registry() -> Result<ModuleRegistry, RegistryError> {
    let mut registry = ModuleRegistry::new();
    registry.register(rust())?;
    registry.register(zsh())?;
    registry.register(tmux())?;
    registry.register(vim())?;
    registry.register(fzf())?;
    registry.register(starship())?;
    registry.validate()?;
    Ok(registry)
}

fn rust() -> Module {
    let rustup = PackageRequirement::new(
        PackageSpec::new("rustup"),
        "rustup",
        vec![PlatformBackends::new(
            Platform::Linux,
            vec![PackageBackend::CurlSh {
                install_cmd: "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh"
                    .to_string(),
                uninstall_cmd: "rustup self uninstall".to_string(),
                update_cmd: Some("rustup update".to_string()),
            }],
        )],
    );

    Module::new("rust").package(rustup).defined_in(SOURCE_PATH)
}

fn zsh() -> Module {
    Module::new("zsh")
        .package(system_package("zsh", "zsh"))
        .gitrepo(GitRepoRequirement::new(
            "https://github.com/zplug/zplug.git",
            paths::xdg_config_path("zplug"),
        ))
        // use zsh as the default shell
        .command(ChSh::new("zsh"))
        // prefer zplug in XDG_CONFIG_HOME instead of ~/.zplug
        .command(BackupMv::new(paths::user_home_path(".zplug")))
        .command(AppendLine::source_line(
            paths::user_home_path(".zshrc"),
            ".*common-shrc",
            paths::project_path_relhome("common-shrc"),
        ))
        .command(AppendLine::source_line(
            paths::user_home_path(".zshrc"),
            ".*common-zshrc",
            paths::project_path_relhome("common-zshrc"),
        ))
        .defined_in(SOURCE_PATH)
}

fn tmux() -> Module {
    Module::new("tmux")
        .package(system_package("tmux", "tmux"))
        // the oh-my-tmux framework
        .gitrepo(GitRepoRequirement::new(
            "https://github.com/gpakosz/.tmux.git",
            paths::xdg_config_path("oh-my-tmux"),
        ))
        .command(Mkdir::new(paths::xdg_config_path("tmux")))
        .command(Symlink::new(
            paths::xdg_config_path("oh-my-tmux/.tmux.conf"),
            paths::xdg_config_path("tmux/tmux.conf"),
        ))
        .command(Symlink::new(
            paths::dot_config_path("tmux/tmux.conf.local"),
            paths::xdg_config_path("tmux/tmux.conf.local"),
        ))
        .defined_in(SOURCE_PATH)
}

fn vim() -> Module {
    Module::new("vim")
        .requires(["rust"])
        .command(Mkdir::new(paths::xdg_config_path("vim")))
        .command(SafeMove::home_to_xdg_config(".vimrc", "vim/vimrc"))
        .command(SafeMove::home_to_xdg_config(".viminfo", "vim/viminfo"))
        .command(AppendLine::source_line(
            paths::xdg_config_path("vim/vimrc"),
            ".*common-vimrc",
            paths::project_path_relhome("common-vimrc"),
        ))
        .defined_in(SOURCE_PATH)
}

fn fzf() -> Module {
    Module::new("fzf")
        .package(system_package("fzf", "fzf"))
        .command(SafeMove::home_to_xdg_config(".fzf.bash", "fzf.bash"))
        .command(SafeMove::home_to_xdg_config(".fzf.zsh", "fzf.zsh"))
        .command(AppendLine::source_line(
            paths::user_home_path(".bashrc"),
            r"\-f.*fzf\.bash",
            paths::xdg_config_path_relhome("fzf.bash"),
        ))
        .command(AppendLine::source_line(
            paths::user_home_path(".zshrc"),
            r"\-f.*fzf\.zsh",
            paths::xdg_config_path_relhome("fzf.zsh"),
        ))
        .defined_in(SOURCE_PATH)
}

fn starship() -> Module {
    let starship = PackageRequirement::new(
        PackageSpec::new("starship"),
        "starship",
        vec![
            PlatformBackends::new(Platform::Any, vec![PackageBackend::Cargo]),
            PlatformBackends::new(
                Platform::Linux,
                vec![PackageBackend::CurlSh {
                    install_cmd: "curl --proto '=https' --tlsv1.2 -sSf https://starship.rs/install.sh | sh"
                        .to_string(),
                    uninstall_cmd: "sh -c 'rm \"$(command -v starship)\"'".to_string(),
                    update_cmd: None,
                }],
            ),
        ],
    );

    Module::new("starship").package(starship).defined_in(SOURCE_PATH)
}
