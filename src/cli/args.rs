//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! Available on all subcommands:
//! - `--dry-run`: log every mutating action instead of performing it
//! - `--strategy <ask|force|auto|quit>`: how destructive preconditions are
//!   resolved (default `quit`)
//! - `--loglevel <debug|info|warn|error|fatal>`: log verbosity

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::options::{Options, Strategy};

/// Dofu - declarative dotfiles and environment equipper
#[derive(Parser, Debug)]
#[command(name = "dofu")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Dry run mode without changing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Strategy used when meeting a destructive command
    #[arg(long, global = true, value_enum, default_value_t = Strategy::Quit)]
    pub strategy: Strategy,

    /// Log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// The engine options derived from the global flags.
    pub fn options(&self) -> Options {
        Options {
            dry_run: self.dry_run,
            strategy: self.strategy,
        }
    }
}

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// The corresponding `log` filter.
    pub fn filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            // `log` has no fatal level; both map to errors only.
            LogLevel::Error | LogLevel::Fatal => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        };
        write!(f, "{name}")
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Equip modules and everything they require
    Equip {
        /// Names of the modules to equip; empty opens a chooser
        names: Vec<String>,
    },

    /// Alias of equip
    Install {
        /// Names of the modules to install; empty opens a chooser
        names: Vec<String>,
    },

    /// Remove modules and everything depending on them
    Remove {
        /// Names of the modules to remove; empty opens a chooser
        names: Vec<String>,
    },

    /// Equip the chosen modules and remove every other equipped one
    Sync {
        /// Names of the modules to keep equipped; empty opens a chooser
        names: Vec<String>,
    },

    /// List registered modules and their equipment state
    List {
        /// Restrict the listing to these modules
        names: Vec<String>,

        /// Only show installed modules
        #[arg(long)]
        installed_only: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_quit_and_info() {
        let cli = Cli::try_parse_from(["dofu", "list"]).unwrap();
        assert!(!cli.dry_run);
        assert_eq!(cli.strategy, Strategy::Quit);
        assert_eq!(cli.loglevel, LogLevel::Info);
    }

    #[test]
    fn global_flags_apply_after_the_subcommand() {
        let cli =
            Cli::try_parse_from(["dofu", "sync", "zsh", "--dry-run", "--strategy", "auto"]).unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.strategy, Strategy::Auto);
        match cli.command {
            Command::Sync { names } => assert_eq!(names, vec!["zsh".to_string()]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["dofu", "sync", "--strategy", "yolo"]).is_err());
    }
}
