pub mod compare;
pub mod context;
pub mod index;

use std::path::Path;

use anyhow::Context;
use clap::Subcommand;

use daa_core::config::DaaConfig;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the scope index of a package directory
    Index(index::IndexArgs),
    /// Resolve the enclosing context of one source line
    Context(context::ContextArgs),
    /// Compare two revisions' findings and decide which were resolved
    Compare(compare::CompareArgs),
}

pub fn run(cmd: Command, quiet: bool) -> anyhow::Result<()> {
    match cmd {
        Command::Index(args) => index::run(&args),
        Command::Context(args) => context::run(&args),
        Command::Compare(args) => compare::run(&args, quiet),
    }
}

/// Load `--config` when given, else `.daa.toml` from `package_root` or defaults.
pub(crate) fn load_config(explicit: Option<&Path>, package_root: &Path) -> anyhow::Result<DaaConfig> {
    match explicit {
        Some(path) => DaaConfig::load(path)
            .with_context(|| format!("Cannot load config: {}", path.display())),
        None => DaaConfig::load_or_default(package_root)
            .with_context(|| format!("Cannot load config from {}", package_root.display())),
    }
}

pub(crate) fn resolve_path(path: &Path) -> anyhow::Result<std::path::PathBuf> {
    std::fs::canonicalize(path).with_context(|| format!("Cannot resolve path: {}", path.display()))
}
