pub mod refactor;
pub mod version;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;

/// Environment variable naming the workspace root when `--root` is absent.
pub const ROOT_ENV: &str = "INFRA_ROOT";

/// Resolve the workspace root: `--root`, then `INFRA_ROOT`, then the
/// current directory.
///
/// The result is canonicalized without the `\\?\` prefix on Windows.
///
/// # Errors
///
/// Returns an error if the directory does not exist or the current
/// directory cannot be determined.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    let root = match &global.root {
        Some(root) => root.clone(),
        None => match std::env::var_os(ROOT_ENV) {
            Some(root) => PathBuf::from(root),
            None => std::env::current_dir().context("cannot determine current directory")?,
        },
    };
    dunce::canonicalize(&root)
        .with_context(|| format!("workspace root {} does not exist", root.display()))
}
