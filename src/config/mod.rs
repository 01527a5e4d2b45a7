//! Workspace configuration: `infra.toml`, exclude lists, stack selectors and
//! explicit mapping files.
pub mod exclude;
pub mod mapping_file;
pub mod selector;
pub mod toml_loader;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Name of the optional configuration file at the workspace root.
pub const CONFIG_FILE: &str = "infra.toml";

/// All loaded configuration for a workspace.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace root directory.
    pub root: PathBuf,
    /// Settings for the `refactor` command.
    pub refactor: RefactorSettings,
}

/// The `[refactor]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefactorSettings {
    /// Bounded pool size for reads and applies.
    pub concurrency: usize,
    /// `Stack.LogicalId` entries excluded from automatic matching.
    pub exclude: Vec<String>,
    /// Directory of desired stack artifacts, relative to the root.
    pub assembly: PathBuf,
    /// Directory of deployed state, relative to the root.
    pub deployed: PathBuf,
}

impl Default for RefactorSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            exclude: Vec::new(),
            assembly: PathBuf::from("assembly"),
            deployed: PathBuf::from("deployed"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    refactor: RefactorSettings,
}

impl Config {
    /// Load `infra.toml` from `root`, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if it sets
    /// `concurrency = 0`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml_loader::load_config(&root.join(CONFIG_FILE))?;
        if file.refactor.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        Ok(Self {
            root: root.to_path_buf(),
            refactor: file.refactor,
        })
    }

    /// Absolute path of the desired-state directory.
    #[must_use]
    pub fn assembly_dir(&self) -> PathBuf {
        self.root.join(&self.refactor.assembly)
    }

    /// Absolute path of the deployed-state directory.
    #[must_use]
    pub fn deployed_dir(&self) -> PathBuf {
        self.root.join(&self.refactor.deployed)
    }
}
