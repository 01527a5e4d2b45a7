//! Filesystem-backed state provider and mutate transport.
//!
//! Layout under the workspace root:
//!
//! ```text
//! assembly/*.json                        desired stacks (any environment)
//! deployed/<account>/<region>/*.json     deployed stacks of one environment
//! ```
//!
//! A missing `deployed/<account>/<region>` directory means the environment
//! was never bootstrapped.
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tempfile::NamedTempFile;

use super::{MutateTransport, StateProvider};
use crate::config::Config;
use crate::config::selector::StackSelector;
use crate::error::{ApplyError, EnvironmentError};
use crate::model::template::{StackArtifact, Template, rename_references};
use crate::model::{Environment, ResourceMapping, StateSnapshot};

/// A directory of desired and deployed stack artifacts.
#[derive(Debug, Clone)]
pub struct Workspace {
    assembly_dir: PathBuf,
    deployed_dir: PathBuf,
}

impl Workspace {
    /// Create a workspace over the given directories.
    #[must_use]
    pub const fn new(assembly_dir: PathBuf, deployed_dir: PathBuf) -> Self {
        Self {
            assembly_dir,
            deployed_dir,
        }
    }

    /// Create a workspace over the directories named in `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.assembly_dir(), config.deployed_dir())
    }

    /// Directory holding the deployed stacks of `environment`.
    #[must_use]
    pub fn environment_dir(&self, environment: &Environment) -> PathBuf {
        self.deployed_dir
            .join(&environment.account)
            .join(&environment.region)
    }

    fn deployed_artifacts(
        &self,
        environment: &Environment,
    ) -> Result<Vec<(PathBuf, StackArtifact)>, EnvironmentError> {
        let dir = self.environment_dir(environment);
        if !dir.is_dir() {
            return Err(EnvironmentError::Unavailable {
                environment: environment.to_string(),
                reason: format!("not bootstrapped ({} does not exist)", dir.display()),
            });
        }
        let artifacts = read_artifacts(&dir).map_err(|e| invalid(environment, &e))?;
        if let Some((path, stray)) = artifacts
            .iter()
            .find(|(_, a)| &a.environment != environment)
        {
            return Err(invalid(
                environment,
                &anyhow::anyhow!(
                    "{} declares environment {}",
                    path.display(),
                    stray.environment
                ),
            ));
        }
        Ok(artifacts)
    }
}

impl StateProvider for Workspace {
    fn environments(&self) -> Result<Vec<Environment>> {
        let envs: BTreeSet<Environment> = read_artifacts(&self.assembly_dir)?
            .into_iter()
            .map(|(_, a)| a.environment)
            .collect();
        Ok(envs.into_iter().collect())
    }

    fn read_deployed(&self, environment: &Environment) -> Result<StateSnapshot, EnvironmentError> {
        let stacks: Vec<StackArtifact> = self
            .deployed_artifacts(environment)?
            .into_iter()
            .map(|(_, a)| a)
            .collect();
        StateSnapshot::from_stacks(environment, &stacks)
    }

    fn read_local(
        &self,
        environment: &Environment,
        filter: &StackSelector,
    ) -> Result<StateSnapshot, EnvironmentError> {
        let stacks: Vec<StackArtifact> = read_artifacts(&self.assembly_dir)
            .map_err(|e| invalid(environment, &e))?
            .into_iter()
            .map(|(_, a)| a)
            .filter(|a| &a.environment == environment && filter.matches(&a.stack_name))
            .collect();
        StateSnapshot::from_stacks(environment, &stacks)
    }
}

impl MutateTransport for Workspace {
    fn apply_mapping(
        &self,
        environment: &Environment,
        mappings: &[ResourceMapping],
    ) -> Result<(), ApplyError> {
        let rejected = |reason: String| ApplyError::Rejected {
            environment: environment.to_string(),
            reason,
        };
        let env_dir = self.environment_dir(environment);
        let mut stacks: BTreeMap<String, (PathBuf, StackArtifact)> = self
            .deployed_artifacts(environment)
            .map_err(|e| rejected(e.to_string()))?
            .into_iter()
            .map(|(path, a)| (a.stack_name.clone(), (path, a)))
            .collect();

        validate(&stacks, mappings).map_err(rejected)?;
        let originals: BTreeMap<PathBuf, StackArtifact> = stacks.values().cloned().collect();

        // Point every reference to a moving resource at a placeholder while
        // the whole batch is still in place, so resources that move together
        // keep referring to each other.
        let mut touched = BTreeSet::new();
        for (index, mapping) in mappings.iter().enumerate() {
            if let Some((_, stack)) = stacks.get_mut(&mapping.source.stack_name) {
                rename_references(
                    &mut stack.template,
                    &mapping.source.logical_id,
                    &placeholder(index),
                );
            }
            touched.insert(mapping.source.stack_name.clone());
            touched.insert(mapping.destination.stack_name.clone());
        }

        // Detach every source before attaching any destination so that
        // swaps and chains within one batch resolve correctly.
        let mut detached = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            let Some((_, stack)) = stacks.get_mut(&mapping.source.stack_name) else {
                continue;
            };
            let resource = stack
                .template
                .resources
                .remove(&mapping.source.logical_id);
            let physical_id = stack.physical_ids.remove(&mapping.source.logical_id);
            detached.push((mapping, resource, physical_id));
        }

        for (mapping, resource, physical_id) in detached {
            let (_, stack) = stacks
                .entry(mapping.destination.stack_name.clone())
                .or_insert_with(|| {
                    (
                        env_dir.join(format!("{}.json", mapping.destination.stack_name)),
                        StackArtifact {
                            stack_name: mapping.destination.stack_name.clone(),
                            environment: environment.clone(),
                            template: Template::default(),
                            physical_ids: BTreeMap::new(),
                        },
                    )
                });
            let logical_id = &mapping.destination.logical_id;
            if let Some(resource) = resource {
                stack.template.resources.insert(logical_id.clone(), resource);
            }
            if let Some(physical_id) = physical_id {
                stack.physical_ids.insert(logical_id.clone(), physical_id);
            }
        }

        // Resolve placeholders once everything has landed: to the new id in
        // the destination stack, back to the old id anywhere else.
        for (index, mapping) in mappings.iter().enumerate() {
            for name in &touched {
                if let Some((_, stack)) = stacks.get_mut(name) {
                    let target = if *name == mapping.destination.stack_name {
                        &mapping.destination.logical_id
                    } else {
                        &mapping.source.logical_id
                    };
                    rename_references(&mut stack.template, &placeholder(index), target);
                }
            }
        }

        // Serialize and stage everything before the first rename.
        let mut staged = Vec::with_capacity(touched.len());
        for name in &touched {
            if let Some((path, artifact)) = stacks.get(name) {
                let body = serde_json::to_string_pretty(artifact)
                    .map_err(|e| rejected(format!("cannot serialize stack {name}: {e}")))?;
                staged.push((path.clone(), stage(&env_dir, path, &body)?));
            }
        }

        let mut committed = Vec::with_capacity(staged.len());
        for (path, file) in staged {
            if let Err(e) = file.persist(&path) {
                restore(&env_dir, &committed, &originals);
                return Err(ApplyError::Io {
                    path: path.display().to_string(),
                    source: e.error,
                });
            }
            committed.push(path);
        }
        Ok(())
    }
}

/// Check every source is deployed and no destination is occupied by a
/// resource that stays put.
fn validate(
    stacks: &BTreeMap<String, (PathBuf, StackArtifact)>,
    mappings: &[ResourceMapping],
) -> Result<(), String> {
    let exists = |stack: &str, id: &str| {
        stacks
            .get(stack)
            .is_some_and(|(_, a)| a.template.resources.contains_key(id))
    };
    let vacated: BTreeSet<_> = mappings.iter().map(|m| &m.source).collect();
    for m in mappings {
        if !exists(&m.source.stack_name, &m.source.logical_id) {
            return Err(format!("{} is not deployed", m.source));
        }
        if exists(&m.destination.stack_name, &m.destination.logical_id)
            && !vacated.contains(&m.destination)
        {
            return Err(format!("{} is already occupied", m.destination));
        }
    }
    Ok(())
}

/// A reference target that can never collide with a real logical id.
fn placeholder(index: usize) -> String {
    format!("#move{index}")
}

/// Write `body` to a temporary file next to `path`, ready to be renamed
/// into place.
fn stage(dir: &Path, path: &Path, body: &str) -> Result<NamedTempFile, ApplyError> {
    let io_err = |source: std::io::Error| ApplyError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
    file.write_all(body.as_bytes()).map_err(io_err)?;
    file.write_all(b"\n").map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(file)
}

/// Best-effort rollback of stack files already renamed into place: put the
/// original document back, or remove a stack file the batch created.
fn restore(dir: &Path, committed: &[PathBuf], originals: &BTreeMap<PathBuf, StackArtifact>) {
    for path in committed {
        match originals.get(path) {
            Some(artifact) => {
                let staged = serde_json::to_string_pretty(artifact)
                    .ok()
                    .and_then(|body| stage(dir, path, &body).ok());
                if let Some(file) = staged {
                    file.persist(path).ok();
                }
            }
            None => {
                std::fs::remove_file(path).ok();
            }
        }
    }
}

/// Read every `*.json` artifact directly inside `dir`, sorted by path.
fn read_artifacts(dir: &Path) -> Result<Vec<(PathBuf, StackArtifact)>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let artifact: StackArtifact = serde_json::from_str(&content)
                .with_context(|| format!("cannot parse {}", path.display()))?;
            Ok((path, artifact))
        })
        .collect()
}

fn invalid(environment: &Environment, error: &anyhow::Error) -> EnvironmentError {
    EnvironmentError::InvalidSnapshot {
        environment: environment.to_string(),
        message: format!("{error:#}"),
    }
}
