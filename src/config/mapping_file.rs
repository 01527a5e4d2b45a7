//! Explicit mapping files: caller-held relocations, used for explicit
//! refactors and for reverting a previous one.
//!
//! ```json
//! {
//!   "environments": [
//!     {
//!       "account": "111111111111",
//!       "region": "us-east-1",
//!       "resources": { "basic.OldName": "basic.NewName" }
//!     }
//!   ]
//! }
//! ```
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;
use crate::model::{Environment, MappingGroup, ResourceMapping};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingFile {
    environments: Vec<EnvironmentEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnvironmentEntry {
    account: String,
    region: String,
    resources: Entries,
}

/// `resources` object entries in document order. Repeated keys are kept so
/// that [`MappingGroup::new`] can reject them.
#[derive(Debug, Default)]
struct Entries(Vec<(String, String)>);

impl Serialize for Entries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(source, destination)| (source, destination)))
    }
}

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Entries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of source to destination locations")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Entries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Parse mapping groups from JSON text.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidMappingFile`] for malformed JSON,
/// [`ConfigError::MalformedLocation`] for a bad location string,
/// [`ConfigError::DuplicateEnvironment`] if an environment is listed twice,
/// and [`ConfigError::NonInjectiveMapping`] if a source or destination
/// repeats within an environment.
pub fn parse(content: &str, origin: &str) -> Result<Vec<MappingGroup>, ConfigError> {
    let file: MappingFile =
        serde_json::from_str(content).map_err(|e| ConfigError::InvalidMappingFile {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

    let mut seen = HashSet::new();
    file.environments
        .into_iter()
        .map(|entry| {
            let environment = Environment::new(&entry.account, &entry.region);
            if !seen.insert(environment.clone()) {
                return Err(ConfigError::DuplicateEnvironment(environment.to_string()));
            }
            let mappings = entry
                .resources
                .0
                .iter()
                .map(|(source, destination)| -> Result<ResourceMapping, ConfigError> {
                    Ok(ResourceMapping::new(source.parse()?, destination.parse()?))
                })
                .collect::<Result<Vec<_>, _>>()?;
            MappingGroup::new(environment, mappings)
        })
        .collect()
}

/// Read and parse a mapping file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
/// errors of [`parse`].
pub fn load(path: &Path) -> Result<Vec<MappingGroup>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&content, &path.display().to_string())
}

/// Render non-empty groups in mapping-file format.
#[must_use]
pub fn render(groups: &[MappingGroup]) -> String {
    let file = MappingFile {
        environments: groups
            .iter()
            .filter(|g| !g.is_empty())
            .map(|g| EnvironmentEntry {
                account: g.environment().account.clone(),
                region: g.environment().region.clone(),
                resources: Entries(
                    g.mappings()
                        .iter()
                        .map(|m| (m.source.to_string(), m.destination.to_string()))
                        .collect(),
                ),
            })
            .collect(),
    };
    // Serializing string maps cannot fail.
    serde_json::to_string_pretty(&file).unwrap_or_default()
}

/// Write non-empty groups to `path` in mapping-file format.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be written.
pub fn save(path: &Path, groups: &[MappingGroup]) -> Result<(), ConfigError> {
    std::fs::write(path, render(groups) + "\n").map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}
