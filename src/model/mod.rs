//! Data model shared by the matcher, mapping sources and the orchestrator.
pub mod digest;
pub mod template;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::selector::StackSelector;
use crate::error::{ConfigError, EnvironmentError};
use digest::{ResourceDigest, compute_digests};
use template::StackArtifact;

/// An (account, region) deployment target; the unit of isolation.
///
/// # Examples
///
/// ```
/// use infra_cli::model::Environment;
///
/// let env = Environment::new("111111111111", "us-east-1");
/// assert_eq!(env.to_string(), "aws://111111111111/us-east-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Environment {
    /// Account identifier.
    pub account: String,
    /// Region name.
    pub region: String,
}

impl Environment {
    /// Create an environment from its account and region.
    #[must_use]
    pub fn new(account: &str, region: &str) -> Self {
        Self {
            account: account.to_string(),
            region: region.to_string(),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aws://{}/{}", self.account, self.region)
    }
}

/// Where a resource sits in template space: `(stack name, logical id)`.
///
/// Parsed from and rendered as `Stack.LogicalId`.
///
/// # Examples
///
/// ```
/// use infra_cli::model::ResourceLocation;
///
/// let loc: ResourceLocation = "basic.OldName".parse().unwrap();
/// assert_eq!(loc.stack_name, "basic");
/// assert_eq!(loc.logical_id, "OldName");
/// assert!("basic".parse::<ResourceLocation>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceLocation {
    /// Name of the stack holding the resource.
    pub stack_name: String,
    /// Logical identifier inside that stack's template.
    pub logical_id: String,
}

impl ResourceLocation {
    /// Build a location without validation.
    #[must_use]
    pub fn new(stack_name: &str, logical_id: &str) -> Self {
        Self {
            stack_name: stack_name.to_string(),
            logical_id: logical_id.to_string(),
        }
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stack_name, self.logical_id)
    }
}

const MAX_STACK_NAME: usize = 128;
const MAX_LOGICAL_ID: usize = 255;

impl FromStr for ResourceLocation {
    type Err = ConfigError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| ConfigError::MalformedLocation {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };
        let (stack, logical) = entry
            .split_once('.')
            .ok_or_else(|| malformed("expected Stack.LogicalId"))?;

        let mut chars = stack.chars();
        if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
            return Err(malformed("stack name must start with a letter"));
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '-') || stack.len() > MAX_STACK_NAME {
            return Err(malformed(
                "stack name may only contain letters, digits and hyphens",
            ));
        }
        if logical.is_empty()
            || logical.len() > MAX_LOGICAL_ID
            || !logical.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(malformed("logical id must be alphanumeric"));
        }
        Ok(Self::new(stack, logical))
    }
}

/// A resource inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackResource {
    /// Where the resource sits.
    pub location: ResourceLocation,
    /// Resource type, e.g. `AWS::S3::Bucket`.
    pub resource_type: String,
    /// Provider-assigned identifier; `None` for desired resources.
    pub physical_id: Option<String>,
    /// Structural fingerprint used for matching.
    pub digest: ResourceDigest,
}

/// The full, immutable set of resources of one environment at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    resources: BTreeMap<ResourceLocation, StackResource>,
}

impl StateSnapshot {
    /// Build a snapshot from stack artifacts, computing digests per stack.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidSnapshot`] if two artifacts declare
    /// the same stack.
    pub fn from_stacks(
        environment: &Environment,
        stacks: &[StackArtifact],
    ) -> Result<Self, EnvironmentError> {
        let mut seen = HashSet::new();
        let mut resources = BTreeMap::new();
        for stack in stacks {
            if !seen.insert(stack.stack_name.as_str()) {
                return Err(EnvironmentError::InvalidSnapshot {
                    environment: environment.to_string(),
                    message: format!("stack '{}' is declared twice", stack.stack_name),
                });
            }
            let digests = compute_digests(&stack.template);
            for (logical_id, declared) in &stack.template.resources {
                let location = ResourceLocation::new(&stack.stack_name, logical_id);
                let Some(digest) = digests.get(logical_id) else {
                    continue;
                };
                resources.insert(
                    location.clone(),
                    StackResource {
                        location,
                        resource_type: declared.resource_type.clone(),
                        physical_id: stack.physical_ids.get(logical_id).cloned(),
                        digest: digest.clone(),
                    },
                );
            }
        }
        Ok(Self { resources })
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the snapshot holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Whether a resource sits at `location`.
    #[must_use]
    pub fn contains(&self, location: &ResourceLocation) -> bool {
        self.resources.contains_key(location)
    }

    /// Look up the resource at `location`.
    #[must_use]
    pub fn get(&self, location: &ResourceLocation) -> Option<&StackResource> {
        self.resources.get(location)
    }

    /// Iterate resources in location order.
    pub fn resources(&self) -> impl Iterator<Item = &StackResource> {
        self.resources.values()
    }

    /// Names of the stacks that hold at least one resource.
    #[must_use]
    pub fn stack_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .resources
            .keys()
            .map(|l| l.stack_name.as_str())
            .collect();
        names.dedup();
        names
    }

    /// A copy restricted to stacks accepted by `selector`.
    #[must_use]
    pub fn filtered(&self, selector: &StackSelector) -> Self {
        Self {
            resources: self
                .resources
                .iter()
                .filter(|(loc, _)| selector.matches(&loc.stack_name))
                .map(|(loc, r)| (loc.clone(), r.clone()))
                .collect(),
        }
    }
}

/// "The resource at `source` now lives at `destination`."
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceMapping {
    /// Current location.
    pub source: ResourceLocation,
    /// New location.
    pub destination: ResourceLocation,
}

impl ResourceMapping {
    /// Create a mapping.
    #[must_use]
    pub const fn new(source: ResourceLocation, destination: ResourceLocation) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// The same move in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self::new(self.destination.clone(), self.source.clone())
    }
}

/// The mappings for one environment.
///
/// Injective both ways: no location appears twice as a source or twice as a
/// destination. Mappings are kept sorted by source so that equality is set
/// equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingGroup {
    environment: Environment,
    mappings: Vec<ResourceMapping>,
}

impl MappingGroup {
    /// Build a group, rejecting repeated sources or destinations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonInjectiveMapping`] naming the first repeated
    /// location.
    pub fn new(
        environment: Environment,
        mappings: Vec<ResourceMapping>,
    ) -> Result<Self, ConfigError> {
        let mut sources = HashSet::new();
        let mut destinations = HashSet::new();
        for m in &mappings {
            if !sources.insert(&m.source) {
                return Err(non_injective(&environment, &m.source, "source"));
            }
            if !destinations.insert(&m.destination) {
                return Err(non_injective(&environment, &m.destination, "destination"));
            }
        }
        Ok(Self::from_injective(environment, mappings))
    }

    /// Build a group from mappings already known to be injective.
    pub(crate) fn from_injective(
        environment: Environment,
        mut mappings: Vec<ResourceMapping>,
    ) -> Self {
        mappings.sort();
        Self {
            environment,
            mappings,
        }
    }

    /// A group with no mappings.
    #[must_use]
    pub const fn empty(environment: Environment) -> Self {
        Self {
            environment,
            mappings: Vec::new(),
        }
    }

    /// The environment the mappings apply to.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The mappings, sorted by source location.
    #[must_use]
    pub fn mappings(&self) -> &[ResourceMapping] {
        &self.mappings
    }

    /// Whether there is nothing to move.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// The structural inverse: every mapping flipped, same environment.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self::from_injective(
            self.environment.clone(),
            self.mappings.iter().map(ResourceMapping::reversed).collect(),
        )
    }
}

fn non_injective(
    environment: &Environment,
    location: &ResourceLocation,
    side: &'static str,
) -> ConfigError {
    ConfigError::NonInjectiveMapping {
        environment: environment.to_string(),
        location: location.to_string(),
        side,
    }
}
