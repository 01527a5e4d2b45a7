//! Automatic detection of relocated resources.
//!
//! Locations present in both snapshots are unchanged and ignored. Of the
//! rest, deployed-only locations are removal candidates and local-only
//! locations are addition candidates. Candidates are grouped by
//! `(resource type, digest)`; a group holding exactly one removal and one
//! addition, both with confident digests, becomes a mapping. Any other group
//! with candidates on both sides is ambiguous and is reported, never guessed.
use std::collections::BTreeMap;

use crate::config::exclude::ExcludePolicy;
use crate::model::digest::ResourceDigest;
use crate::model::{
    Environment, MappingGroup, ResourceLocation, ResourceMapping, StackResource, StateSnapshot,
};

/// Candidates that share a type and digest but cannot be paired uniquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousMatch {
    /// Shared resource type.
    pub resource_type: String,
    /// Shared digest.
    pub digest: ResourceDigest,
    /// Deployed-only locations in the group.
    pub removals: Vec<ResourceLocation>,
    /// Local-only locations in the group.
    pub additions: Vec<ResourceLocation>,
}

/// Result of matching one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Mappings that were established unambiguously.
    pub group: MappingGroup,
    /// Candidate groups withheld from automatic mapping.
    pub ambiguities: Vec<AmbiguousMatch>,
}

impl MatchOutcome {
    /// An outcome with nothing to move and nothing ambiguous.
    #[must_use]
    pub const fn empty(environment: Environment) -> Self {
        Self {
            group: MappingGroup::empty(environment),
            ambiguities: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Candidates<'a> {
    removals: Vec<&'a StackResource>,
    additions: Vec<&'a StackResource>,
}

/// Compute the relocations between `deployed` and `local` for `environment`.
///
/// Locations excluded by `exclude` never become candidates.
#[must_use]
pub fn compute(
    environment: &Environment,
    deployed: &StateSnapshot,
    local: &StateSnapshot,
    exclude: &dyn ExcludePolicy,
) -> MatchOutcome {
    let mut buckets: BTreeMap<(&str, &str), Candidates<'_>> = BTreeMap::new();

    for resource in deployed.resources() {
        if local.contains(&resource.location) || exclude.excludes(&resource.location) {
            continue;
        }
        buckets
            .entry(key(resource))
            .or_default()
            .removals
            .push(resource);
    }
    for resource in local.resources() {
        if deployed.contains(&resource.location) || exclude.excludes(&resource.location) {
            continue;
        }
        buckets
            .entry(key(resource))
            .or_default()
            .additions
            .push(resource);
    }

    let mut mappings = Vec::new();
    let mut ambiguities = Vec::new();
    for ((resource_type, _), candidates) in buckets {
        match (candidates.removals.as_slice(), candidates.additions.as_slice()) {
            ([], _) | (_, []) => {}
            ([removal], [addition]) if removal.digest.confident && addition.digest.confident => {
                mappings.push(ResourceMapping::new(
                    removal.location.clone(),
                    addition.location.clone(),
                ));
            }
            (removals, additions) => {
                // Prefer an unconfident digest so the report says why.
                let shared = removals
                    .iter()
                    .chain(additions)
                    .map(|r| &r.digest)
                    .min_by_key(|d| d.confident);
                if let Some(digest) = shared {
                    ambiguities.push(AmbiguousMatch {
                        resource_type: resource_type.to_string(),
                        digest: digest.clone(),
                        removals: removals.iter().map(|r| r.location.clone()).collect(),
                        additions: additions.iter().map(|r| r.location.clone()).collect(),
                    });
                }
            }
        }
    }

    MatchOutcome {
        // Every location lands in exactly one bucket and only one-to-one
        // buckets emit, so the result is injective.
        group: MappingGroup::from_injective(environment.clone(), mappings),
        ambiguities,
    }
}

fn key(resource: &StackResource) -> (&str, &str) {
    (&resource.resource_type, &resource.digest.value)
}
