//! Where a mapping comes from: the matcher, the caller, or the inverse of
//! what the caller supplied.
use crate::config::exclude::{ExcludePolicy, NeverExclude};
use crate::config::selector::StackSelector;
use crate::error::EnvironmentError;
use crate::model::{Environment, MappingGroup, StateSnapshot};

use super::matcher::{self, MatchOutcome};

/// How the mapping for each environment is obtained.
#[derive(Debug)]
pub enum MappingSource {
    /// Computed by the matcher, withholding locations the policy excludes.
    Auto(Box<dyn ExcludePolicy>),
    /// Supplied verbatim by the caller.
    Explicit(Vec<MappingGroup>),
    /// The structural inverse of caller-supplied groups, already flipped.
    Reverse(Vec<MappingGroup>),
}

impl MappingSource {
    /// Automatic matching with `exclude` applied to both candidate pools.
    #[must_use]
    pub fn auto(exclude: impl ExcludePolicy + 'static) -> Self {
        Self::Auto(Box::new(exclude))
    }

    /// Caller-supplied groups.
    #[must_use]
    pub const fn explicit(groups: Vec<MappingGroup>) -> Self {
        Self::Explicit(groups)
    }

    /// Undo `groups`: every mapping flips, environments stay.
    ///
    /// # Examples
    ///
    /// ```
    /// use infra_cli::model::{Environment, MappingGroup, ResourceMapping};
    /// use infra_cli::refactor::MappingSource;
    ///
    /// let env = Environment::new("111111111111", "us-east-1");
    /// let group = MappingGroup::new(
    ///     env,
    ///     vec![ResourceMapping::new("a.Old".parse()?, "a.New".parse()?)],
    /// )?;
    /// let undo = MappingSource::reverse(std::slice::from_ref(&group));
    /// let redo = MappingSource::reverse(undo.groups().unwrap_or_default());
    /// assert_eq!(redo.groups(), Some(std::slice::from_ref(&group)));
    /// # Ok::<(), infra_cli::error::ConfigError>(())
    /// ```
    #[must_use]
    pub fn reverse(groups: &[MappingGroup]) -> Self {
        Self::Reverse(groups.iter().map(MappingGroup::reversed).collect())
    }

    /// The groups an explicit or reversed source will apply, `None` for
    /// automatic matching.
    #[must_use]
    pub fn groups(&self) -> Option<&[MappingGroup]> {
        match self {
            Self::Auto(_) => None,
            Self::Explicit(groups) | Self::Reverse(groups) => Some(groups),
        }
    }

    /// The exclude policy in effect. Caller-supplied groups exclude nothing.
    #[must_use]
    pub fn exclude_policy(&self) -> &dyn ExcludePolicy {
        match self {
            Self::Auto(policy) => policy.as_ref(),
            Self::Explicit(_) | Self::Reverse(_) => &NeverExclude,
        }
    }

    /// Resolve the mapping for `environment`.
    ///
    /// `deployed` is the full deployed snapshot and `local` the desired one,
    /// already restricted to `selector`. Automatic matching only sees
    /// selected stacks. Supplied mappings touching an unselected stack are
    /// dropped, and mappings that have already converged (source gone,
    /// destination present) are dropped too, so re-running an applied
    /// mapping is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::UnknownSource`] when neither end of a
    /// supplied mapping exists, and [`EnvironmentError::DestinationOccupied`]
    /// when both ends exist. Location alone cannot tell an applied swap
    /// from a pending one, so swaps and chains through an occupied location
    /// are refused rather than replayed.
    pub fn resolve(
        &self,
        environment: &Environment,
        deployed: &StateSnapshot,
        local: &StateSnapshot,
        selector: &StackSelector,
    ) -> Result<MatchOutcome, EnvironmentError> {
        let Some(groups) = self.groups() else {
            return Ok(matcher::compute(
                environment,
                &deployed.filtered(selector),
                local,
                self.exclude_policy(),
            ));
        };
        let Some(group) = groups.iter().find(|g| g.environment() == environment) else {
            return Ok(MatchOutcome::empty(environment.clone()));
        };

        let selected = group.mappings().iter().filter(|m| {
            selector.matches(&m.source.stack_name) && selector.matches(&m.destination.stack_name)
        });
        let mut pending = Vec::new();
        for mapping in selected {
            let has_source = deployed.contains(&mapping.source);
            let has_destination = deployed.contains(&mapping.destination);
            match (has_source, has_destination) {
                (true, false) => pending.push(mapping.clone()),
                (false, true) => {}
                (false, false) => {
                    return Err(EnvironmentError::UnknownSource {
                        environment: environment.to_string(),
                        location: mapping.source.to_string(),
                    });
                }
                (true, true) => {
                    return Err(EnvironmentError::DestinationOccupied {
                        environment: environment.to_string(),
                        source_location: mapping.source.to_string(),
                        destination: mapping.destination.to_string(),
                    });
                }
            }
        }

        Ok(MatchOutcome {
            group: MappingGroup::from_injective(environment.clone(), pending),
            ambiguities: Vec::new(),
        })
    }
}
