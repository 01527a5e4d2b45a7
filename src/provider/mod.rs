//! Collaborator interfaces: reading state and applying moves.
//!
//! The engine only ever talks to the outside world through these two
//! traits. [`workspace::Workspace`] implements both on top of a directory
//! of stack artifacts.
pub mod workspace;

use anyhow::Result;

use crate::config::selector::StackSelector;
use crate::error::{ApplyError, EnvironmentError};
use crate::model::{Environment, ResourceMapping, StateSnapshot};

/// Source of deployed and desired snapshots.
#[cfg_attr(test, mockall::automock)]
pub trait StateProvider: Send + Sync {
    /// Every environment the desired topology targets, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the desired topology cannot be enumerated at all.
    fn environments(&self) -> Result<Vec<Environment>>;

    /// What is live in `environment`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::Unavailable`] when the environment cannot
    /// be read (e.g. it was never bootstrapped).
    fn read_deployed(&self, environment: &Environment) -> Result<StateSnapshot, EnvironmentError>;

    /// What is desired for `environment`, restricted to stacks accepted by
    /// `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidSnapshot`] when a desired stack is
    /// malformed.
    fn read_local(
        &self,
        environment: &Environment,
        filter: &StackSelector,
    ) -> Result<StateSnapshot, EnvironmentError>;
}

/// Applies resource moves to one environment.
#[cfg_attr(test, mockall::automock)]
pub trait MutateTransport: Send + Sync {
    /// Move every resource in `mappings`, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] if the environment rejected the request or the
    /// new state could not be written.
    fn apply_mapping(
        &self,
        environment: &Environment,
        mappings: &[ResourceMapping],
    ) -> Result<(), ApplyError>;
}
