//! The stack refactoring engine.
//!
//! [`compute_mapping`] reads both snapshots of every environment through the
//! [`StateProvider`] and resolves a [`MappingSource`] against them.
//! [`apply`] then hands each non-empty group to the [`MutateTransport`], or
//! only logs it in a dry run. Environments are independent: one failing
//! never stops the others, and both passes run on a bounded pool.
pub mod matcher;
mod parallel;
pub mod report;
pub mod source;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::config::selector::StackSelector;
use crate::error::{ApplyError, EnvironmentError};
use crate::logging::{Log, Logger};
use crate::model::{Environment, MappingGroup, ResourceLocation, ResourceMapping, StateSnapshot};
use crate::provider::{MutateTransport, StateProvider};

pub use matcher::{AmbiguousMatch, MatchOutcome};
pub use source::MappingSource;

/// Shared context for one refactor invocation.
pub struct Context {
    /// Reads deployed and desired snapshots.
    pub provider: Arc<dyn StateProvider>,
    /// Applies moves to an environment.
    pub transport: Arc<dyn MutateTransport>,
    /// Logger for output and per-environment status.
    pub log: Arc<Logger>,
    /// Which stacks are visible to the matcher.
    pub selector: StackSelector,
    /// Bounded pool size; `1` processes environments sequentially.
    pub concurrency: usize,
    /// Set from the Ctrl-C handler; environments not yet started are
    /// cancelled once it is raised.
    pub interrupted: Arc<AtomicBool>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("provider", &"<dyn StateProvider>")
            .field("transport", &"<dyn MutateTransport>")
            .field("log", &self.log)
            .field("selector", &self.selector)
            .field("concurrency", &self.concurrency)
            .field("interrupted", &self.interrupted)
            .finish()
    }
}

impl Context {
    /// Creates a sequential context that selects every stack.
    #[must_use]
    pub fn new(
        provider: Arc<dyn StateProvider>,
        transport: Arc<dyn MutateTransport>,
        log: Arc<Logger>,
    ) -> Self {
        Self {
            provider,
            transport,
            log,
            selector: StackSelector::all(),
            concurrency: 1,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Restrict the matcher to stacks accepted by `selector`.
    #[must_use]
    pub fn with_selector(mut self, selector: StackSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Process up to `concurrency` environments at once (at least one).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Share an interrupt flag, typically raised by a Ctrl-C handler.
    #[must_use]
    pub fn with_interrupt_flag(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = interrupted;
        self
    }

    /// Every environment the desired topology targets.
    ///
    /// # Errors
    ///
    /// Returns an error if the state provider cannot enumerate them.
    pub fn environments(&self) -> Result<Vec<Environment>> {
        self.provider.environments()
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

/// What was resolved for one environment.
#[derive(Debug)]
pub struct EnvironmentPlan {
    /// The environment.
    pub environment: Environment,
    /// The planned moves, or why the environment could not be planned.
    pub result: Result<PlannedMoves, EnvironmentError>,
}

impl EnvironmentPlan {
    /// The mapping group, if the environment could be planned.
    #[must_use]
    pub fn group(&self) -> Option<&MappingGroup> {
        self.result.as_ref().ok().map(|p| &p.outcome.group)
    }
}

/// A resolved mapping together with what the report needs to describe it.
#[derive(Debug)]
pub struct PlannedMoves {
    /// Mappings and ambiguities.
    pub outcome: MatchOutcome,
    resource_types: BTreeMap<ResourceLocation, String>,
}

impl PlannedMoves {
    /// Resource type of the resource `mapping` moves.
    #[must_use]
    pub fn resource_type(&self, mapping: &ResourceMapping) -> &str {
        self.resource_types
            .get(&mapping.source)
            .map_or("<unknown>", String::as_str)
    }
}

/// Final state of one environment after [`apply`].
#[derive(Debug)]
pub enum ApplyStatus {
    /// This many resources were moved.
    Applied(usize),
    /// This many resources would have been moved.
    DryRun(usize),
    /// The group was empty.
    NothingToRefactor,
    /// The transport failed, or the run was interrupted first.
    Failed(ApplyError),
}

/// Result of one environment.
#[derive(Debug)]
pub struct EnvironmentOutcome {
    /// The environment.
    pub environment: Environment,
    /// What happened to it.
    pub status: ApplyStatus,
}

impl EnvironmentOutcome {
    /// Whether this environment failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.status, ApplyStatus::Failed(_))
    }
}

/// Resolve `source` for every environment in `environments`.
///
/// Supplied groups naming an environment outside `environments` are ignored
/// with a warning. Per-environment failures are returned in the plan, never
/// raised.
#[must_use]
pub fn compute_mapping(
    ctx: &Context,
    environments: &[Environment],
    source: &MappingSource,
) -> Vec<EnvironmentPlan> {
    if let Some(groups) = source.groups() {
        for group in groups {
            if !environments.contains(group.environment()) {
                ctx.log.warn(&format!(
                    "ignoring mappings for {}: not part of this workspace",
                    group.environment()
                ));
            }
        }
    }
    parallel::run_bounded(ctx.concurrency, &ctx.log, environments, |environment, log| {
        let result = plan_environment(ctx, environment, source, log);
        match &result {
            Ok(planned) => log.debug(&format!(
                "{environment}: {} mapping(s), {} ambiguous group(s)",
                planned.outcome.group.mappings().len(),
                planned.outcome.ambiguities.len()
            )),
            Err(e) => log.warn(&e.to_string()),
        }
        EnvironmentPlan {
            environment: environment.clone(),
            result,
        }
    })
}

fn plan_environment(
    ctx: &Context,
    environment: &Environment,
    source: &MappingSource,
    log: &dyn Log,
) -> Result<PlannedMoves, EnvironmentError> {
    log.stage(&format!("Reading {environment}"));
    let deployed = ctx.provider.read_deployed(environment)?;
    let local = ctx.provider.read_local(environment, &ctx.selector)?;
    log.debug(&format!(
        "{} deployed, {} desired resource(s)",
        deployed.len(),
        local.len()
    ));
    let outcome = source.resolve(environment, &deployed, &local, &ctx.selector)?;
    Ok(PlannedMoves {
        resource_types: resource_types(&outcome.group, &deployed),
        outcome,
    })
}

fn resource_types(
    group: &MappingGroup,
    deployed: &StateSnapshot,
) -> BTreeMap<ResourceLocation, String> {
    group
        .mappings()
        .iter()
        .filter_map(|m| {
            deployed
                .get(&m.source)
                .map(|r| (m.source.clone(), r.resource_type.clone()))
        })
        .collect()
}

/// Apply every group, or only log it when `dry_run` is set.
///
/// Each environment gets at most one transport call. Failures are recorded
/// per environment and do not stop the remaining ones.
#[must_use]
pub fn apply(ctx: &Context, groups: &[MappingGroup], dry_run: bool) -> Vec<EnvironmentOutcome> {
    parallel::run_bounded(ctx.concurrency, &ctx.log, groups, |group, log| {
        EnvironmentOutcome {
            environment: group.environment().clone(),
            status: apply_group(ctx, group, dry_run, log),
        }
    })
}

fn apply_group(ctx: &Context, group: &MappingGroup, dry_run: bool, log: &dyn Log) -> ApplyStatus {
    let environment = group.environment();
    let count = group.mappings().len();
    if group.is_empty() {
        log.debug(&format!("{environment}: nothing to refactor"));
        return ApplyStatus::NothingToRefactor;
    }
    if dry_run {
        for m in group.mappings() {
            log.dry_run(&format!("{environment}: would move {} to {}", m.source, m.destination));
        }
        return ApplyStatus::DryRun(count);
    }
    if ctx.is_interrupted() {
        let e = ApplyError::Cancelled(environment.to_string());
        log.warn(&e.to_string());
        return ApplyStatus::Failed(e);
    }

    log.stage(&format!("Refactoring {environment}"));
    match ctx.transport.apply_mapping(environment, group.mappings()) {
        Ok(()) => {
            for m in group.mappings() {
                log.info(&format!("moved {} to {}", m.source, m.destination));
            }
            ApplyStatus::Applied(count)
        }
        Err(e) => {
            log.error(&e.to_string());
            ApplyStatus::Failed(e)
        }
    }
}
