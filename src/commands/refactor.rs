//! Command: detect and apply resource relocations.
//!
//! Every input is validated before any state is read. Per-environment
//! problems are recorded in the run summary; the command fails only on
//! invalid configuration or when at least one environment failed.
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, RefactorOpts};
use crate::config::Config;
use crate::config::exclude::InMemoryExcludeList;
use crate::config::mapping_file;
use crate::config::selector::StackSelector;
use crate::error::{ConfigError, EnvironmentError, InfraError};
use crate::logging::{EnvironmentStatus, Logger};
use crate::model::MappingGroup;
use crate::provider::workspace::Workspace;
use crate::refactor::{
    self, ApplyStatus, Context, EnvironmentOutcome, EnvironmentPlan, MappingSource, report,
};

/// Name of the unstable feature gating this command.
pub const FEATURE: &str = "refactor";

/// Validated inputs of one invocation.
#[derive(Debug)]
struct Request {
    config: Config,
    selector: StackSelector,
    source: MappingSource,
    concurrency: usize,
}

impl Request {
    /// Check every input without touching deployed or desired state.
    fn validate(root: &Path, opts: &RefactorOpts, log: &Logger) -> Result<Self, ConfigError> {
        if !opts.unstable.iter().any(|f| f == FEATURE) {
            return Err(ConfigError::FeatureNotEnabled(FEATURE.to_string()));
        }
        let config = Config::load(root)?;
        let selector = StackSelector::new(&opts.patterns)?;
        let concurrency = match opts.concurrency {
            Some(0) => return Err(ConfigError::InvalidConcurrency),
            Some(n) => n,
            None => config.refactor.concurrency,
        };

        let mut entries = config.refactor.exclude.clone();
        if let Some(path) = &opts.exclude_file {
            entries.extend(InMemoryExcludeList::read_file(path)?);
        }
        let exclude = InMemoryExcludeList::parse(&entries)?;

        let source = match (&opts.mapping_file, opts.revert) {
            (None, true) => return Err(ConfigError::RevertWithoutMapping),
            (None, false) => MappingSource::auto(exclude),
            (Some(path), revert) => {
                let groups = mapping_file::load(path)?;
                if !exclude.is_empty() {
                    log.warn("exclude list is ignored when a mapping file is given");
                }
                if revert {
                    MappingSource::reverse(&groups)
                } else {
                    MappingSource::explicit(groups)
                }
            }
        };

        Ok(Self {
            config,
            selector,
            source,
            concurrency,
        })
    }
}

/// Run the refactor command against the workspace on disk.
///
/// Reports are written to `out`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the environments
/// cannot be enumerated, or one or more environments failed.
pub fn run(
    global: &GlobalOpts,
    opts: &RefactorOpts,
    log: &Arc<Logger>,
    interrupted: Arc<AtomicBool>,
    out: &mut dyn Write,
) -> Result<()> {
    let root = super::resolve_root(global)?;
    log.debug(&format!("workspace root: {}", root.display()));

    log.stage("Loading configuration");
    let request = Request::validate(&root, opts, log).map_err(InfraError::from)?;
    log.debug(&format!(
        "stack patterns: {:?}, concurrency: {}",
        request.selector.patterns(),
        request.concurrency
    ));

    let workspace = Arc::new(Workspace::from_config(&request.config));
    let ctx = Context::new(workspace.clone(), workspace, Arc::clone(log))
        .with_selector(request.selector)
        .with_concurrency(request.concurrency)
        .with_interrupt_flag(interrupted);

    execute(&ctx, &request.source, opts, out)
}

/// Plan, report and (unless dry-running) apply with an already built
/// context.
///
/// # Errors
///
/// Returns an error if the environments cannot be enumerated, a report or
/// record file cannot be written, or one or more environments failed.
pub fn execute(
    ctx: &Context,
    source: &MappingSource,
    opts: &RefactorOpts,
    out: &mut dyn Write,
) -> Result<()> {
    ctx.log.stage("Resolving environments");
    let environments = ctx
        .environments()
        .context("failed to enumerate environments")?;
    ctx.log
        .info(&format!("{} environment(s) in scope", environments.len()));

    let plans = refactor::compute_mapping(ctx, &environments, source);
    report::write_ambiguities(out, &plans).context("failed to write report")?;
    report::write_mappings(out, &plans).context("failed to write report")?;

    let groups: Vec<MappingGroup> = plans.iter().filter_map(|p| p.group().cloned()).collect();
    let outcomes = refactor::apply(ctx, &groups, opts.dry_run);

    if let Some(path) = &opts.record_file {
        let recorded: Vec<MappingGroup> = groups
            .iter()
            .zip(&outcomes)
            .filter(|(_, o)| matches!(o.status, ApplyStatus::Applied(_) | ApplyStatus::DryRun(_)))
            .map(|(g, _)| g.clone())
            .collect();
        mapping_file::save(path, &recorded).map_err(InfraError::from)?;
        ctx.log
            .info(&format!("recorded mappings to {}", path.display()));
    }

    record_statuses(&ctx.log, plans, outcomes);
    ctx.log.print_summary();

    let count = ctx.log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} environment(s) failed");
    }
    Ok(())
}

/// Record one summary entry per environment, in environment order.
fn record_statuses(log: &Logger, plans: Vec<EnvironmentPlan>, outcomes: Vec<EnvironmentOutcome>) {
    let mut outcomes = outcomes.into_iter();
    for plan in plans {
        let name = plan.environment.to_string();
        match plan.result {
            Err(EnvironmentError::Unavailable { reason, .. }) => {
                log.record_environment(&name, EnvironmentStatus::Skipped, Some(&reason));
            }
            Err(e) => {
                log.record_environment(&name, EnvironmentStatus::Failed, Some(&e.to_string()));
            }
            Ok(_) => {
                let Some(outcome) = outcomes.next() else {
                    continue;
                };
                let (status, message) = match outcome.status {
                    ApplyStatus::Applied(n) => (EnvironmentStatus::Applied, Some(moved(n, "moved"))),
                    ApplyStatus::DryRun(n) => (EnvironmentStatus::DryRun, Some(moved(n, "to move"))),
                    ApplyStatus::NothingToRefactor => (EnvironmentStatus::NothingToRefactor, None),
                    ApplyStatus::Failed(e) => (EnvironmentStatus::Failed, Some(e.to_string())),
                };
                log.record_environment(&name, status, message.as_deref());
            }
        }
    }
}

fn moved(count: usize, verb: &str) -> String {
    if count == 1 {
        format!("1 resource {verb}")
    } else {
        format!("{count} resources {verb}")
    }
}
