//! Core logging types: per-environment entries, status, and the [`Log`] trait.

/// Outcome of one environment for summary reporting.
#[derive(Debug, Clone)]
pub struct EnvironmentEntry {
    /// Environment identity, e.g. `aws://111111111111/us-east-1`.
    pub name: String,
    /// Final status of the environment.
    pub status: EnvironmentStatus,
    /// Optional detail message (e.g., move count or error description).
    pub message: Option<String>,
}

/// Final status of one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentStatus {
    /// Every mapping was applied.
    Applied,
    /// Deployed and desired state already agree.
    NothingToRefactor,
    /// Mappings were computed and reported, not applied.
    DryRun,
    /// The environment could not be read and was left alone.
    Skipped,
    /// Applying the mappings failed.
    Failed,
}

impl EnvironmentStatus {
    /// Every status, in summary order.
    pub const ALL: [Self; 5] = [
        Self::Applied,
        Self::NothingToRefactor,
        Self::DryRun,
        Self::Skipped,
        Self::Failed,
    ];

    /// Summary icon.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Applied => "✓",
            Self::NothingToRefactor => "·",
            Self::DryRun => "~",
            Self::Skipped => "○",
            Self::Failed => "✗",
        }
    }

    /// Word used in the totals line.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::NothingToRefactor => "unchanged",
            Self::DryRun => "dry-run",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    /// SGR color of the summary line.
    pub(super) const fn color(self) -> &'static str {
        match self {
            Self::Applied => "\x1b[32m",
            Self::NothingToRefactor => "\x1b[2m",
            Self::DryRun => "\x1b[37m",
            Self::Skipped => "\x1b[33m",
            Self::Failed => "\x1b[31m",
        }
    }
}

/// Abstraction over logging backends.
///
/// Both [`Logger`](super::logger::Logger) (direct output) and
/// [`BufferedLog`](super::buffered::BufferedLog) (deferred output for
/// environments processed in parallel) implement this trait, so
/// per-environment code can log without knowing whether output is immediate
/// or buffered.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record an environment's outcome for the summary.
    fn record_environment(&self, name: &str, status: EnvironmentStatus, message: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_icons_are_distinct() {
        let labels: std::collections::HashSet<_> =
            EnvironmentStatus::ALL.into_iter().map(EnvironmentStatus::label).collect();
        let icons: std::collections::HashSet<_> =
            EnvironmentStatus::ALL.into_iter().map(EnvironmentStatus::icon).collect();
        assert_eq!(labels.len(), EnvironmentStatus::ALL.len());
        assert_eq!(icons.len(), EnvironmentStatus::ALL.len());
    }

    #[test]
    fn nothing_to_refactor_reads_as_unchanged() {
        assert_eq!(EnvironmentStatus::NothingToRefactor.label(), "unchanged");
        assert_eq!(EnvironmentStatus::DryRun.label(), "dry-run");
    }
}
