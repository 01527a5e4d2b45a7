//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{EnvironmentEntry, EnvironmentStatus, Log};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// Every message is also written to a persistent log file at
/// `$XDG_CACHE_HOME/infra/<command>.log` by the subscriber's file layer.
#[derive(Debug)]
pub struct Logger {
    environments: Mutex<Vec<EnvironmentEntry>>,
    log_file: Option<PathBuf>,
    /// Serializes console output from parallel environment flushes.
    pub(super) flush_lock: Mutex<()>,
}

impl Logger {
    /// Create a new logger for `command`.
    ///
    /// Stores the log file path for display in the run summary. The file
    /// itself is created by [`init_subscriber`](super::subscriber::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    /// Create a logger that reports `log_file` in its summary.
    #[must_use]
    pub const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            environments: Mutex::new(Vec::new()),
            log_file,
            flush_lock: Mutex::new(()),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded environment entries.
    #[must_use]
    pub fn entries(&self) -> Vec<EnvironmentEntry> {
        self.environments.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "infra::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: "infra::dry_run", "{msg}");
    }

    /// Record an environment's outcome for the summary.
    pub fn record_environment(&self, name: &str, status: EnvironmentStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.environments.lock() {
            guard.push(EnvironmentEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of failed environments.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.environments.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|e| e.status == EnvironmentStatus::Failed)
                .count()
        })
    }

    /// Print one line per recorded environment, the totals, and where the
    /// full log was written.
    pub fn print_summary(&self) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }
        self.stage("Summary");

        for entry in &entries {
            let detail = entry
                .message
                .as_deref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            self.info(&format!(
                "{}{} {}{detail}\x1b[0m",
                entry.status.color(),
                entry.status.icon(),
                entry.name
            ));
        }

        let totals: Vec<String> = EnvironmentStatus::ALL
            .iter()
            .map(|&status| {
                let count = entries.iter().filter(|e| e.status == status).count();
                format!("{}{count} {}\x1b[0m", status.color(), status.label())
            })
            .collect();
        self.info(&format!(
            "{} environments: {}",
            entries.len(),
            totals.join(", ")
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_environment(&self, name: &str, status: EnvironmentStatus, message: Option<&str>) {
        self.record_environment(name, status, message);
    }
}
