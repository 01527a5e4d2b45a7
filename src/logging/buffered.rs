//! Per-environment log buffer for work running on the bounded pool.
use std::sync::{Arc, Mutex, PoisonError};

use super::logger::Logger;
use super::types::{EnvironmentStatus, Log};

/// Which [`Log`] method captured a line.
#[derive(Debug, Clone, Copy)]
enum Line {
    Stage,
    Info,
    Debug,
    Warn,
    Error,
    DryRun,
}

impl Line {
    fn emit(self, msg: &str) {
        match self {
            Self::Stage => tracing::info!(target: "infra::stage", "{msg}"),
            Self::Info => tracing::info!("{msg}"),
            Self::Debug => tracing::debug!("{msg}"),
            Self::Warn => tracing::warn!("{msg}"),
            Self::Error => tracing::error!("{msg}"),
            Self::DryRun => tracing::info!(target: "infra::dry_run", "{msg}"),
        }
    }
}

/// Holds one environment's output until the environment is done.
///
/// Environments planned or applied concurrently would otherwise interleave
/// their lines. [`flush`](Self::flush) replays the captured lines as one
/// block. Summary entries bypass the buffer and go straight to the backing
/// [`Logger`].
#[derive(Debug)]
pub struct BufferedLog {
    inner: Arc<Logger>,
    lines: Mutex<Vec<(Line, String)>>,
}

impl BufferedLog {
    /// Buffer in front of `inner`.
    #[must_use]
    pub const fn new(inner: Arc<Logger>) -> Self {
        Self {
            inner,
            lines: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, line: Line, msg: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((line, msg.to_string()));
        }
    }

    /// Number of lines waiting to be replayed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lines.lock().map_or(0, |lines| lines.len())
    }

    /// Replay and drain the captured lines while holding the backing
    /// logger's flush lock.
    pub fn flush(&self) {
        let _block = self
            .inner
            .flush_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Ok(mut lines) = self.lines.lock() else {
            return;
        };
        for (line, msg) in lines.drain(..) {
            line.emit(&msg);
        }
    }
}

impl Log for BufferedLog {
    fn stage(&self, msg: &str) {
        self.push(Line::Stage, msg);
    }

    fn info(&self, msg: &str) {
        self.push(Line::Info, msg);
    }

    fn debug(&self, msg: &str) {
        self.push(Line::Debug, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(Line::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.push(Line::Error, msg);
    }

    fn dry_run(&self, msg: &str) {
        self.push(Line::DryRun, msg);
    }

    fn record_environment(&self, name: &str, status: EnvironmentStatus, message: Option<&str>) {
        self.inner.record_environment(name, status, message);
    }
}
