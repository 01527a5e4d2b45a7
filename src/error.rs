//! Domain-specific error types for the refactoring engine.
//!
//! Library code returns typed errors (e.g., [`ConfigError`], [`ApplyError`])
//! while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! InfraError
//! ├── Config(ConfigError)           # fatal, raised before any state is read
//! ├── Environment(EnvironmentError) # one environment skipped, others proceed
//! └── Apply(ApplyError)             # one environment failed, others proceed
//! ```

use thiserror::Error;

/// Top-level error type for the refactoring engine.
#[derive(Error, Debug)]
pub enum InfraError {
    /// Invalid configuration; nothing was read or written.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An environment could not be read or resolved.
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// An environment's mapping could not be applied.
    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),
}

/// Errors in caller-supplied configuration.
///
/// Always fatal and never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A stack selector is not a valid glob pattern.
    #[error("Invalid stack selector '{pattern}': {message}")]
    InvalidSelector {
        /// The offending pattern.
        pattern: String,
        /// Parser message.
        message: String,
    },

    /// A location string is not of the form `Stack.LogicalId`.
    #[error("Malformed resource location '{entry}': {reason}")]
    MalformedLocation {
        /// The offending entry.
        entry: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A location appears twice on the same side of a mapping.
    #[error("Location '{location}' appears more than once as a {side} in {environment}")]
    NonInjectiveMapping {
        /// Environment the group belongs to.
        environment: String,
        /// Repeated location.
        location: String,
        /// `"source"` or `"destination"`.
        side: &'static str,
    },

    /// The same environment is listed twice in a mapping file.
    #[error("Environment {0} is listed more than once")]
    DuplicateEnvironment(String),

    /// A mapping file could not be parsed.
    #[error("Invalid mapping file {path}: {message}")]
    InvalidMappingFile {
        /// Path to the file.
        path: String,
        /// Parser message.
        message: String,
    },

    /// The configuration file could not be parsed.
    #[error("Invalid configuration file {path}: {message}")]
    InvalidConfigFile {
        /// Path to the file.
        path: String,
        /// Parser message.
        message: String,
    },

    /// An unstable feature was used without opting in.
    #[error("The '{0}' command is unstable; pass --unstable={0} to use it")]
    FeatureNotEnabled(String),

    /// `--revert` was passed without a mapping to revert.
    #[error("--revert requires --mapping-file")]
    RevertWithoutMapping,

    /// The bounded pool size is zero.
    #[error("Concurrency must be at least 1")]
    InvalidConcurrency,

    /// An I/O error occurred while reading a configuration input.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that prevent a single environment from being planned.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// The state provider cannot read the environment (e.g. not bootstrapped).
    #[error("{environment} is unavailable: {reason}")]
    Unavailable {
        /// Environment identity.
        environment: String,
        /// Provider message.
        reason: String,
    },

    /// A snapshot document is malformed.
    #[error("Invalid state for {environment}: {message}")]
    InvalidSnapshot {
        /// Environment identity.
        environment: String,
        /// Parser or validation message.
        message: String,
    },

    /// An explicit mapping names a source that is not deployed.
    #[error("{location} is not deployed in {environment}")]
    UnknownSource {
        /// Environment identity.
        environment: String,
        /// Missing source location.
        location: String,
    },

    /// An explicit mapping targets a location that is already occupied.
    #[error("Cannot move {source_location} to {destination} in {environment}: destination is occupied")]
    DestinationOccupied {
        /// Environment identity.
        environment: String,
        /// Source location.
        source_location: String,
        /// Occupied destination location.
        destination: String,
    },
}

/// Errors reported by the mutate transport for one environment.
#[derive(Error, Debug)]
pub enum ApplyError {
    /// The transport rejected the request; nothing was changed.
    #[error("Refactor of {environment} rejected: {reason}")]
    Rejected {
        /// Environment identity.
        environment: String,
        /// Transport message.
        reason: String,
    },

    /// The run was interrupted before this environment started.
    #[error("Refactor of {0} cancelled")]
    Cancelled(String),

    /// Writing the new state failed.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// Path that could not be written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn config_error_malformed_location_display() {
        let e = ConfigError::MalformedLocation {
            entry: "no-dot".to_string(),
            reason: "expected Stack.LogicalId".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Malformed resource location 'no-dot': expected Stack.LogicalId"
        );
    }

    #[test]
    fn config_error_feature_not_enabled_display() {
        let e = ConfigError::FeatureNotEnabled("refactor".to_string());
        assert_eq!(
            e.to_string(),
            "The 'refactor' command is unstable; pass --unstable=refactor to use it"
        );
    }

    #[test]
    fn config_error_io_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: "exclude.txt".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("exclude.txt"));
    }

    #[test]
    fn environment_error_unavailable_display() {
        let e = EnvironmentError::Unavailable {
            environment: "aws://111111111111/us-east-1".to_string(),
            reason: "not bootstrapped".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "aws://111111111111/us-east-1 is unavailable: not bootstrapped"
        );
    }

    #[test]
    fn apply_error_rejected_display() {
        let e = ApplyError::Rejected {
            environment: "aws://111111111111/eu-west-1".to_string(),
            reason: "throttled".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Refactor of aws://111111111111/eu-west-1 rejected: throttled"
        );
    }

    #[test]
    fn infra_error_from_sub_errors() {
        let e: InfraError = ConfigError::InvalidConcurrency.into();
        assert!(e.to_string().contains("Configuration error"));
        let e: InfraError = ApplyError::Cancelled("env".to_string()).into();
        assert!(e.to_string().contains("Apply error"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<InfraError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<EnvironmentError>();
        assert_send_sync::<ApplyError>();
    }

    #[test]
    fn config_error_converts_to_anyhow() {
        let e = ConfigError::RevertWithoutMapping;
        let _anyhow_err: anyhow::Error = e.into();
    }
}
