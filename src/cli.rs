use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the infrastructure deployment tool.
#[derive(Parser, Debug)]
#[command(
    name = "infra",
    about = "Reconcile synthesized stacks with deployed environments",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Workspace root (defaults to INFRA_ROOT, then the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect and apply resource renames and moves between stacks
    Refactor(RefactorOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file of this command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Refactor(_) => "refactor",
            Self::Version => "version",
        }
    }
}

/// Options for the `refactor` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct RefactorOpts {
    /// Only consider stacks whose name matches one of these glob patterns
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Report the computed mapping without applying it
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Apply the inverse of --mapping-file
    #[arg(long)]
    pub revert: bool,

    /// Use the mappings in this file instead of detecting them
    #[arg(long, value_name = "PATH")]
    pub mapping_file: Option<PathBuf>,

    /// Never match the locations listed in this file (one Stack.LogicalId per line)
    #[arg(long, value_name = "PATH")]
    pub exclude_file: Option<PathBuf>,

    /// Write the computed or applied mappings to this file
    #[arg(long, value_name = "PATH")]
    pub record_file: Option<PathBuf>,

    /// Number of environments processed at once (overrides infra.toml)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Opt in to unstable commands
    #[arg(long, value_delimiter = ',', value_name = "FEATURE")]
    pub unstable: Vec<String>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn refactor_opts(cli: Cli) -> RefactorOpts {
        match cli.command {
            Command::Refactor(opts) => opts,
            Command::Version => panic!("expected refactor command"),
        }
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_refactor_patterns() {
        let cli = Cli::parse_from(["infra", "refactor", "*-gamma-stack", "basic"]);
        let opts = refactor_opts(cli);
        assert_eq!(opts.patterns, vec!["*-gamma-stack", "basic"]);
        assert!(!opts.dry_run);
        assert!(!opts.revert);
    }

    #[test]
    fn parse_refactor_dry_run() {
        let cli = Cli::parse_from(["infra", "refactor", "--dry-run"]);
        assert!(refactor_opts(cli).dry_run);
    }

    #[test]
    fn parse_refactor_dry_run_short() {
        let cli = Cli::parse_from(["infra", "refactor", "-d"]);
        assert!(refactor_opts(cli).dry_run);
    }

    #[test]
    fn parse_unstable_comma_list() {
        let cli = Cli::parse_from(["infra", "refactor", "--unstable", "refactor,other"]);
        assert_eq!(refactor_opts(cli).unstable, vec!["refactor", "other"]);
    }

    #[test]
    fn parse_unstable_equals_form() {
        let cli = Cli::parse_from(["infra", "refactor", "--unstable=refactor"]);
        assert_eq!(refactor_opts(cli).unstable, vec!["refactor"]);
    }

    #[test]
    fn parse_revert_with_mapping_file() {
        let cli = Cli::parse_from([
            "infra",
            "refactor",
            "--revert",
            "--mapping-file",
            "moves.json",
        ]);
        let opts = refactor_opts(cli);
        assert!(opts.revert);
        assert_eq!(opts.mapping_file, Some(PathBuf::from("moves.json")));
    }

    #[test]
    fn parse_concurrency() {
        let cli = Cli::parse_from(["infra", "refactor", "--concurrency", "4"]);
        assert_eq!(refactor_opts(cli).concurrency, Some(4));
    }

    #[test]
    fn parse_concurrency_rejects_non_number() {
        assert!(Cli::try_parse_from(["infra", "refactor", "--concurrency", "many"]).is_err());
    }

    #[test]
    fn parse_root_is_global() {
        let cli = Cli::parse_from(["infra", "refactor", "--root", "/work"]);
        assert_eq!(cli.global.root, Some(PathBuf::from("/work")));
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["infra", "version"]);
        assert!(matches!(cli.command, Command::Version));
        assert_eq!(cli.command.name(), "version");
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["infra", "-v", "refactor"]);
        assert!(cli.verbose);
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["infra"]).is_err());
    }
}
