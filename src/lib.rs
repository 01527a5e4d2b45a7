//! Infrastructure deployment CLI: stack refactoring engine.
//!
//! Detects resources that were renamed or moved to another stack between
//! what is deployed and what was newly synthesized, and relocates them
//! instead of letting a deployment destroy and recreate them.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: `infra.toml`, stack selectors, exclude lists and mapping files
//! - **[`model`]**: environments, locations, snapshots, mappings and digests
//! - **[`provider`]**: the state provider and mutate transport interfaces
//! - **[`refactor`]**: matcher, mapping sources, orchestration and reports
//! - **[`commands`]**: top-level subcommand orchestration (`refactor`, `version`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod provider;
pub mod refactor;
