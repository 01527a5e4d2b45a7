// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed workspace and a fluent builder so
// each integration test can lay out desired and deployed stacks without
// repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use infra_cli::cli::{Cli, Command};
use infra_cli::commands;
use infra_cli::logging::{EnvironmentEntry, Logger};
use infra_cli::model::Environment;
use serde_json::{Value, json};

/// The `gamma` test environment.
pub fn gamma() -> Environment {
    Environment::new("111111111111", "us-east-1")
}

/// The `prod` test environment.
pub fn prod() -> Environment {
    Environment::new("222222222222", "us-east-1")
}

/// A queue declaration with the given visibility timeout.
pub fn queue(timeout: u32) -> Value {
    json!({ "Type": "AWS::SQS::Queue", "Properties": { "VisibilityTimeout": timeout } })
}

/// A bucket declaration.
pub fn bucket() -> Value {
    json!({ "Type": "AWS::S3::Bucket", "Properties": { "Versioning": "Enabled" } })
}

/// What one `infra refactor` invocation produced.
pub struct RunOutput {
    /// Whether the command succeeded.
    pub result: anyhow::Result<()>,
    /// Everything written to the report stream.
    pub report: String,
    /// The per-environment summary entries.
    pub entries: Vec<EnvironmentEntry>,
}

/// An isolated workspace backed by a [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory containing the workspace.
    pub root: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Path to the workspace root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Path of a file under the workspace root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    /// Run `infra --root <root> refactor <args...>` and capture its output.
    pub fn refactor(&self, args: &[&str]) -> RunOutput {
        let root = self.root.path().display().to_string();
        let mut argv = vec!["infra", "--root", root.as_str(), "refactor"];
        argv.extend_from_slice(args);
        let cli = <Cli as clap::Parser>::try_parse_from(argv).expect("valid command line");
        let Command::Refactor(opts) = &cli.command else {
            panic!("expected refactor command");
        };

        let log = Arc::new(Logger::with_log_file(None));
        let mut report = Vec::new();
        let result = commands::refactor::run(
            &cli.global,
            opts,
            &log,
            Arc::new(AtomicBool::new(false)),
            &mut report,
        );
        RunOutput {
            result,
            report: String::from_utf8(report).expect("utf-8 report"),
            entries: log.entries(),
        }
    }

    /// The deployed template resources of `stack` in `environment`.
    pub fn deployed_resources(&self, environment: &Environment, stack: &str) -> Value {
        let path = deployed_dir(self.root.path(), environment).join(format!("{stack}.json"));
        let text = std::fs::read_to_string(&path).expect("read deployed stack");
        let artifact: Value = serde_json::from_str(&text).expect("parse deployed stack");
        artifact["template"]["Resources"].clone()
    }

    /// Logical ids deployed in `stack`, sorted.
    pub fn deployed_ids(&self, environment: &Environment, stack: &str) -> Vec<String> {
        self.deployed_resources(environment, stack)
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn deployed_dir(root: &Path, environment: &Environment) -> PathBuf {
    root.join("deployed")
        .join(&environment.account)
        .join(&environment.region)
}

fn artifact(environment: &Environment, stack: &str, resources: &Value, deployed: bool) -> String {
    let mut document = json!({
        "stackName": stack,
        "environment": environment,
        "template": { "Resources": resources },
    });
    if deployed {
        let physical_ids: serde_json::Map<String, Value> = resources
            .as_object()
            .map(|m| {
                m.keys()
                    .map(|id| (id.clone(), Value::String(format!("{stack}-{id}-physical"))))
                    .collect()
            })
            .unwrap_or_default();
        document["physicalIds"] = Value::Object(physical_ids);
    }
    serde_json::to_string_pretty(&document).expect("serialize artifact")
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building an empty workspace.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("assembly")).expect("create assembly dir");
        Self {
            ctx: IntegrationTestContext { root },
        }
    }

    /// Write `infra.toml`.
    pub fn with_config(self, content: &str) -> Self {
        std::fs::write(self.ctx.path(infra_cli::config::CONFIG_FILE), content)
            .expect("write infra.toml");
        self
    }

    /// Write an arbitrary file relative to the root.
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        let path = self.ctx.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, content).expect("write file");
        self
    }

    /// Add a desired (synthesized) stack.
    pub fn with_desired(self, environment: &Environment, stack: &str, resources: Value) -> Self {
        let name = format!(
            "assembly/{}-{}-{stack}.json",
            environment.account, environment.region
        );
        let body = artifact(environment, stack, &resources, false);
        self.with_file(&name, &body)
    }

    /// Add a deployed stack, bootstrapping the environment.
    pub fn with_deployed(self, environment: &Environment, stack: &str, resources: Value) -> Self {
        let dir = deployed_dir(self.ctx.root.path(), environment);
        std::fs::create_dir_all(&dir).expect("create deployed dir");
        std::fs::write(
            dir.join(format!("{stack}.json")),
            artifact(environment, stack, &resources, true),
        )
        .expect("write deployed stack");
        self
    }

    /// Add a stack that is both desired and deployed with the same content.
    pub fn with_stack(self, environment: &Environment, stack: &str, resources: Value) -> Self {
        self.with_desired(environment, stack, resources.clone())
            .with_deployed(environment, stack, resources)
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}
