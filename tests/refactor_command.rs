#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing,
    clippy::panic
)]
//! Integration tests for the `refactor` command.
//!
//! Each test lays out a workspace of desired and deployed stacks in a
//! temporary directory and runs the command end to end through the
//! filesystem workspace provider.

mod common;

use common::*;
use infra_cli::logging::EnvironmentStatus;
use serde_json::json;

const UNSTABLE: &str = "--unstable=refactor";

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// Redeploying an unchanged topology has nothing to refactor.
#[test]
fn unchanged_topology_reports_nothing_to_refactor() {
    let ctx = TestContextBuilder::new()
        .with_stack(&gamma(), "basic", json!({ "OldName": queue(30) }))
        .with_stack(&gamma(), "bucket-stack", json!({ "Bucket": bucket() }))
        .build();

    let out = ctx.refactor(&[UNSTABLE, "--dry-run"]);

    out.result.expect("dry run succeeds");
    assert_eq!(out.report, "Nothing to refactor.\n");
    assert_eq!(out.entries.len(), 1);
    assert_eq!(out.entries[0].status, EnvironmentStatus::NothingToRefactor);
}

/// A selector restricts matching to one environment's stacks.
#[test]
fn selector_limits_report_to_matching_stacks() {
    let ctx = TestContextBuilder::new()
        .with_deployed(&gamma(), "basic-gamma-stack", json!({ "OldName": queue(30) }))
        .with_desired(&gamma(), "basic-gamma-stack", json!({ "NewName": queue(30) }))
        .with_deployed(&prod(), "basic-prod-stack", json!({ "OldName": queue(30) }))
        .with_desired(&prod(), "basic-prod-stack", json!({ "NewName": queue(30) }))
        .build();

    let out = ctx.refactor(&[UNSTABLE, "--dry-run", "*-gamma-stack"]);

    out.result.expect("dry run succeeds");
    assert_eq!(out.report.matches("Resource Type").count(), 1);
    assert!(out.report.contains("aws://111111111111/us-east-1"));
    assert!(!out.report.contains("aws://222222222222/us-east-1"));
    assert!(out.report.contains("basic-gamma-stack.OldName"));
    assert!(out.report.contains("basic-gamma-stack.NewName"));

    let statuses: Vec<_> = out.entries.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![EnvironmentStatus::DryRun, EnvironmentStatus::NothingToRefactor]
    );
    assert_eq!(
        ctx.deployed_ids(&gamma(), "basic-gamma-stack"),
        vec!["OldName"],
        "dry run must not write"
    );
}

/// Identical candidates are reported, never guessed.
#[test]
fn duplicate_candidates_are_reported_as_ambiguous() {
    let ctx = TestContextBuilder::new()
        .with_deployed(
            &gamma(),
            "basic",
            json!({ "QueueA": queue(30), "QueueB": queue(30) }),
        )
        .with_desired(
            &gamma(),
            "basic",
            json!({ "QueueC": queue(30), "QueueD": queue(30) }),
        )
        .build();

    let out = ctx.refactor(&[UNSTABLE, "--dry-run"]);

    out.result.expect("ambiguity is not an error");
    assert!(out.report.contains("Ambiguous resource matches"));
    for location in ["basic.QueueA", "basic.QueueB", "basic.QueueC", "basic.QueueD"] {
        assert!(out.report.contains(location), "{location} missing from report");
    }
    assert!(out.report.ends_with("Nothing to refactor.\n"));
}

// ---------------------------------------------------------------------------
// Apply and revert
// ---------------------------------------------------------------------------

/// Applying a rename moves the resource, and a second run converges.
#[test]
fn apply_then_recompute_is_idempotent() {
    let ctx = TestContextBuilder::new()
        .with_deployed(&gamma(), "basic", json!({ "OldName": queue(30) }))
        .with_desired(&gamma(), "basic", json!({ "NewName": queue(30) }))
        .build();

    let out = ctx.refactor(&[UNSTABLE]);
    out.result.expect("apply succeeds");
    assert_eq!(out.entries[0].status, EnvironmentStatus::Applied);
    assert_eq!(ctx.deployed_ids(&gamma(), "basic"), vec!["NewName"]);

    let again = ctx.refactor(&[UNSTABLE, "--dry-run"]);
    again.result.expect("second run succeeds");
    assert_eq!(again.report, "Nothing to refactor.\n");
}

/// Renaming a queue and the policy that references it keeps the reference
/// intact in the deployed template.
#[test]
fn apply_renames_referencing_resources_together() {
    let policy = |queue: &str| {
        json!({ "Type": "AWS::SQS::QueuePolicy", "Properties": { "Queues": [{ "Ref": queue }] } })
    };
    let ctx = TestContextBuilder::new()
        .with_deployed(
            &gamma(),
            "basic",
            json!({ "OldQueue": queue(30), "OldPolicy": policy("OldQueue") }),
        )
        .with_desired(
            &gamma(),
            "basic",
            json!({ "NewQueue": queue(30), "NewPolicy": policy("NewQueue") }),
        )
        .build();

    ctx.refactor(&[UNSTABLE]).result.expect("apply succeeds");

    let resources = ctx.deployed_resources(&gamma(), "basic");
    assert_eq!(resources["NewPolicy"]["Properties"]["Queues"][0]["Ref"], "NewQueue");
    let again = ctx.refactor(&[UNSTABLE, "--dry-run"]);
    assert_eq!(again.report, "Nothing to refactor.\n");
}

/// A resource moved to a new stack lands in a newly created stack file.
#[test]
fn apply_moves_resource_across_stacks() {
    let ctx = TestContextBuilder::new()
        .with_deployed(
            &gamma(),
            "app",
            json!({ "Queue": queue(45), "Bucket": bucket() }),
        )
        .with_desired(&gamma(), "app", json!({ "Bucket": bucket() }))
        .with_desired(&gamma(), "messaging", json!({ "Queue": queue(45) }))
        .build();

    ctx.refactor(&[UNSTABLE]).result.expect("apply succeeds");

    assert_eq!(ctx.deployed_ids(&gamma(), "app"), vec!["Bucket"]);
    assert_eq!(ctx.deployed_ids(&gamma(), "messaging"), vec!["Queue"]);
}

/// A recorded mapping can be reverted, and reverting twice is a no-op.
#[test]
fn recorded_mapping_can_be_reverted() {
    let ctx = TestContextBuilder::new()
        .with_deployed(&gamma(), "basic", json!({ "OldName": queue(30) }))
        .with_desired(&gamma(), "basic", json!({ "NewName": queue(30) }))
        .build();
    let record = ctx.path("moves.json");
    let record = record.to_str().unwrap();

    ctx.refactor(&[UNSTABLE, "--record-file", record])
        .result
        .expect("apply succeeds");
    assert_eq!(ctx.deployed_ids(&gamma(), "basic"), vec!["NewName"]);

    let recorded = std::fs::read_to_string(record).unwrap();
    assert!(recorded.contains("\"basic.OldName\": \"basic.NewName\""));

    ctx.refactor(&[UNSTABLE, "--revert", "--mapping-file", record])
        .result
        .expect("revert succeeds");
    assert_eq!(ctx.deployed_ids(&gamma(), "basic"), vec!["OldName"]);

    let again = ctx.refactor(&[UNSTABLE, "--revert", "--mapping-file", record]);
    again.result.expect("second revert succeeds");
    assert_eq!(again.report, "Nothing to refactor.\n");
}

/// An explicit mapping is applied verbatim, even where matching would not.
#[test]
fn explicit_mapping_overrides_matching() {
    let ctx = TestContextBuilder::new()
        .with_deployed(&gamma(), "basic", json!({ "Legacy": queue(30) }))
        .with_desired(&gamma(), "basic", json!({ "Modern": queue(60) }))
        .with_file(
            "moves.json",
            r#"{"environments":[{"account":"111111111111","region":"us-east-1","resources":{"basic.Legacy":"basic.Modern"}}]}"#,
        )
        .build();

    let out = ctx.refactor(&[UNSTABLE, "--mapping-file", ctx.path("moves.json").to_str().unwrap()]);

    out.result.expect("apply succeeds");
    assert_eq!(ctx.deployed_ids(&gamma(), "basic"), vec!["Modern"]);
}

/// Swapping two deployed names explicitly is refused: an applied swap looks
/// the same as a pending one, so a re-run would silently swap them back.
#[test]
fn explicit_swap_is_refused() {
    let ctx = TestContextBuilder::new()
        .with_stack(&gamma(), "basic", json!({ "Left": queue(30), "Right": bucket() }))
        .with_file(
            "moves.json",
            r#"{"environments":[{"account":"111111111111","region":"us-east-1","resources":{"basic.Left":"basic.Right","basic.Right":"basic.Left"}}]}"#,
        )
        .build();
    let before = ctx.deployed_resources(&gamma(), "basic");

    let out = ctx.refactor(&[UNSTABLE, "--mapping-file", ctx.path("moves.json").to_str().unwrap()]);

    let err = out.result.expect_err("occupied destination");
    assert!(err.to_string().contains("1 environment(s) failed"));
    assert_eq!(out.entries[0].status, EnvironmentStatus::Failed);
    assert_eq!(ctx.deployed_resources(&gamma(), "basic"), before);
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

/// An environment that was never bootstrapped is skipped, not fatal.
#[test]
fn unavailable_environment_is_skipped() {
    let ctx = TestContextBuilder::new()
        .with_deployed(&gamma(), "basic", json!({ "OldName": queue(30) }))
        .with_desired(&gamma(), "basic", json!({ "NewName": queue(30) }))
        .with_desired(&prod(), "basic", json!({ "NewName": queue(30) }))
        .build();

    let out = ctx.refactor(&[UNSTABLE]);

    out.result.expect("skipped environments do not fail the run");
    assert_eq!(out.entries.len(), 2);
    assert_eq!(out.entries[0].status, EnvironmentStatus::Applied);
    assert_eq!(out.entries[1].status, EnvironmentStatus::Skipped);
    assert_eq!(ctx.deployed_ids(&gamma(), "basic"), vec!["NewName"]);
}

/// A failing environment makes the run fail without stopping the others.
#[test]
fn failed_environment_fails_the_run() {
    let ctx = TestContextBuilder::new()
        .with_stack(&gamma(), "basic", json!({ "Kept": queue(30) }))
        .with_deployed(&prod(), "basic", json!({ "OldName": queue(30) }))
        .with_desired(&prod(), "basic", json!({ "NewName": queue(30) }))
        .with_file(
            "moves.json",
            r#"{"environments":[
                {"account":"111111111111","region":"us-east-1","resources":{"basic.Missing":"basic.Nowhere"}},
                {"account":"222222222222","region":"us-east-1","resources":{"basic.OldName":"basic.NewName"}}
            ]}"#,
        )
        .build();

    let out = ctx.refactor(&[UNSTABLE, "--mapping-file", ctx.path("moves.json").to_str().unwrap()]);

    let err = out.result.expect_err("one environment failed");
    assert!(err.to_string().contains("1 environment(s) failed"));
    assert_eq!(out.entries[0].status, EnvironmentStatus::Failed);
    assert_eq!(out.entries[1].status, EnvironmentStatus::Applied);
    assert_eq!(ctx.deployed_ids(&prod(), "basic"), vec!["NewName"]);
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// The command is gated behind an unstable opt-in.
#[test]
fn refuses_to_run_without_unstable_opt_in() {
    let ctx = TestContextBuilder::new()
        .with_stack(&gamma(), "basic", json!({ "OldName": queue(30) }))
        .build();

    let out = ctx.refactor(&["--dry-run"]);

    let err = out.result.expect_err("unstable gate");
    assert!(format!("{err:#}").contains("--unstable=refactor"));
    assert!(out.report.is_empty());
}

/// A malformed exclude entry fails before anything is read or written.
#[test]
fn malformed_exclude_file_is_fatal() {
    let ctx = TestContextBuilder::new()
        .with_deployed(&gamma(), "basic", json!({ "OldName": queue(30) }))
        .with_desired(&gamma(), "basic", json!({ "NewName": queue(30) }))
        .with_file("exclude.txt", "# comment\nbasic.OldName\nnot-a-location\n")
        .build();

    let out = ctx.refactor(&[UNSTABLE, "--exclude-file", ctx.path("exclude.txt").to_str().unwrap()]);

    let err = out.result.expect_err("configuration error");
    assert!(format!("{err:#}").contains("not-a-location"));
    assert!(out.entries.is_empty());
    assert_eq!(ctx.deployed_ids(&gamma(), "basic"), vec!["OldName"]);
}

/// Excluded locations are never matched.
#[test]
fn excluded_location_is_not_moved() {
    let ctx = TestContextBuilder::new()
        .with_config("[refactor]\nexclude = [\"basic.OldName\"]\n")
        .with_deployed(&gamma(), "basic", json!({ "OldName": queue(30) }))
        .with_desired(&gamma(), "basic", json!({ "NewName": queue(30) }))
        .build();

    let out = ctx.refactor(&[UNSTABLE]);

    out.result.expect("run succeeds");
    assert_eq!(out.report, "Nothing to refactor.\n");
    assert_eq!(ctx.deployed_ids(&gamma(), "basic"), vec!["OldName"]);
}

/// Unknown keys in `infra.toml` are rejected.
#[test]
fn unknown_config_key_is_fatal() {
    let ctx = TestContextBuilder::new()
        .with_config("[refactor]\nparallelism = 4\n")
        .with_stack(&gamma(), "basic", json!({ "OldName": queue(30) }))
        .build();

    let err = ctx.refactor(&[UNSTABLE]).result.expect_err("config error");
    assert!(format!("{err:#}").contains("infra.toml"));
}

/// An invalid selector is a configuration error.
#[test]
fn invalid_selector_is_fatal() {
    let ctx = TestContextBuilder::new()
        .with_stack(&gamma(), "basic", json!({ "OldName": queue(30) }))
        .build();

    let err = ctx
        .refactor(&[UNSTABLE, "[unclosed"])
        .result
        .expect_err("config error");
    assert!(format!("{err:#}").contains("[unclosed"));
}

/// Running with a larger pool gives the same result as running sequentially.
#[test]
fn concurrent_run_matches_sequential_run() {
    let build = || {
        TestContextBuilder::new()
            .with_deployed(&gamma(), "basic", json!({ "OldName": queue(30) }))
            .with_desired(&gamma(), "basic", json!({ "NewName": queue(30) }))
            .with_deployed(&prod(), "basic", json!({ "OldName": queue(30) }))
            .with_desired(&prod(), "basic", json!({ "NewName": queue(30) }))
            .build()
    };
    let sequential = build().refactor(&[UNSTABLE, "--dry-run"]);
    let concurrent = build().refactor(&[UNSTABLE, "--dry-run", "--concurrency", "4"]);
    assert_eq!(sequential.report, concurrent.report);
    assert_eq!(sequential.report.matches("Resource Type").count(), 2);
}
