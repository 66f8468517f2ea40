// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests that run the app in-process against the fixture workspace.

use crate::{ExpectedError, OutputWriter, TestlinkSyncApp, TestlinkSyncExitCode};
use camino::Utf8PathBuf;
use camino_tempfile::Utf8TempDir;
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::Value;

fn workspace_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../testlink-runner/tests/fixtures/workspace")
}

fn exec(args: &[&str], output: &mut OutputWriter) -> Result<i32, ExpectedError> {
    let base_dir = workspace_dir();
    let catalog = base_dir.join("catalog.json");
    let mut full_args = vec![
        "testlink-sync",
        "--color",
        "never",
        "--base-dir",
        base_dir.as_str(),
    ];
    full_args.extend_from_slice(args);
    let with_catalog: Vec<&str> = full_args
        .into_iter()
        .map(|arg| if arg == "{catalog}" { catalog.as_str() } else { arg })
        .collect();

    let app = TestlinkSyncApp::parse_from(with_catalog);
    let context = app.init_output();
    app.exec(context, output)
}

fn records(stdout: &[u8]) -> Vec<Value> {
    std::str::from_utf8(stdout)
        .expect("stdout is UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect()
}

#[test]
fn run_writes_results_to_stdout() {
    let mut output = OutputWriter::new_test();
    let code = exec(&["run", "--catalog", "{catalog}"], &mut output).expect("run succeeds");
    assert_eq!(code, TestlinkSyncExitCode::OK);

    let records = records(output.stdout().expect("stdout is captured"));
    let summary: Vec<_> = records
        .iter()
        .map(|record| {
            (
                record["kind"].as_str().expect("kind is a string").to_owned(),
                record["execution-id"].as_i64().expect("execution id"),
            )
        })
        .collect();
    let expected: Vec<_> = [
        ("result", 1),
        ("result", 2),
        ("result", 3),
        ("attachment", 3),
        ("attachment", 3),
        ("result", 4),
        ("attachment", 4),
        ("attachment", 4),
    ]
    .into_iter()
    .map(|(kind, id)| (kind.to_owned(), id))
    .collect();
    assert_eq!(summary, expected);

    let results: Vec<_> = records
        .iter()
        .filter(|record| record["kind"] == "result")
        .map(|record| {
            (
                record["test-case-id"].as_i64().expect("test case id"),
                record["status-code"].as_str().expect("status code").to_owned(),
            )
        })
        .collect();
    assert_eq!(
        results,
        [
            (101, "f".to_owned()),
            (102, "f".to_owned()),
            (103, "f".to_owned()),
            (106, "b".to_owned()),
        ]
    );
}

#[test]
fn failed_results_can_fail_the_build() {
    let mut output = OutputWriter::new_test();
    let err = exec(
        &[
            "run",
            "--catalog",
            "{catalog}",
            "--failed-tests-mark-build-as-failure",
        ],
        &mut output,
    )
    .expect_err("build is marked as failed");
    assert_eq!(err.process_exit_code(), TestlinkSyncExitCode::BUILD_FAILED);
    // Results are still written out.
    assert_eq!(records(output.stdout().expect("stdout is captured")).len(), 8);
}

#[test]
fn run_writes_outbox_file() {
    let dir = Utf8TempDir::new().expect("created temp dir");
    let outbox = dir.path().join("outbox.jsonl");

    let mut output = OutputWriter::new_test();
    exec(
        &["run", "--catalog", "{catalog}", "--outbox", outbox.as_str()],
        &mut output,
    )
    .expect("run succeeds");

    assert_eq!(output.stdout(), Some(&[][..]));
    let contents = std::fs::read(&outbox).expect("outbox was written");
    assert_eq!(records(&contents).len(), 8);
}

#[test]
fn show_config() {
    let mut output = OutputWriter::new_test();
    exec(&["show-config"], &mut output).expect("show-config succeeds");

    let config: Value = serde_json::from_slice(output.stdout().expect("stdout is captured"))
        .expect("config is JSON");
    let formats: Vec<_> = config["seeker"]
        .as_array()
        .expect("seekers are an array")
        .iter()
        .map(|seeker| seeker["format"].as_str().expect("format is a string"))
        .collect();
    assert_eq!(formats, ["junit", "testng", "tap"]);
    assert_eq!(
        config["reconcile"]["failed-tests-mark-build-as-failure"],
        Value::Bool(false)
    );
}

#[test]
fn missing_catalog_is_a_setup_error() {
    let dir = Utf8TempDir::new().expect("created temp dir");
    let missing = dir.path().join("catalog.json");

    let mut output = OutputWriter::new_test();
    let err = exec(&["run", "--catalog", missing.as_str()], &mut output)
        .expect_err("catalog does not exist");
    assert!(
        matches!(err, ExpectedError::CatalogLoadError { .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.process_exit_code(), TestlinkSyncExitCode::SETUP_ERROR);
}

#[test]
fn missing_base_dir_is_a_setup_error() {
    let dir = Utf8TempDir::new().expect("created temp dir");
    let missing = dir.path().join("nope");

    let app = TestlinkSyncApp::parse_from([
        "testlink-sync",
        "--color",
        "never",
        "--base-dir",
        missing.as_str(),
        "show-config",
    ]);
    let context = app.init_output();
    let err = app
        .exec(context, &mut OutputWriter::new_test())
        .expect_err("base dir does not exist");
    assert!(
        matches!(err, ExpectedError::BaseDirNotFound { .. }),
        "unexpected error: {err:?}"
    );
}
