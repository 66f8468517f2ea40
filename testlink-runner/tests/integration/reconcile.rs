// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use pretty_assertions::assert_eq;
use testlink_runner::{
    config::{IdentityStrategy, ReconcileConfig, ReconcileSettings, ReportFormat, SeekerConfig},
    errors::ReconcileError,
    event::ExecutionStatus::{self, *},
    reconcile::{BuildOutcome, Reconciler, RunSummary},
};

fn workspace_config() -> ReconcileConfig {
    ReconcileConfig::from_sources(&workspace_dir(), None).expect("fixture config is valid")
}

#[test]
fn reconciles_all_formats() {
    let base_dir = workspace_dir();
    let config = workspace_config();
    let mut catalog = load_catalog();
    let mut remote = FakeTestLink::default();

    let summary = Reconciler::new(&config, &base_dir)
        .expect("valid seekers")
        .run(&mut catalog, &mut remote)
        .expect("run completes");

    // 104 runs on windows and has no report; 105 still waits for org.example.CheckoutTest.
    assert_eq!(
        remote.statuses(),
        [(101, Failed), (102, Failed), (103, Failed), (106, Blocked)]
    );
    assert_eq!(
        summary,
        RunSummary {
            reports_read: 4,
            failed: 3,
            blocked: 1,
            not_run: 2,
            updated: 4,
            attachments_uploaded: 4,
            ..RunSummary::default()
        }
    );

    let login = &remote.results[2];
    assert_eq!(login.platform_id, Some(31));
    assert_eq!(login.platform_name.as_deref(), Some("linux"));
    assert_eq!(login.test_plan_id, 900);
    assert_eq!((login.build_id, login.build_name.as_str()), (77, "2.4.0-rc1"));

    let payments = &remote.results[1];
    assert!(
        payments.notes.contains("card declined"),
        "notes carry the failure: {}",
        payments.notes
    );
    assert_eq!(payments.platform_id, None);

    let uploads: Vec<_> = remote
        .uploads
        .iter()
        .map(|upload| {
            (
                upload.execution_id,
                upload.title.as_str(),
                upload.file_name.as_str(),
            )
        })
        .collect();
    assert_eq!(
        uploads,
        [
            (5003, "after submit", "login.txt"),
            (5003, "login-linux.tap", "login-linux.tap"),
            (5004, "checkout.log", "checkout.log"),
            (5004, "checkout.tap", "checkout.tap"),
        ]
    );
    assert_eq!(remote.uploads[0].content, "aGVsbG8gd29ybGQ=");
    assert_eq!(remote.uploads[2].content, "Y29uc29sZTogMiB3YXJuaW5ncwo=");
}

#[test]
fn failed_verdicts_can_fail_the_build() {
    let base_dir = workspace_dir();
    let config = workspace_config();
    let config = ReconcileConfig::new(
        ReconcileSettings {
            failed_tests_mark_build_as_failure: true,
            ..*config.settings()
        },
        config.seekers().to_vec(),
    )
    .expect("valid seekers");

    let summary = Reconciler::new(&config, &base_dir)
        .expect("valid seekers")
        .run(&mut load_catalog(), &mut FakeTestLink::default())
        .expect("run completes");
    assert_eq!(summary.outcome, BuildOutcome::Failure);
}

#[test]
fn test_points_as_executions() {
    let base_dir = workspace_dir();
    let mut tap = SeekerConfig::new(
        ReportFormat::Tap,
        IdentityStrategy::FileName,
        "tap/*.tap",
        "TAP File",
    );
    tap.platform_suffix = true;
    tap.test_points_as_executions = true;
    let config = ReconcileConfig::new(ReconcileSettings::default(), vec![tap])
        .expect("valid seekers");

    let mut remote = FakeTestLink::default();
    let summary = Reconciler::new(&config, &base_dir)
        .expect("valid seekers")
        .run(&mut load_catalog(), &mut remote)
        .expect("run completes");

    let expected: [(i64, ExecutionStatus); 5] = [
        (103, Passed),
        (103, Failed),
        (103, Passed),
        (106, Passed),
        (106, Blocked),
    ];
    assert_eq!(remote.statuses(), expected);
    assert!(
        remote.results[..3]
            .iter()
            .all(|request| request.platform_id == Some(31)),
        "every login execution is reported on linux"
    );
    assert_eq!(summary.updated, 5);
    // 101, 102 and 104 have no matching seeker; 105 needs a Java Class result too.
    assert_eq!(summary.not_run, 4);
}

#[test]
fn fatal_remote_error_stops_the_run() {
    let base_dir = workspace_dir();
    let config = workspace_config();
    let mut remote = FakeTestLink {
        fatal_for: Some(102),
        ..FakeTestLink::default()
    };

    let err = Reconciler::new(&config, &base_dir)
        .expect("valid seekers")
        .run(&mut load_catalog(), &mut remote)
        .expect_err("fatal error stops the run");
    let ReconcileError::SyncAborted {
        test_case_id,
        summary,
        ..
    } = err
    else {
        panic!("expected the run to be aborted");
    };

    assert_eq!(test_case_id, 102);
    assert_eq!(remote.statuses(), [(101, Failed)]);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.sync_errors, 1);
    assert_eq!(summary.outcome, BuildOutcome::Unstable);
}

#[test]
fn missing_base_dir_reports_nothing() {
    let base_dir = workspace_dir().join("does-not-exist");
    let config = workspace_config();
    let mut remote = FakeTestLink::default();

    let summary = Reconciler::new(&config, &base_dir)
        .expect("valid seekers")
        .run(&mut load_catalog(), &mut remote)
        .expect("scan errors do not abort the run");
    assert_eq!(summary.scan_errors, 3);
    assert!(remote.results.is_empty());
    assert_eq!(summary.outcome, BuildOutcome::Success);
}
