// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_yaml::Value;
use std::{fs::File, io::BufReader, time::Duration};
use test_reports::{
    JunitReport, JunitStatus, NonSuccessKind, TapDocument, TestngReport, TestngStatus,
};

fn open(name: &str) -> BufReader<File> {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    BufReader::new(File::open(&path).unwrap_or_else(|err| panic!("opening {path}: {err}")))
}

#[test]
fn junit_fixture() {
    let report =
        JunitReport::parse(open("TEST-org.example.CalculatorTest.xml")).expect("fixture parses");
    assert_eq!(report.testsuites.len(), 1);

    let suite = &report.testsuites[0];
    assert_eq!(suite.name, "org.example.CalculatorTest");
    assert_eq!(suite.hostname.as_deref(), Some("ci-runner"));
    assert_eq!(suite.time, Some(Duration::from_millis(412)));
    assert_eq!(suite.system_out.as_deref(), Some("calculator ready\n"));
    assert_eq!(suite.system_err, None);

    let statuses: Vec<_> = suite
        .testcases
        .iter()
        .map(|case| match &case.status {
            JunitStatus::Success => "success",
            JunitStatus::NonSuccess {
                kind: NonSuccessKind::Failure,
                ..
            } => "failure",
            JunitStatus::NonSuccess {
                kind: NonSuccessKind::Error,
                ..
            } => "error",
            JunitStatus::Skipped { .. } => "skipped",
        })
        .collect();
    assert_eq!(statuses, ["success", "success", "failure", "skipped"]);

    let JunitStatus::NonSuccess {
        message,
        description,
        ..
    } = &suite.testcases[2].status
    else {
        panic!("divides failed");
    };
    assert_eq!(message.as_deref(), Some("expected: <2> but was: <3>"));
    assert!(
        description
            .as_deref()
            .is_some_and(|d| d.contains("CalculatorTest.java:31"))
    );
}

#[test]
fn testng_fixture() {
    let report = TestngReport::parse(open("testng-results.xml")).expect("fixture parses");
    assert_eq!(report.suites.len(), 1);

    let suite = &report.suites[0];
    assert_eq!(suite.name, "Checkout");
    let methods: Vec<_> = suite
        .methods()
        .filter(|(_, method)| !method.is_config)
        .map(|(_, method)| {
            (
                method.name.as_str(),
                method.status,
                method.data_provider.as_deref(),
                method.params.clone(),
            )
        })
        .collect();
    assert_eq!(
        methods,
        [
            (
                "pays",
                TestngStatus::Pass,
                Some("cards"),
                vec!["visa".to_owned()]
            ),
            (
                "pays",
                TestngStatus::Fail,
                Some("cards"),
                vec!["amex".to_owned()]
            ),
            ("refunds", TestngStatus::Pass, None, vec![]),
        ]
    );

    let exception = suite.tests[0].classes[0].methods[2]
        .exception
        .as_ref()
        .expect("failed method has an exception");
    assert_eq!(exception.message.as_deref(), Some("card declined"));
}

#[test]
fn tap_fixture() {
    let input = std::fs::read_to_string(format!(
        "{}/tests/fixtures/login-linux.tap",
        env!("CARGO_MANIFEST_DIR")
    ))
    .expect("fixture is readable");
    let doc = TapDocument::parse(&input).expect("fixture parses");

    assert_eq!(doc.test_points.len(), 3);
    assert!(doc.has_not_ok());
    assert!(!doc.has_skip());

    let files = doc.test_points[1]
        .diagnostic
        .as_ref()
        .and_then(|d| d.get("extensions"))
        .and_then(|e| e.get("Files"))
        .expect("Files extension present");
    assert_eq!(files.as_mapping().map(|files| files.len()), Some(1));
    assert_eq!(
        files
            .get("screenshot")
            .and_then(|screenshot| screenshot.get("File-Name"))
            .and_then(Value::as_str),
        Some("login.txt")
    );
}
