// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{format_seconds, group_status};
use crate::{
    attachment::Attachment,
    config::{IdentityStrategy, SeekerConfig},
    event::{ExecutionStatus, TestEvent},
};
use camino::Utf8Path;
use indexmap::IndexMap;
use swrite::{SWrite, swrite, swriteln};
use test_reports::{JunitReport, JunitStatus, JunitTestCase, JunitTestSuite, NonSuccessKind};
use tracing::debug;

pub(super) fn events(
    report: &JunitReport,
    config: &SeekerConfig,
    path: &Utf8Path,
) -> Vec<TestEvent> {
    let mut events = match config.identity {
        IdentityStrategy::SuiteName => report.testsuites.iter().map(suite_event).collect(),
        IdentityStrategy::ClassName => class_events(report),
        IdentityStrategy::CaseName => report
            .testcases()
            .map(|(_, case)| case_event(case.name.clone(), case))
            .collect(),
        IdentityStrategy::MethodName => report
            .testcases()
            .map(|(_, case)| case_event(method_identity(case), case))
            .collect(),
        IdentityStrategy::MethodNameDataProvider | IdentityStrategy::FileName => {
            // Rejected by config validation.
            Vec::new()
        }
    };

    if config.include_attachments {
        let attachment = Attachment::from_file(path);
        for event in &mut events {
            event.add_attachments([attachment.clone()]);
        }
    }
    events
}

fn case_status(case: &JunitTestCase) -> ExecutionStatus {
    match case.status {
        JunitStatus::Success => ExecutionStatus::Passed,
        JunitStatus::NonSuccess { .. } => ExecutionStatus::Failed,
        JunitStatus::Skipped { .. } => ExecutionStatus::Blocked,
    }
}

fn method_identity(case: &JunitTestCase) -> String {
    match &case.classname {
        Some(classname) => format!("{classname}#{}", case.name),
        None => case.name.clone(),
    }
}

fn suite_event(suite: &JunitTestSuite) -> TestEvent {
    let status = if suite.has_non_success() {
        ExecutionStatus::Failed
    } else if suite.is_all_skipped() {
        ExecutionStatus::Blocked
    } else {
        ExecutionStatus::Passed
    };

    let mut notes = String::new();
    swriteln!(notes, "Suite: {}", suite.name);
    swrite!(
        notes,
        "Tests: {}, failures: {}, errors: {}, skipped: {}",
        suite.tests,
        suite.failures,
        suite.errors,
        suite.skipped
    );
    if let Some(time) = suite.time {
        swrite!(notes, ", time: {}", format_seconds(time));
    }
    if let Some(hostname) = &suite.hostname {
        swrite!(notes, "\nHost: {hostname}");
    }
    for case in &suite.testcases {
        swrite!(notes, "\n{}", case_line(case));
    }

    let mut event = TestEvent::new(&suite.name, status);
    event.set_notes(notes);
    event
}

fn class_events(report: &JunitReport) -> Vec<TestEvent> {
    let mut classes: IndexMap<&str, Vec<&JunitTestCase>> = IndexMap::new();
    for (suite, case) in report.testcases() {
        match &case.classname {
            Some(classname) => classes.entry(classname.as_str()).or_default().push(case),
            None => debug!(
                suite = %suite.name,
                test_case = %case.name,
                "test case has no classname, leaving it out of class results"
            ),
        }
    }

    classes
        .into_iter()
        .map(|(classname, cases)| {
            let status = group_status(cases.iter().map(|case| case_status(case)));
            let mut notes = String::new();
            swrite!(notes, "Class: {classname}");
            for case in &cases {
                swrite!(notes, "\n{}", case_line(case));
            }
            let mut event = TestEvent::new(classname, status);
            event.set_notes(notes);
            event
        })
        .collect()
}

fn case_event(identity: String, case: &JunitTestCase) -> TestEvent {
    let mut notes = case_line(case);
    match &case.status {
        JunitStatus::Success => {}
        JunitStatus::NonSuccess {
            message,
            ty,
            description,
            ..
        } => {
            if let Some(ty) = ty {
                swrite!(notes, "\nType: {ty}");
            }
            if let Some(message) = message {
                swrite!(notes, "\nMessage: {message}");
            }
            if let Some(description) = description {
                swrite!(notes, "\n{}", description.trim_end());
            }
        }
        JunitStatus::Skipped { message, .. } => {
            if let Some(message) = message {
                swrite!(notes, "\nMessage: {message}");
            }
        }
    }

    let mut event = TestEvent::new(identity, case_status(case));
    event.set_notes(notes);
    event
}

fn case_line(case: &JunitTestCase) -> String {
    let status = match &case.status {
        JunitStatus::Success => "passed",
        JunitStatus::NonSuccess {
            kind: NonSuccessKind::Failure,
            ..
        } => "failed",
        JunitStatus::NonSuccess {
            kind: NonSuccessKind::Error,
            ..
        } => "errored",
        JunitStatus::Skipped { .. } => "skipped",
    };
    let mut line = format!("{} {status}", method_identity(case));
    if let Some(time) = case.time {
        swrite!(line, " in {}", format_seconds(time));
    }
    line
}
