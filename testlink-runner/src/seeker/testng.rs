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
use swrite::{SWrite, swrite};
use test_reports::{TestngClass, TestngMethod, TestngReport, TestngStatus, TestngSuite};

pub(super) fn events(
    report: &TestngReport,
    config: &SeekerConfig,
    path: &Utf8Path,
) -> Vec<TestEvent> {
    let mut events = match config.identity {
        IdentityStrategy::SuiteName => report.suites.iter().map(suite_event).collect(),
        IdentityStrategy::ClassName => class_events(report),
        IdentityStrategy::MethodName | IdentityStrategy::MethodNameDataProvider => report
            .suites
            .iter()
            .flat_map(test_methods)
            .map(|(class, method)| method_event(class, method))
            .collect(),
        IdentityStrategy::CaseName | IdentityStrategy::FileName => {
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

/// Returns the methods of a suite, leaving out configuration methods such as `@BeforeClass`.
fn test_methods(suite: &TestngSuite) -> impl Iterator<Item = (&TestngClass, &TestngMethod)> {
    suite.methods().filter(|(_, method)| !method.is_config)
}

fn method_status(method: &TestngMethod) -> ExecutionStatus {
    match method.status {
        TestngStatus::Pass => ExecutionStatus::Passed,
        TestngStatus::Fail => ExecutionStatus::Failed,
        TestngStatus::Skip => ExecutionStatus::Blocked,
    }
}

fn suite_event(suite: &TestngSuite) -> TestEvent {
    let status = group_status(test_methods(suite).map(|(_, method)| method_status(method)));

    let mut notes = format!("Suite: {}", suite.name);
    if let Some(duration) = suite.duration {
        swrite!(notes, " ({})", format_seconds(duration));
    }
    for test in &suite.tests {
        swrite!(notes, "\nTest: {}", test.name);
    }
    for (class, method) in test_methods(suite) {
        swrite!(notes, "\n{}", method_line(class, method));
    }

    let mut event = TestEvent::new(&suite.name, status);
    event.set_notes(notes);
    event
}

fn class_events(report: &TestngReport) -> Vec<TestEvent> {
    let mut classes: IndexMap<&str, Vec<&TestngMethod>> = IndexMap::new();
    for suite in &report.suites {
        for (class, method) in test_methods(suite) {
            classes.entry(class.name.as_str()).or_default().push(method);
        }
    }

    classes
        .into_iter()
        .map(|(name, methods)| {
            let status = group_status(methods.iter().map(|method| method_status(method)));
            let mut notes = format!("Class: {name}");
            for method in &methods {
                swrite!(notes, "\n{} {}", method.name, method.status);
            }
            let mut event = TestEvent::new(name, status);
            event.set_notes(notes);
            event
        })
        .collect()
}

fn method_event(class: &TestngClass, method: &TestngMethod) -> TestEvent {
    let mut notes = method_line(class, method);
    if let Some(description) = &method.description {
        swrite!(notes, "\nDescription: {description}");
    }
    if !method.params.is_empty() {
        swrite!(notes, "\nParameters: {}", method.params.join(", "));
    }
    if let Some(exception) = &method.exception {
        if let Some(class) = &exception.class {
            swrite!(notes, "\nException: {class}");
        }
        if let Some(message) = &exception.message {
            swrite!(notes, "\nMessage: {message}");
        }
        if let Some(stacktrace) = &exception.full_stacktrace {
            swrite!(notes, "\n{}", stacktrace.trim_end());
        }
    }
    for line in &method.reporter_output {
        swrite!(notes, "\n{line}");
    }

    let identity = format!("{}#{}", class.name, method.name);
    let mut event = TestEvent::new(identity, method_status(method));
    event.set_notes(notes);
    if let Some(data_provider) = &method.data_provider {
        event.set_data_provider(data_provider);
    }
    event
}

fn method_line(class: &TestngClass, method: &TestngMethod) -> String {
    let mut line = format!("{}#{} {}", class.name, method.name, method.status);
    if let Some(data_provider) = &method.data_provider {
        swrite!(line, " [{data_provider}]");
    }
    if let Some(duration) = method.duration {
        swrite!(line, " in {}", format_seconds(duration));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportFormat;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const REPORT: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <testng-results skipped="1" failed="1" total="4" passed="2">
          <suite name="Checkout" duration-ms="120">
            <test name="Payments">
              <class name="shop.PaymentTest">
                <test-method status="PASS" signature="setUp()" name="setUp" is-config="true"/>
                <test-method status="PASS" name="pays" data-provider="cards" duration-ms="10"/>
                <test-method status="FAIL" name="pays" data-provider="cards" duration-ms="12">
                  <exception class="java.lang.IllegalStateException">
                    <message><![CDATA[declined]]></message>
                  </exception>
                </test-method>
              </class>
              <class name="shop.RefundTest">
                <test-method status="SKIP" name="refunds"/>
              </class>
            </test>
          </suite>
        </testng-results>
    "#};

    fn seek(identity: IdentityStrategy) -> Vec<TestEvent> {
        let report = TestngReport::parse(REPORT.as_bytes()).expect("report parses");
        let mut config = SeekerConfig::new(ReportFormat::Testng, identity, "*.xml", "Key");
        config.data_provider_field = Some("Data Provider".to_owned());
        events(&report, &config, Utf8Path::new("testng-results.xml"))
    }

    #[test]
    fn suite_events() {
        let events = seek(IdentityStrategy::SuiteName);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].identity, "Checkout");
        assert_eq!(events[0].status, ExecutionStatus::Failed);
    }

    #[test]
    fn class_events_leave_out_config_methods() {
        let events: Vec<_> = seek(IdentityStrategy::ClassName)
            .into_iter()
            .map(|event| (event.identity, event.status))
            .collect();
        assert_eq!(
            events,
            [
                ("shop.PaymentTest".to_owned(), ExecutionStatus::Failed),
                ("shop.RefundTest".to_owned(), ExecutionStatus::Blocked),
            ]
        );
    }

    #[test]
    fn method_events_carry_data_provider() {
        let events = seek(IdentityStrategy::MethodNameDataProvider);
        let summary: Vec<_> = events
            .iter()
            .map(|event| {
                (
                    event.identity.as_str(),
                    event.status,
                    event.data_provider.as_deref(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            [
                ("shop.PaymentTest#pays", ExecutionStatus::Passed, Some("cards")),
                ("shop.PaymentTest#pays", ExecutionStatus::Failed, Some("cards")),
                ("shop.RefundTest#refunds", ExecutionStatus::Blocked, None),
            ]
        );
        assert_eq!(
            events[1].notes.as_deref(),
            Some(indoc! {"
                shop.PaymentTest#pays FAIL [cards] in 0.012s
                Exception: java.lang.IllegalStateException
                Message: declined"}),
        );
    }
}
