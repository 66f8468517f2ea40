// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ReportFile;
use crate::{
    attachment::{Attachment, AttachmentSource, mime_type_for},
    config::SeekerConfig,
    event::{ExecutionStatus, TestEvent},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use serde_yaml::Value;
use std::borrow::Cow;
use swrite::{SWrite, swrite};
use test_reports::{TapDocument, TapTestPoint};
use tracing::warn;

pub(super) fn events(
    doc: &TapDocument,
    config: &SeekerConfig,
    report: ReportFile<'_>,
) -> Vec<TestEvent> {
    let identity = file_identity(report.relative_path, config.compare_full_path);
    let platform = document_platform(doc);
    let path = report.path();
    let report_dir = path.parent().unwrap_or(report.base_dir);

    let mut events = if config.test_points_as_executions && !doc.test_points.is_empty() {
        point_events(doc, &identity, config, report_dir)
    } else {
        vec![document_event(doc, &identity, config, report_dir)]
    };

    for event in &mut events {
        if let Some(platform) = &platform {
            event.set_platform(platform.as_str());
        }
        if config.include_attachments {
            event.add_attachments([Attachment::from_file(&path)]);
        }
    }
    events
}

/// The identity of a TAP file: its stem, or with `compare_full_path` its path relative to the
/// base directory with the extension removed.
fn file_identity(relative_path: &Utf8Path, compare_full_path: bool) -> String {
    if compare_full_path {
        relative_path
            .with_extension("")
            .components()
            .map(|component| component.as_str())
            .join("/")
    } else {
        relative_path
            .file_stem()
            .unwrap_or(relative_path.as_str())
            .to_owned()
    }
}

fn document_status(doc: &TapDocument) -> ExecutionStatus {
    if doc.has_skip() {
        ExecutionStatus::Blocked
    } else if doc.has_not_ok() || doc.bail_out.is_some() || doc.has_todo() {
        ExecutionStatus::Failed
    } else {
        ExecutionStatus::Passed
    }
}

fn point_status(doc: &TapDocument, point: &TapTestPoint) -> ExecutionStatus {
    if doc.is_plan_skipped() || point.is_skip() {
        ExecutionStatus::Blocked
    } else if !point.ok || point.is_todo() {
        ExecutionStatus::Failed
    } else {
        ExecutionStatus::Passed
    }
}

fn document_event(
    doc: &TapDocument,
    identity: &str,
    config: &SeekerConfig,
    report_dir: &Utf8Path,
) -> TestEvent {
    let mut notes = String::new();
    if let Some(plan) = &doc.plan {
        swrite!(notes, "{}..{}", plan.initial, plan.last);
        if let Some(reason) = &plan.skip {
            swrite!(notes, " # SKIP {reason}");
        }
    }
    for point in &doc.test_points {
        if !notes.is_empty() {
            notes.push('\n');
        }
        swrite!(notes, "{}", point_notes(point));
    }
    if let Some(bail_out) = &doc.bail_out {
        swrite!(notes, "\nBail out! {}", bail_out.reason);
    }

    let mut event = TestEvent::new(identity, document_status(doc));
    event.set_notes(notes.trim_start());
    if config.include_attachments {
        let diagnostics = doc
            .plan
            .iter()
            .filter_map(|plan| plan.diagnostic.as_ref())
            .chain(doc.test_points.iter().filter_map(|p| p.diagnostic.as_ref()));
        for diagnostic in diagnostics {
            event.add_attachments(file_attachments(diagnostic, report_dir));
        }
    }
    event
}

fn point_events(
    doc: &TapDocument,
    identity: &str,
    config: &SeekerConfig,
    report_dir: &Utf8Path,
) -> Vec<TestEvent> {
    let mut events: Vec<_> = doc
        .test_points
        .iter()
        .map(|point| {
            let mut event = TestEvent::new(identity, point_status(doc, point));
            event.set_notes(point_notes(point));
            if config.include_attachments
                && let Some(diagnostic) = &point.diagnostic
            {
                event.add_attachments(file_attachments(diagnostic, report_dir));
            }
            event
        })
        .collect();

    if let Some(bail_out) = &doc.bail_out {
        let mut event = TestEvent::new(identity, ExecutionStatus::Failed);
        event.set_notes(format!("Bail out! {}", bail_out.reason));
        events.push(event);
    }
    events
}

fn point_notes(point: &TapTestPoint) -> String {
    let mut notes = point.to_string();
    let message = point
        .diagnostic
        .as_ref()
        .and_then(|diagnostic| get_ignore_case(diagnostic, "message"))
        .and_then(scalar_text);
    if let Some(message) = message {
        swrite!(notes, "\n  {}", message.trim_end());
    }
    notes
}

/// Returns the platform declared by `extensions.TestLink.Platform`. A later declaration
/// overrides an earlier one.
fn document_platform(doc: &TapDocument) -> Option<String> {
    let diagnostics = doc
        .plan
        .iter()
        .filter_map(|plan| plan.diagnostic.as_ref())
        .chain(doc.test_points.iter().filter_map(|p| p.diagnostic.as_ref()));

    let mut platform = None;
    for diagnostic in diagnostics {
        let declared = get_ignore_case(diagnostic, "extensions")
            .and_then(|extensions| get_ignore_case(extensions, "TestLink"))
            .and_then(|testlink| get_ignore_case(testlink, "Platform"))
            .and_then(scalar_text)
            .map(|declared| declared.trim().to_owned())
            .filter(|declared| !declared.is_empty());
        if declared.is_some() {
            platform = declared;
        }
    }
    platform
}

/// Builds attachments from the `extensions.Files` map of a diagnostic block.
fn file_attachments(diagnostic: &Value, report_dir: &Utf8Path) -> Vec<Attachment> {
    let Some(files) = get_ignore_case(diagnostic, "extensions")
        .and_then(|extensions| get_ignore_case(extensions, "Files"))
        .and_then(Value::as_mapping)
    else {
        return Vec::new();
    };

    files
        .iter()
        .filter_map(|(name, entry)| file_attachment(&scalar_text(name)?, entry, report_dir))
        .collect()
}

fn file_attachment(name: &str, entry: &Value, report_dir: &Utf8Path) -> Option<Attachment> {
    let field = |key: &str| {
        get_ignore_case(entry, key)
            .and_then(scalar_text)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    };

    let source = if let Some(content) = field("File-Content") {
        let content: String = content.split_whitespace().collect();
        match STANDARD.decode(content) {
            Ok(bytes) => AttachmentSource::Inline(bytes),
            Err(err) => {
                warn!(
                    file = name,
                    error = %err,
                    "invalid base64 in File-Content, skipping attachment"
                );
                return None;
            }
        }
    } else if let Some(location) = field("File-Location") {
        let location = Utf8PathBuf::from(location);
        if location.is_absolute() {
            AttachmentSource::File(location)
        } else {
            AttachmentSource::File(report_dir.join(location))
        }
    } else {
        warn!(
            file = name,
            "attachment has neither File-Content nor File-Location, skipping"
        );
        return None;
    };

    let file_name = field("File-Name")
        .or_else(|| match &source {
            AttachmentSource::File(path) => path.file_name().map(str::to_owned),
            AttachmentSource::Inline(_) => None,
        })
        .unwrap_or_else(|| name.to_owned());
    let file_type =
        field("File-Type").unwrap_or_else(|| mime_type_for(&file_name).to_owned());

    Some(Attachment {
        title: field("File-Title").unwrap_or_else(|| file_name.clone()),
        description: field("File-Description"),
        file_type,
        file_name,
        source,
    })
}

/// Looks up `key` in a YAMLish mapping, ignoring ASCII case.
fn get_ignore_case<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .as_mapping()?
        .iter()
        .find(|(k, _)| k.as_str().is_some_and(|k| k.eq_ignore_ascii_case(key)))
        .map(|(_, v)| v)
}

/// Returns a scalar as text. Producers often leave numbers and booleans unquoted.
fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(text) => Some(Cow::Borrowed(text)),
        Value::Number(number) => Some(Cow::Owned(number.to_string())),
        Value::Bool(flag) => Some(Cow::Owned(flag.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdentityStrategy, ReportFormat};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn config() -> SeekerConfig {
        SeekerConfig::new(
            ReportFormat::Tap,
            IdentityStrategy::FileName,
            "**/*.tap",
            "TAP File",
        )
    }

    fn seek(input: &str, config: &SeekerConfig) -> Vec<TestEvent> {
        let doc = TapDocument::parse(input).expect("document parses");
        let report = ReportFile {
            base_dir: Utf8Path::new("/work"),
            relative_path: Utf8Path::new("tap/login.tap"),
        };
        events(&doc, config, report)
    }

    #[test_case("tap/login.tap", false, "login"; "stem")]
    #[test_case("tap/login.tap", true, "tap/login"; "full path")]
    #[test_case("login", false, "login"; "no extension")]
    #[test_case("a/b.c/login.t.tap", true, "a/b.c/login.t"; "only last extension removed")]
    fn identities(relative_path: &str, compare_full_path: bool, expected: &str) {
        assert_eq!(
            file_identity(Utf8Path::new(relative_path), compare_full_path),
            expected
        );
    }

    #[test_case(
        indoc! {"
            1..2 # SKIP no display
            ok 1
            ok 2
        "},
        ExecutionStatus::Blocked
        ; "skipped plan blocks even when all ok"
    )]
    #[test_case(
        indoc! {"
            1..2
            ok 1
            not ok 2
        "},
        ExecutionStatus::Failed
        ; "one not ok fails"
    )]
    #[test_case(
        indoc! {"
            1..2
            ok 1
            ok 2 # TODO later
        "},
        ExecutionStatus::Failed
        ; "todo fails"
    )]
    #[test_case(
        indoc! {"
            1..3
            ok 1
            Bail out! database down
        "},
        ExecutionStatus::Failed
        ; "bail out fails"
    )]
    #[test_case(
        indoc! {"
            1..2
            not ok 1 # SKIP flaky
            ok 2
        "},
        ExecutionStatus::Blocked
        ; "skip outranks not ok"
    )]
    #[test_case(
        indoc! {"
            ok 1
            ok 2
            1..2
        "},
        ExecutionStatus::Passed
        ; "all ok passes"
    )]
    fn document_outcome(input: &str, expected: ExecutionStatus) {
        let events = seek(input, &config());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].identity, "login");
        assert_eq!(events[0].status, expected);
    }

    const WITH_FILES: &str = indoc! {"
        TAP version 13
        1..2
        ok 1 - loads page
        not ok 2 - logs in
          ---
          message: wrong password
          extensions:
            TestLink:
              Platform: linux
            Files:
              screenshot:
                File-Name: login.txt
                File-Content: aGVsbG8gd29ybGQ=
                File-Type: text/plain
              trace:
                File-Location: traces/login.log
              broken:
                File-Content: '***'
          ...
    "};

    #[test]
    fn inline_attachment_round_trip() {
        let mut config = config();
        config.include_attachments = true;
        let events = seek(WITH_FILES, &config);
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.platform.as_deref(), Some("linux"));
        assert_eq!(
            event.notes.as_deref(),
            Some("1..2\nok 1 - loads page\nnot ok 2 - logs in\n  wrong password")
        );

        let attachments: Vec<_> = event
            .attachments
            .iter()
            .map(|a| (a.file_name.as_str(), a.file_type.as_str(), &a.source))
            .collect();
        assert_eq!(
            attachments,
            [
                (
                    "login.txt",
                    "text/plain",
                    &AttachmentSource::Inline(b"hello world".to_vec())
                ),
                (
                    "login.log",
                    "text/plain",
                    &AttachmentSource::File("/work/tap/traces/login.log".into())
                ),
                (
                    "login.tap",
                    "text/plain",
                    &AttachmentSource::File("/work/tap/login.tap".into())
                ),
            ]
        );
    }

    #[test]
    fn diagnostic_lookups() {
        let input = indoc! {r#"
            1..1
            not ok 1 - checkout
              ---
              Message: "card declined" # retried twice
              Extensions:
                testlink:
                  platform: 2019
              ...
        "#};
        let events = seek(input, &config());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].platform.as_deref(), Some("2019"));
        assert_eq!(
            events[0].notes.as_deref(),
            Some("1..1\nnot ok 1 - checkout\n  card declined")
        );
    }

    #[test]
    fn attachments_need_opt_in() {
        let events = seek(WITH_FILES, &config());
        assert!(events[0].attachments.is_empty());
        assert_eq!(events[0].platform.as_deref(), Some("linux"));
    }

    #[test]
    fn test_points_as_executions() {
        let mut config = config();
        config.test_points_as_executions = true;
        let input = indoc! {"
            1..3
            ok 1 - first
            not ok 2 - second
            ok 3 - third # SKIP not today
            Bail out! out of disk
        "};
        let events: Vec<_> = seek(input, &config)
            .into_iter()
            .map(|event| (event.status, event.notes.unwrap_or_default()))
            .collect();
        assert_eq!(
            events,
            [
                (ExecutionStatus::Passed, "ok 1 - first".to_owned()),
                (ExecutionStatus::Failed, "not ok 2 - second".to_owned()),
                (
                    ExecutionStatus::Blocked,
                    "ok 3 - third # SKIP not today".to_owned()
                ),
                (ExecutionStatus::Failed, "Bail out! out of disk".to_owned()),
            ]
        );
    }

    #[test]
    fn executions_mode_without_points_reports_the_document() {
        let mut config = config();
        config.test_points_as_executions = true;
        let events = seek("1..0 # SKIP nothing to do\n", &config);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, ExecutionStatus::Blocked);
    }
}
