// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test Anything Protocol streams, with TAP 13 YAMLish diagnostics.

use crate::errors::{TapParseError, TapParseErrorKind};
use regex::Regex;
use serde_yaml::Value;
use std::{fmt, sync::LazyLock};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^TAP version\s+(\S+)\s*$").expect("valid regex"));
static PLAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.\.(\d+)\s*(?:#\s*(.*))?$").expect("valid regex")
});
static PLAN_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d*\.\.").expect("valid regex"));
static TEST_POINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(not ok|ok)\b(?:\s+(\d+)\b)?(.*)$").expect("valid regex")
});
static BAIL_OUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Bail out!\s*(.*)$").expect("valid regex"));

/// A parsed TAP stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TapDocument {
    /// The version from the `TAP version N` header, if present.
    pub version: Option<u32>,

    /// The plan, if present.
    pub plan: Option<TapPlan>,

    /// The test points, in stream order.
    pub test_points: Vec<TapTestPoint>,

    /// The bail-out line, if the producer gave up.
    pub bail_out: Option<TapBailOut>,

    /// Comment lines, without their leading `#`.
    pub comments: Vec<String>,
}

impl TapDocument {
    /// Parses a TAP stream.
    ///
    /// Lines that are not part of the protocol (including indented subtest output) are ignored,
    /// as TAP consumers are required to do. Structural problems (a second plan, a malformed
    /// plan, an unterminated or unparseable diagnostic block) are errors.
    pub fn parse(input: &str) -> Result<Self, TapParseError> {
        let mut doc = TapDocument::default();
        let lines: Vec<&str> = input.lines().collect();
        // The item the next YAMLish block attaches to.
        let mut anchor = None;
        let mut index = 0;

        while index < lines.len() {
            let line = lines[index];
            let number = index + 1;
            index += 1;

            if line.starts_with([' ', '\t']) {
                if line.trim() == "---" {
                    let (diagnostic, consumed) = read_diagnostic(&lines[index..], number)?;
                    index += consumed;
                    match anchor {
                        Some(Anchor::Plan) => {
                            if let Some(plan) = &mut doc.plan {
                                plan.diagnostic = Some(diagnostic);
                            }
                        }
                        Some(Anchor::TestPoint(at)) => {
                            doc.test_points[at].diagnostic = Some(diagnostic);
                        }
                        None => {
                            return Err(TapParseError::new(
                                number,
                                TapParseErrorKind::OrphanDiagnostic,
                            ));
                        }
                    }
                    anchor = None;
                }
                continue;
            }

            let line = line.trim_end();

            if let Some(captures) = VERSION_RE.captures(line) {
                let version = &captures[1];
                doc.version = Some(version.parse().map_err(|_| {
                    TapParseError::new(
                        number,
                        TapParseErrorKind::InvalidVersion(version.to_owned()),
                    )
                })?);
                anchor = None;
            } else if let Some(captures) = PLAN_RE.captures(line) {
                if doc.plan.is_some() {
                    return Err(TapParseError::new(number, TapParseErrorKind::DuplicatePlan));
                }
                let invalid =
                    || TapParseError::new(number, TapParseErrorKind::InvalidPlan(line.to_owned()));
                let initial = captures[1].parse().map_err(|_| invalid())?;
                let last = captures[2].parse().map_err(|_| invalid())?;
                let skip = captures
                    .get(3)
                    .and_then(|comment| parse_directive(comment.as_str()))
                    .filter(|directive| directive.kind == DirectiveKind::Skip)
                    .map(|directive| directive.reason);
                doc.plan = Some(TapPlan {
                    initial,
                    last,
                    skip,
                    diagnostic: None,
                    line: number,
                });
                anchor = Some(Anchor::Plan);
            } else if PLAN_LIKE_RE.is_match(line) {
                return Err(TapParseError::new(
                    number,
                    TapParseErrorKind::InvalidPlan(line.to_owned()),
                ));
            } else if let Some(captures) = TEST_POINT_RE.captures(line) {
                let ok = &captures[1] == "ok";
                let number_in_stream = captures.get(2).and_then(|n| n.as_str().parse().ok());
                let (description, directive) = split_description(&captures[3]);
                doc.test_points.push(TapTestPoint {
                    ok,
                    number: number_in_stream,
                    description,
                    directive,
                    diagnostic: None,
                    line: number,
                });
                anchor = Some(Anchor::TestPoint(doc.test_points.len() - 1));
            } else if let Some(captures) = BAIL_OUT_RE.captures(line) {
                doc.bail_out = Some(TapBailOut {
                    reason: captures[1].trim().to_owned(),
                    line: number,
                });
                anchor = None;
            } else if let Some(comment) = line.strip_prefix('#') {
                doc.comments.push(comment.trim().to_owned());
            }
        }

        Ok(doc)
    }

    /// Returns true if the plan carries a `# SKIP` directive.
    pub fn is_plan_skipped(&self) -> bool {
        self.plan.as_ref().is_some_and(|plan| plan.skip.is_some())
    }

    /// Returns true if the plan is skipped or any test point carries a `# SKIP` directive.
    pub fn has_skip(&self) -> bool {
        self.is_plan_skipped() || self.test_points.iter().any(TapTestPoint::is_skip)
    }

    /// Returns true if any test point carries a `# TODO` directive.
    pub fn has_todo(&self) -> bool {
        self.test_points.iter().any(TapTestPoint::is_todo)
    }

    /// Returns true if any test point is `not ok`.
    pub fn has_not_ok(&self) -> bool {
        self.test_points.iter().any(|point| !point.ok)
    }
}

#[derive(Clone, Copy, Debug)]
enum Anchor {
    Plan,
    TestPoint(usize),
}

/// The `1..N` plan line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TapPlan {
    /// The first test number, normally 1.
    pub initial: u32,

    /// The last test number.
    pub last: u32,

    /// The reason given by a `# SKIP` directive on the plan.
    pub skip: Option<String>,

    /// A YAMLish block following the plan.
    pub diagnostic: Option<Value>,

    /// The 1-based line number of the plan.
    pub line: usize,
}

impl TapPlan {
    /// The number of test points the plan announces.
    pub fn expected(&self) -> u32 {
        let count = (u64::from(self.last) + 1).saturating_sub(u64::from(self.initial));
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

/// An `ok` or `not ok` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TapTestPoint {
    /// Whether the line starts with `ok`.
    pub ok: bool,

    /// The test number, if written.
    pub number: Option<u32>,

    /// The description, without the leading `-` separator.
    pub description: String,

    /// A `# SKIP` or `# TODO` directive.
    pub directive: Option<TapDirective>,

    /// The YAMLish block following this line.
    pub diagnostic: Option<Value>,

    /// The 1-based line number of this test point.
    pub line: usize,
}

impl TapTestPoint {
    /// Returns true if this test point carries a `# SKIP` directive.
    pub fn is_skip(&self) -> bool {
        self.directive
            .as_ref()
            .is_some_and(|directive| directive.kind == DirectiveKind::Skip)
    }

    /// Returns true if this test point carries a `# TODO` directive.
    pub fn is_todo(&self) -> bool {
        self.directive
            .as_ref()
            .is_some_and(|directive| directive.kind == DirectiveKind::Todo)
    }
}

impl fmt::Display for TapTestPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.ok { "ok" } else { "not ok" })?;
        if let Some(number) = self.number {
            write!(f, " {number}")?;
        }
        if !self.description.is_empty() {
            write!(f, " - {}", self.description)?;
        }
        if let Some(directive) = &self.directive {
            write!(f, " # {directive}")?;
        }
        Ok(())
    }
}

/// A directive attached to a test point or plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TapDirective {
    /// The kind of directive.
    pub kind: DirectiveKind,

    /// The text following the directive keyword.
    pub reason: String,
}

impl fmt::Display for TapDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self.kind {
            DirectiveKind::Skip => "SKIP",
            DirectiveKind::Todo => "TODO",
        };
        if self.reason.is_empty() {
            f.write_str(keyword)
        } else {
            write!(f, "{keyword} {}", self.reason)
        }
    }
}

/// The kind of a [`TapDirective`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `# SKIP`: the test was not run.
    Skip,
    /// `# TODO`: the test is not expected to pass yet.
    Todo,
}

/// A `Bail out!` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TapBailOut {
    /// The reason given, possibly empty.
    pub reason: String,

    /// The 1-based line number of the bail-out.
    pub line: usize,
}

/// Reads the YAMLish block following a `---` line, up to its `...` terminator.
///
/// Returns the parsed block and the number of lines consumed, including the terminator.
fn read_diagnostic(lines: &[&str], open_line: usize) -> Result<(Value, usize), TapParseError> {
    let Some(end) = lines.iter().position(|line| line.trim() == "...") else {
        return Err(TapParseError::new(
            open_line,
            TapParseErrorKind::UnterminatedDiagnostic,
        ));
    };

    let block = &lines[..end];
    let base_indent = block
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    let text = block
        .iter()
        .map(|line| line.get(base_indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    let yaml = serde_yaml::from_str(&text).map_err(|err| {
        let line = open_line + err.location().map_or(0, |location| location.line());
        TapParseError::new(line, TapParseErrorKind::Yamlish(err))
    })?;
    Ok((yaml, end + 1))
}

/// Splits the text after `ok N` into the description and an optional directive.
fn split_description(rest: &str) -> (String, Option<TapDirective>) {
    let (text, comment) = match find_unescaped_hash(rest) {
        Some(index) => (&rest[..index], Some(&rest[index + 1..])),
        None => (rest, None),
    };

    let text = text.trim();
    let text = text.strip_prefix('-').map(str::trim_start).unwrap_or(text);
    let description = text.replace("\\#", "#");
    let directive = comment.and_then(parse_directive);
    (description, directive)
}

fn find_unescaped_hash(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find(|&i| bytes[i] == b'#' && (i == 0 || bytes[i - 1] != b'\\'))
}

/// Parses `SKIP reason` or `TODO reason`; keywords match case-insensitively by prefix
/// (`skipped`, `Todo:` and friends are accepted).
fn parse_directive(comment: &str) -> Option<TapDirective> {
    let comment = comment.trim();
    let keyword_len = comment
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(comment.len());
    let keyword = comment[..keyword_len].to_ascii_lowercase();
    let kind = if keyword.starts_with("skip") {
        DirectiveKind::Skip
    } else if keyword.starts_with("todo") {
        DirectiveKind::Todo
    } else {
        return None;
    };
    let reason = comment[keyword_len..]
        .trim_start_matches(':')
        .trim()
        .to_owned();
    Some(TapDirective { kind, reason })
}
