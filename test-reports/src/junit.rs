// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JUnit/XUnit XML reports.

use crate::{
    errors::XmlParseError,
    xml::{XmlVisitor, attr, attr_number, parse_seconds, read_document},
};
use indexmap::IndexMap;
use quick_xml::events::BytesStart;
use std::{io::BufRead, time::Duration};

static TESTSUITES_TAG: &[u8] = b"testsuites";
static TESTSUITE_TAG: &[u8] = b"testsuite";
static TESTCASE_TAG: &[u8] = b"testcase";
static PROPERTY_TAG: &[u8] = b"property";
static FAILURE_TAG: &[u8] = b"failure";
static ERROR_TAG: &[u8] = b"error";
static SKIPPED_TAG: &[u8] = b"skipped";
static SYSTEM_OUT_TAG: &[u8] = b"system-out";
static SYSTEM_ERR_TAG: &[u8] = b"system-err";

static EXPECTED_ROOT: &str = "`<testsuites>` or `<testsuite>`";

/// The root of a JUnit report.
///
/// Both `<testsuites>`-wrapped documents and bare `<testsuite>` documents are accepted. Nested
/// test suites are flattened into [`testsuites`](Self::testsuites) in the order their start tags
/// appear.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JunitReport {
    /// The name of the `<testsuites>` element, if there was one.
    pub name: Option<String>,

    /// The test suites contained in this report.
    pub testsuites: Vec<JunitTestSuite>,
}

impl JunitReport {
    /// Reads a JUnit report from `input`.
    pub fn parse(input: impl BufRead) -> Result<Self, XmlParseError> {
        let mut visitor = JunitVisitor::default();
        match read_document(input, &mut visitor)? {
            Some(_) => Ok(visitor.report),
            None => Err(XmlParseError::Empty {
                expected: EXPECTED_ROOT,
            }),
        }
    }

    /// Iterates over every test case in every suite, in document order.
    pub fn testcases(&self) -> impl Iterator<Item = (&JunitTestSuite, &JunitTestCase)> {
        self.testsuites
            .iter()
            .flat_map(|suite| suite.testcases.iter().map(move |case| (suite, case)))
    }
}

/// A single `<testsuite>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JunitTestSuite {
    /// The name of this test suite.
    pub name: String,

    /// The `tests` count declared by the writer.
    pub tests: usize,

    /// The `failures` count declared by the writer.
    pub failures: usize,

    /// The `errors` count declared by the writer.
    pub errors: usize,

    /// The `skipped` count declared by the writer.
    pub skipped: usize,

    /// The overall time taken by the test suite.
    pub time: Option<Duration>,

    /// The timestamp at which the suite started, as written.
    pub timestamp: Option<String>,

    /// The host the suite ran on.
    pub hostname: Option<String>,

    /// The test cases in this suite.
    pub testcases: Vec<JunitTestCase>,

    /// Properties recorded for this suite.
    pub properties: IndexMap<String, String>,

    /// Data written to standard output while the suite was executed.
    pub system_out: Option<String>,

    /// Data written to standard error while the suite was executed.
    pub system_err: Option<String>,
}

impl JunitTestSuite {
    /// Returns true if any test case failed or errored, or if the writer declared failures
    /// for a suite without test cases.
    pub fn has_non_success(&self) -> bool {
        if self.testcases.is_empty() {
            return self.failures + self.errors > 0;
        }
        self.testcases
            .iter()
            .any(|case| matches!(case.status, JunitStatus::NonSuccess { .. }))
    }

    /// Returns true if the suite has test cases and all of them were skipped.
    pub fn is_all_skipped(&self) -> bool {
        !self.testcases.is_empty()
            && self
                .testcases
                .iter()
                .all(|case| matches!(case.status, JunitStatus::Skipped { .. }))
    }
}

/// A single `<testcase>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JunitTestCase {
    /// The name of the test case.
    pub name: String,

    /// The "classname" of the test case: typically the fully qualified class or module path.
    pub classname: Option<String>,

    /// The time it took to execute this test case.
    pub time: Option<Duration>,

    /// The status of this test case.
    pub status: JunitStatus,

    /// Data written to standard output while the test case was executed.
    pub system_out: Option<String>,

    /// Data written to standard error while the test case was executed.
    pub system_err: Option<String>,
}

impl JunitTestCase {
    fn new(name: String) -> Self {
        Self {
            name,
            classname: None,
            time: None,
            status: JunitStatus::Success,
            system_out: None,
            system_err: None,
        }
    }
}

/// The outcome of a test case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JunitStatus {
    /// The test case passed.
    Success,

    /// The test case failed or errored.
    NonSuccess {
        /// Whether this was a `<failure>` or an `<error>`.
        kind: NonSuccessKind,

        /// The `message` attribute.
        message: Option<String>,

        /// The `type` attribute.
        ty: Option<String>,

        /// The text of the element, usually a stack trace.
        description: Option<String>,
    },

    /// The test case was not run.
    Skipped {
        /// The `message` attribute.
        message: Option<String>,

        /// The text of the element.
        description: Option<String>,
    },
}

impl JunitStatus {
    fn description_mut(&mut self) -> Option<&mut Option<String>> {
        match self {
            Self::Success => None,
            Self::NonSuccess { description, .. } | Self::Skipped { description, .. } => {
                Some(description)
            }
        }
    }
}

/// Whether a non-successful test case failed in an expected way or an unexpected way.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NonSuccessKind {
    /// An expected failure, written as `<failure>`.
    Failure,

    /// An unexpected error, written as `<error>`.
    Error,
}

#[derive(Copy, Clone, Debug)]
enum TextTarget {
    Status,
    CaseOut,
    CaseErr,
    SuiteOut,
    SuiteErr,
}

#[derive(Debug, Default)]
struct JunitVisitor {
    report: JunitReport,
    // Indexes into report.testsuites for the currently open suites.
    open_suites: Vec<usize>,
    case: Option<JunitTestCase>,
    target: Option<TextTarget>,
    text: String,
    depth: usize,
}

impl JunitVisitor {
    fn current_suite(&mut self) -> Option<&mut JunitTestSuite> {
        let index = *self.open_suites.last()?;
        self.report.testsuites.get_mut(index)
    }

    fn open_suite(&mut self, element: &BytesStart<'_>) -> Result<(), XmlParseError> {
        let suite = JunitTestSuite {
            name: attr(element, "name")?.unwrap_or_default(),
            tests: attr_number(element, "tests")?.unwrap_or(0),
            failures: attr_number(element, "failures")?.unwrap_or(0),
            errors: attr_number(element, "errors")?.unwrap_or(0),
            skipped: attr_number(element, "skipped")?
                .or(attr_number(element, "disabled")?)
                .unwrap_or(0),
            time: attr(element, "time")?.as_deref().and_then(parse_seconds),
            timestamp: attr(element, "timestamp")?,
            hostname: attr(element, "hostname")?,
            ..JunitTestSuite::default()
        };
        self.open_suites.push(self.report.testsuites.len());
        self.report.testsuites.push(suite);
        Ok(())
    }

    fn open_case(&mut self, element: &BytesStart<'_>) -> Result<(), XmlParseError> {
        if self.open_suites.is_empty() {
            return Err(XmlParseError::Misplaced {
                element: "testcase",
                parent: "testsuite",
            });
        }
        let mut case = JunitTestCase::new(attr(element, "name")?.unwrap_or_default());
        case.classname = attr(element, "classname")?;
        case.time = attr(element, "time")?.as_deref().and_then(parse_seconds);
        self.case = Some(case);
        Ok(())
    }

    fn set_status(&mut self, element: &BytesStart<'_>, tag: &[u8]) -> Result<(), XmlParseError> {
        let message = attr(element, "message")?;
        let Some(case) = &mut self.case else {
            return Err(XmlParseError::Misplaced {
                element: if tag == SKIPPED_TAG {
                    "skipped"
                } else if tag == ERROR_TAG {
                    "error"
                } else {
                    "failure"
                },
                parent: "testcase",
            });
        };

        let status = if tag == SKIPPED_TAG {
            JunitStatus::Skipped {
                message,
                description: None,
            }
        } else {
            let kind = if tag == ERROR_TAG {
                NonSuccessKind::Error
            } else {
                NonSuccessKind::Failure
            };
            JunitStatus::NonSuccess {
                kind,
                message,
                ty: attr(element, "type")?,
                description: None,
            }
        };

        // A failure recorded earlier for the same case is never downgraded by a later
        // `<skipped>`.
        if !matches!(
            (&case.status, &status),
            (JunitStatus::NonSuccess { .. }, JunitStatus::Skipped { .. })
        ) {
            case.status = status;
        }
        self.begin_text(TextTarget::Status);
        Ok(())
    }

    fn begin_text(&mut self, target: TextTarget) {
        self.target = Some(target);
        self.text.clear();
    }

    fn finish_text(&mut self) {
        let Some(target) = self.target.take() else {
            return;
        };
        let text = std::mem::take(&mut self.text);
        let text = (!text.is_empty()).then_some(text);
        match target {
            TextTarget::Status => {
                if let Some(description) = self
                    .case
                    .as_mut()
                    .and_then(|case| case.status.description_mut())
                    && description.is_none()
                {
                    *description = text;
                }
            }
            TextTarget::CaseOut => {
                if let Some(case) = &mut self.case {
                    case.system_out = text;
                }
            }
            TextTarget::CaseErr => {
                if let Some(case) = &mut self.case {
                    case.system_err = text;
                }
            }
            TextTarget::SuiteOut => {
                if let Some(suite) = self.current_suite() {
                    suite.system_out = text;
                }
            }
            TextTarget::SuiteErr => {
                if let Some(suite) = self.current_suite() {
                    suite.system_err = text;
                }
            }
        }
    }
}

impl XmlVisitor for JunitVisitor {
    fn start(&mut self, element: &BytesStart<'_>) -> Result<(), XmlParseError> {
        let name = element.name();
        let name = name.as_ref();
        self.depth += 1;

        if self.depth == 1 && name != TESTSUITES_TAG && name != TESTSUITE_TAG {
            return Err(XmlParseError::UnexpectedRoot {
                found: String::from_utf8_lossy(name).into_owned(),
                expected: EXPECTED_ROOT,
            });
        }

        if name == TESTSUITES_TAG {
            if self.depth == 1 {
                self.report.name = attr(element, "name")?;
            }
        } else if name == TESTSUITE_TAG {
            self.open_suite(element)?;
        } else if name == TESTCASE_TAG {
            self.open_case(element)?;
        } else if name == FAILURE_TAG || name == ERROR_TAG || name == SKIPPED_TAG {
            self.set_status(element, name)?;
        } else if name == SYSTEM_OUT_TAG {
            let target = if self.case.is_some() {
                TextTarget::CaseOut
            } else {
                TextTarget::SuiteOut
            };
            self.begin_text(target);
        } else if name == SYSTEM_ERR_TAG {
            let target = if self.case.is_some() {
                TextTarget::CaseErr
            } else {
                TextTarget::SuiteErr
            };
            self.begin_text(target);
        } else if name == PROPERTY_TAG {
            let key = attr(element, "name")?;
            let value = attr(element, "value")?.unwrap_or_default();
            if let (Some(key), Some(suite)) = (key, self.current_suite()) {
                suite.properties.insert(key, value);
            }
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) -> Result<(), XmlParseError> {
        self.depth = self.depth.saturating_sub(1);

        if name == TESTCASE_TAG {
            self.finish_text();
            if let Some(case) = self.case.take()
                && let Some(suite) = self.current_suite()
            {
                suite.testcases.push(case);
            }
        } else if name == TESTSUITE_TAG {
            self.open_suites.pop();
        } else if name == FAILURE_TAG
            || name == ERROR_TAG
            || name == SKIPPED_TAG
            || name == SYSTEM_OUT_TAG
            || name == SYSTEM_ERR_TAG
        {
            self.finish_text();
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.target.is_some() {
            self.text.push_str(text);
        }
    }
}
