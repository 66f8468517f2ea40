// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TestNG XML reports (`testng-results.xml`).

use crate::{
    errors::XmlParseError,
    xml::{XmlVisitor, attr, attr_number, read_document},
};
use chrono::{DateTime, FixedOffset};
use quick_xml::events::BytesStart;
use std::{fmt, io::BufRead, str::FromStr, time::Duration};

static RESULTS_TAG: &[u8] = b"testng-results";
static SUITE_TAG: &[u8] = b"suite";
static TEST_TAG: &[u8] = b"test";
static CLASS_TAG: &[u8] = b"class";
static METHOD_TAG: &[u8] = b"test-method";
static VALUE_TAG: &[u8] = b"value";
static EXCEPTION_TAG: &[u8] = b"exception";
static MESSAGE_TAG: &[u8] = b"message";
static STACKTRACE_TAG: &[u8] = b"full-stacktrace";
static LINE_TAG: &[u8] = b"line";

static EXPECTED_ROOT: &str = "`<testng-results>`";

/// The root of a TestNG report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestngReport {
    /// The `total` count declared by the writer.
    pub total: usize,

    /// The `passed` count declared by the writer.
    pub passed: usize,

    /// The `failed` count declared by the writer.
    pub failed: usize,

    /// The `skipped` count declared by the writer.
    pub skipped: usize,

    /// The suites in this report.
    pub suites: Vec<TestngSuite>,
}

impl TestngReport {
    /// Reads a TestNG report from `input`.
    pub fn parse(input: impl BufRead) -> Result<Self, XmlParseError> {
        let mut visitor = TestngVisitor::default();
        match read_document(input, &mut visitor)? {
            Some(_) => Ok(visitor.report),
            None => Err(XmlParseError::Empty {
                expected: EXPECTED_ROOT,
            }),
        }
    }
}

/// A `<suite>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestngSuite {
    /// The suite name.
    pub name: String,

    /// Time taken by the suite.
    pub duration: Option<Duration>,

    /// When the suite started.
    pub started_at: Option<DateTime<FixedOffset>>,

    /// When the suite finished.
    pub finished_at: Option<DateTime<FixedOffset>>,

    /// The `<test>` elements of this suite.
    pub tests: Vec<TestngTest>,
}

impl TestngSuite {
    /// Iterates over every method of every class of every test, in document order.
    pub fn methods(&self) -> impl Iterator<Item = (&TestngClass, &TestngMethod)> {
        self.tests.iter().flat_map(|test| {
            test.classes
                .iter()
                .flat_map(|class| class.methods.iter().map(move |method| (class, method)))
        })
    }
}

/// A `<test>` within a suite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestngTest {
    /// The test name.
    pub name: String,

    /// Time taken by the test.
    pub duration: Option<Duration>,

    /// The classes exercised by this test.
    pub classes: Vec<TestngClass>,
}

/// A `<class>` within a test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestngClass {
    /// The fully qualified class name.
    pub name: String,

    /// The methods of this class that ran, including configuration methods.
    pub methods: Vec<TestngMethod>,
}

/// A `<test-method>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestngMethod {
    /// The method name.
    pub name: String,

    /// The method signature, as written by TestNG.
    pub signature: Option<String>,

    /// The outcome of the method.
    pub status: TestngStatus,

    /// Whether this is a configuration method (`@BeforeClass` and friends) rather than a test.
    pub is_config: bool,

    /// Time taken by the method.
    pub duration: Option<Duration>,

    /// When the method started.
    pub started_at: Option<DateTime<FixedOffset>>,

    /// When the method finished.
    pub finished_at: Option<DateTime<FixedOffset>>,

    /// The name of the data provider that fed this invocation.
    pub data_provider: Option<String>,

    /// The method description.
    pub description: Option<String>,

    /// Parameter values for this invocation.
    pub params: Vec<String>,

    /// The exception thrown by the method, if any.
    pub exception: Option<TestngException>,

    /// Lines written through TestNG's `Reporter`.
    pub reporter_output: Vec<String>,
}

/// An `<exception>` recorded for a method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestngException {
    /// The exception class.
    pub class: Option<String>,

    /// The exception message.
    pub message: Option<String>,

    /// The full stack trace.
    pub full_stacktrace: Option<String>,
}

/// The status string of a test method.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TestngStatus {
    /// `PASS`
    Pass,
    /// `FAIL`
    Fail,
    /// `SKIP`
    Skip,
}

impl TestngStatus {
    /// Returns the string TestNG writes for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
        }
    }
}

impl FromStr for TestngStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PASS" => Ok(Self::Pass),
            "FAIL" => Ok(Self::Fail),
            "SKIP" => Ok(Self::Skip),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TestngStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug)]
enum TextTarget {
    Param,
    Message,
    Stacktrace,
    ReporterLine,
}

#[derive(Debug, Default)]
struct TestngVisitor {
    report: TestngReport,
    depth: usize,
    method: Option<TestngMethod>,
    target: Option<TextTarget>,
    text: String,
}

impl TestngVisitor {
    fn current_class(&mut self) -> Option<&mut TestngClass> {
        self.report
            .suites
            .last_mut()?
            .tests
            .last_mut()?
            .classes
            .last_mut()
    }

    fn open_method(&mut self, element: &BytesStart<'_>) -> Result<(), XmlParseError> {
        if self.current_class().is_none() {
            return Err(XmlParseError::Misplaced {
                element: "test-method",
                parent: "class",
            });
        }

        let status_str = attr(element, "status")?.unwrap_or_default();
        let status: TestngStatus = status_str
            .parse()
            .map_err(|()| XmlParseError::InvalidValue {
                element: "test-method",
                attribute: "status",
                value: status_str,
            })?;

        self.method = Some(TestngMethod {
            name: attr(element, "name")?.unwrap_or_default(),
            signature: attr(element, "signature")?,
            status,
            is_config: attr(element, "is-config")?.is_some_and(|value| value == "true"),
            duration: duration_ms(element)?,
            started_at: timestamp(element, "started-at")?,
            finished_at: timestamp(element, "finished-at")?,
            data_provider: attr(element, "data-provider")?.filter(|value| !value.is_empty()),
            description: attr(element, "description")?,
            params: Vec::new(),
            exception: None,
            reporter_output: Vec::new(),
        });
        Ok(())
    }

    fn begin_text(&mut self, target: TextTarget) {
        if self.method.is_some() {
            self.target = Some(target);
            self.text.clear();
        }
    }

    fn finish_text(&mut self) {
        let (Some(target), Some(method)) = (self.target.take(), &mut self.method) else {
            return;
        };
        let text = std::mem::take(&mut self.text);
        match target {
            TextTarget::Param => method.params.push(text),
            TextTarget::ReporterLine => method.reporter_output.push(text),
            TextTarget::Message => {
                method.exception.get_or_insert_with(Default::default).message =
                    Some(text.trim().to_owned());
            }
            TextTarget::Stacktrace => {
                method
                    .exception
                    .get_or_insert_with(Default::default)
                    .full_stacktrace = Some(text);
            }
        }
    }
}

impl XmlVisitor for TestngVisitor {
    fn start(&mut self, element: &BytesStart<'_>) -> Result<(), XmlParseError> {
        let name = element.name();
        let name = name.as_ref();
        self.depth += 1;

        if self.depth == 1 {
            if name != RESULTS_TAG {
                return Err(XmlParseError::UnexpectedRoot {
                    found: String::from_utf8_lossy(name).into_owned(),
                    expected: EXPECTED_ROOT,
                });
            }
            self.report.total = attr_number(element, "total")?.unwrap_or(0);
            self.report.passed = attr_number(element, "passed")?.unwrap_or(0);
            self.report.failed = attr_number(element, "failed")?.unwrap_or(0);
            self.report.skipped = attr_number(element, "skipped")?.unwrap_or(0);
            return Ok(());
        }

        if name == SUITE_TAG {
            self.report.suites.push(TestngSuite {
                name: attr(element, "name")?.unwrap_or_default(),
                duration: duration_ms(element)?,
                started_at: timestamp(element, "started-at")?,
                finished_at: timestamp(element, "finished-at")?,
                tests: Vec::new(),
            });
        } else if name == TEST_TAG {
            let test = TestngTest {
                name: attr(element, "name")?.unwrap_or_default(),
                duration: duration_ms(element)?,
                classes: Vec::new(),
            };
            let Some(suite) = self.report.suites.last_mut() else {
                return Err(XmlParseError::Misplaced {
                    element: "test",
                    parent: "suite",
                });
            };
            suite.tests.push(test);
        } else if name == CLASS_TAG {
            let class = TestngClass {
                name: attr(element, "name")?.unwrap_or_default(),
                methods: Vec::new(),
            };
            let Some(test) = self
                .report
                .suites
                .last_mut()
                .and_then(|suite| suite.tests.last_mut())
            else {
                return Err(XmlParseError::Misplaced {
                    element: "class",
                    parent: "test",
                });
            };
            test.classes.push(class);
        } else if name == METHOD_TAG {
            self.open_method(element)?;
        } else if name == EXCEPTION_TAG {
            let class = attr(element, "class")?;
            if let Some(method) = &mut self.method {
                method.exception.get_or_insert_with(Default::default).class = class;
            }
        } else if name == VALUE_TAG {
            self.begin_text(TextTarget::Param);
        } else if name == MESSAGE_TAG {
            self.begin_text(TextTarget::Message);
        } else if name == STACKTRACE_TAG {
            self.begin_text(TextTarget::Stacktrace);
        } else if name == LINE_TAG {
            self.begin_text(TextTarget::ReporterLine);
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) -> Result<(), XmlParseError> {
        self.depth = self.depth.saturating_sub(1);

        if name == METHOD_TAG {
            if let Some(method) = self.method.take()
                && let Some(class) = self.current_class()
            {
                class.methods.push(method);
            }
        } else if name == VALUE_TAG
            || name == MESSAGE_TAG
            || name == STACKTRACE_TAG
            || name == LINE_TAG
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

fn duration_ms(element: &BytesStart<'_>) -> Result<Option<Duration>, XmlParseError> {
    Ok(attr_number::<u64>(element, "duration-ms")?.map(Duration::from_millis))
}

fn timestamp(
    element: &BytesStart<'_>,
    name: &str,
) -> Result<Option<DateTime<FixedOffset>>, XmlParseError> {
    Ok(attr(element, name)?.and_then(|value| DateTime::parse_from_rfc3339(value.trim()).ok()))
}
