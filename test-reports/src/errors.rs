// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use thiserror::Error;

/// An error that occurs while reading a JUnit or TestNG XML report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum XmlParseError {
    /// The document is not well-formed XML.
    #[error("malformed XML at byte offset {position}")]
    Syntax {
        /// The byte offset at which the error was detected.
        position: u64,

        /// The underlying error.
        #[source]
        err: quick_xml::Error,
    },

    /// An attribute or text node of an element could not be decoded.
    #[error("failed to decode content of `<{element}>`")]
    Content {
        /// The element whose content failed to decode.
        element: String,

        /// The underlying error.
        #[source]
        err: quick_xml::Error,
    },

    /// An attribute has a value outside its known set.
    #[error("invalid value `{value}` for attribute `{attribute}` on `<{element}>`")]
    InvalidValue {
        /// The element carrying the attribute.
        element: &'static str,

        /// The attribute name.
        attribute: &'static str,

        /// The value that was found.
        value: String,
    },

    /// An element appeared outside the parent it requires.
    #[error("`<{element}>` found outside of `<{parent}>`")]
    Misplaced {
        /// The misplaced element.
        element: &'static str,

        /// The parent element that was expected.
        parent: &'static str,
    },

    /// The root element is not the one the format requires.
    #[error("unexpected root element `<{found}>` (expected {expected})")]
    UnexpectedRoot {
        /// The root element that was found.
        found: String,

        /// A description of the accepted root elements.
        expected: &'static str,
    },

    /// The document ended while elements were still open.
    #[error("document ended before `<{element}>` was closed")]
    UnclosedElement {
        /// The innermost element that was left open.
        element: String,
    },

    /// The document contains no elements at all.
    #[error("document is empty (expected {expected})")]
    Empty {
        /// A description of the accepted root elements.
        expected: &'static str,
    },
}

/// An error that occurs while reading a TAP stream.
#[derive(Debug, Error)]
#[error("line {line}: {kind}")]
pub struct TapParseError {
    line: usize,
    kind: TapParseErrorKind,
}

impl TapParseError {
    pub(crate) fn new(line: usize, kind: TapParseErrorKind) -> Self {
        Self { line, kind }
    }

    /// The 1-based line number at which the error was detected.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The kind of error.
    pub fn kind(&self) -> &TapParseErrorKind {
        &self.kind
    }
}

/// The kind of a [`TapParseError`].
#[derive(Debug)]
#[non_exhaustive]
pub enum TapParseErrorKind {
    /// The `TAP version` header has a non-numeric version.
    InvalidVersion(String),

    /// A line looks like a plan but cannot be parsed as one.
    InvalidPlan(String),

    /// A second plan was found.
    DuplicatePlan,

    /// A YAMLish block was opened with `---` but never closed with `...`.
    UnterminatedDiagnostic,

    /// A YAMLish block does not follow a test point or a plan.
    OrphanDiagnostic,

    /// A YAMLish block could not be parsed.
    Yamlish(serde_yaml::Error),
}

impl fmt::Display for TapParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVersion(version) => write!(f, "invalid TAP version `{version}`"),
            Self::InvalidPlan(plan) => write!(f, "invalid plan `{plan}`"),
            Self::DuplicatePlan => write!(f, "more than one plan in the stream"),
            Self::UnterminatedDiagnostic => {
                write!(f, "diagnostic block opened with `---` is never closed with `...`")
            }
            Self::OrphanDiagnostic => {
                write!(f, "diagnostic block does not follow a test point or plan")
            }
            Self::Yamlish(err) => write!(f, "invalid diagnostic block: {err}"),
        }
    }
}
