// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testlink-runner.

use crate::{
    config::{IdentityStrategy, ReportFormat},
    reconcile::RunSummary,
};
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, fmt, io};
use test_reports::errors::{TapParseError, XmlParseError};
use thiserror::Error;

/// An error that occurred while reading the reconciliation config.
#[derive(Debug, Error)]
#[error("failed to parse testlink config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while reading the config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// The config deserialized, but describes a seeker that cannot work.
    #[error(transparent)]
    ValidationError(ConfigValidationError),
}

/// A seeker config that names an unsupported combination of settings.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("seeker {index} ({format}, {identity}): {reason}")]
pub struct ConfigValidationError {
    index: usize,
    format: ReportFormat,
    identity: IdentityStrategy,
    reason: ConfigValidationReason,
}

impl ConfigValidationError {
    pub(crate) fn new(
        index: usize,
        format: ReportFormat,
        identity: IdentityStrategy,
        reason: ConfigValidationReason,
    ) -> Self {
        Self {
            index,
            format,
            identity,
            reason,
        }
    }

    /// The index of the offending `[[seeker]]` table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The reason validation failed.
    pub fn reason(&self) -> &ConfigValidationReason {
        &self.reason
    }
}

/// Why a seeker failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigValidationReason {
    /// The format cannot produce identities with this strategy.
    UnsupportedIdentity,

    /// `include` is empty.
    EmptyInclude,

    /// `key-field` is empty.
    EmptyKeyField,

    /// The data-provider strategy was chosen without `data-provider-field`.
    MissingDataProviderField,

    /// A TAP-only option was set on a non-TAP seeker.
    TapOnlyOption(&'static str),
}

impl fmt::Display for ConfigValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedIdentity => {
                write!(f, "identity strategy not supported by this format")
            }
            Self::EmptyInclude => write!(f, "`include` must not be empty"),
            Self::EmptyKeyField => write!(f, "`key-field` must not be empty"),
            Self::MissingDataProviderField => {
                write!(f, "`data-provider-field` is required for this identity strategy")
            }
            Self::TapOnlyOption(option) => write!(f, "`{option}` only applies to TAP seekers"),
        }
    }
}

/// An error that occurred while loading a catalog snapshot.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogLoadError {
    /// The catalog file could not be read.
    #[error("failed to read catalog at `{path}`")]
    Read {
        /// The path to the catalog.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The catalog is not valid JSON, or has the wrong shape.
    #[error("failed to deserialize catalog{}", .path.as_ref().map(|p| format!(" at `{p}`")).unwrap_or_default())]
    Deserialize {
        /// The path to the catalog, if it was read from a file.
        path: Option<Utf8PathBuf>,

        /// The underlying error.
        #[source]
        err: serde_path_to_error::Error<serde_json::Error>,
    },
}

/// An error that occurred while scanning for report files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScanError {
    /// An include pattern is not a valid glob.
    #[error("invalid include pattern `{pattern}`")]
    InvalidPattern {
        /// The pattern.
        pattern: String,

        /// The underlying error.
        #[source]
        err: globset::Error,
    },

    /// The include expression contained no patterns.
    #[error("include expression `{include}` contains no patterns")]
    NoPatterns {
        /// The include expression.
        include: String,
    },

    /// An error occurred while walking the base directory.
    #[error("error walking `{base_dir}`")]
    Walk {
        /// The directory being walked.
        base_dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: walkdir::Error,
    },
}

/// An error that occurred while reading a single report file.
///
/// Parse errors are scoped to one file: the file is skipped and the run continues.
#[derive(Debug, Error)]
#[error("failed to parse report `{path}`")]
pub struct ReportParseError {
    path: Utf8PathBuf,
    #[source]
    kind: ReportParseErrorKind,
}

impl ReportParseError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, kind: ReportParseErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// The report that failed to parse.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }

    /// The kind of error.
    pub fn kind(&self) -> &ReportParseErrorKind {
        &self.kind
    }
}

/// The kind of error encountered while reading a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportParseErrorKind {
    /// The file could not be read.
    #[error("error reading file")]
    Io(#[source] io::Error),

    /// The file is not a valid JUnit or TestNG report.
    #[error(transparent)]
    Xml(XmlParseError),

    /// The file is not a valid TAP stream.
    #[error(transparent)]
    Tap(TapParseError),
}

/// A tracked test case whose key custom field cannot be used for matching.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("test case {test_case_id} ({name}): key field `{key_field}` is {kind}")]
pub struct IdentityError {
    test_case_id: i64,
    name: String,
    key_field: String,
    kind: IdentityErrorKind,
}

impl IdentityError {
    pub(crate) fn new(
        test_case_id: i64,
        name: impl Into<String>,
        key_field: impl Into<String>,
        kind: IdentityErrorKind,
    ) -> Self {
        Self {
            test_case_id,
            name: name.into(),
            key_field: key_field.into(),
            kind,
        }
    }

    /// The ID of the test case.
    pub fn test_case_id(&self) -> i64 {
        self.test_case_id
    }

    /// The key field that could not be used.
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Why the key field could not be used.
    pub fn kind(&self) -> IdentityErrorKind {
        self.kind
    }
}

/// Why a key field is unusable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdentityErrorKind {
    /// The test case has no custom field with this name.
    Missing,

    /// The custom field holds no values.
    Blank,
}

impl fmt::Display for IdentityErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Blank => write!(f, "blank"),
        }
    }
}

/// An attachment's content could not be read for upload.
#[derive(Debug, Error)]
#[error("failed to read attachment `{path}`")]
pub struct AttachmentReadError {
    path: Utf8PathBuf,
    #[source]
    err: io::Error,
}

impl AttachmentReadError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, err: io::Error) -> Self {
        Self {
            path: path.into(),
            err,
        }
    }

    /// The path that could not be read.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

/// An error returned by a [`RemoteSync`](crate::remote::RemoteSync) implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RemoteSyncError {
    message: String,
    fatal: bool,
    #[source]
    source: Option<Box<dyn error::Error + Send + Sync>>,
}

impl RemoteSyncError {
    /// Creates a new, non-fatal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
            source: None,
        }
    }

    /// Creates a new, non-fatal error wrapping the given source.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            fatal: false,
            source: Some(source.into()),
        }
    }

    /// Marks this error as fatal: no further test cases are reported after it.
    pub fn into_fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    /// Returns true if the remaining test cases must not be reported.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }
}

/// A reconciliation run that was cut short.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    /// A fatal remote error stopped the run. Work already done is described by `summary`.
    #[error("reporting test case {test_case_id} failed fatally, remaining test cases skipped")]
    SyncAborted {
        /// The test case being reported when the error occurred.
        test_case_id: i64,

        /// The run summary up to the point of failure.
        summary: Box<RunSummary>,

        /// The underlying error.
        #[source]
        err: RemoteSyncError,
    },
}

/// Displays an error along with its chain of sources, one per line.
pub struct DisplayErrorChain<E> {
    error: E,
    initial_indent: usize,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self {
            error,
            initial_indent: 0,
        }
    }

    /// Creates a new `DisplayErrorChain` that indents every line by `initial_indent` spaces.
    pub fn new_with_initial_indent(initial_indent: usize, error: E) -> Self {
        Self {
            error,
            initial_indent,
        }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = " ".repeat(self.initial_indent);
        write!(f, "{indent}{}", self.error)?;

        let mut next_error = self.error.source();
        while let Some(err) = next_error {
            write!(f, "\n{indent}  caused by:\n{indent}  - {err}")?;
            next_error = err.source();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_error_chain() {
        let err = ReportParseError::new(
            "reports/TEST-a.xml",
            ReportParseErrorKind::Io(io::Error::new(io::ErrorKind::NotFound, "no such file")),
        );
        assert_eq!(
            DisplayErrorChain::new(&err).to_string(),
            "failed to parse report `reports/TEST-a.xml`\n  \
               caused by:\n  \
               - error reading file\n  \
               caused by:\n  \
               - no such file",
        );
        assert_eq!(
            DisplayErrorChain::new_with_initial_indent(2, &err)
                .to_string()
                .lines()
                .next(),
            Some("  failed to parse report `reports/TEST-a.xml`"),
        );
    }

    #[test]
    fn remote_sync_error_fatality() {
        let err = RemoteSyncError::new("connection reset");
        assert!(!err.is_fatal());
        assert!(err.into_fatal().is_fatal());
    }
}
