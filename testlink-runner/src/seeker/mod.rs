// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seekers read reports of one format and flatten them into [`TestEvent`]s.
//!
//! The format decides how a report is read; the [`IdentityStrategy`] decides which level of the
//! report (suite, class, case, method, or file) becomes an event. Matching events to test cases
//! is left to the [`IdentityMatcher`].

mod junit;
mod tap;
mod testng;

use crate::{
    config::{IdentityStrategy, ReportFormat, SeekerConfig},
    errors::{ConfigValidationError, ReportParseError, ReportParseErrorKind},
    event::{ExecutionStatus, TestEvent},
    matcher::{IdentityMatcher, MatchPolicy},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fs::File, io::BufReader, time::Duration};
use test_reports::{JunitReport, TapDocument, TestngReport};

/// A report file found under the base directory.
#[derive(Copy, Clone, Debug)]
pub struct ReportFile<'a> {
    /// The base directory reports are scanned from.
    pub base_dir: &'a Utf8Path,

    /// The path of the report, relative to `base_dir`.
    pub relative_path: &'a Utf8Path,
}

impl ReportFile<'_> {
    /// Returns the path to the report.
    pub fn path(&self) -> Utf8PathBuf {
        self.base_dir.join(self.relative_path)
    }
}

/// A validated seeker.
#[derive(Clone, Debug)]
pub struct Seeker {
    config: SeekerConfig,
}

impl Seeker {
    /// Creates a seeker, validating its config. `index` is its position in the config.
    pub fn new(index: usize, config: SeekerConfig) -> Result<Self, ConfigValidationError> {
        config.validate(index)?;
        Ok(Self { config })
    }

    /// Returns the config for this seeker.
    pub fn config(&self) -> &SeekerConfig {
        &self.config
    }

    /// Returns the matcher for events produced by this seeker.
    pub fn matcher(&self) -> IdentityMatcher<'_> {
        let matcher = IdentityMatcher::new(
            &self.config.key_field,
            MatchPolicy {
                platform_suffix: self.config.platform_suffix,
            },
        );
        match (&self.config.identity, &self.config.data_provider_field) {
            (IdentityStrategy::MethodNameDataProvider, Some(field)) => {
                matcher.with_data_provider_field(field)
            }
            _ => matcher,
        }
    }

    /// Reads a report and flattens it into events, in document order.
    pub fn read_events(
        &self,
        report: ReportFile<'_>,
    ) -> Result<Vec<TestEvent>, ReportParseError> {
        let path = report.path();
        let events = match self.config.format {
            ReportFormat::Junit => {
                let parsed = JunitReport::parse(open(&path)?)
                    .map_err(|err| ReportParseError::new(&path, ReportParseErrorKind::Xml(err)))?;
                junit::events(&parsed, &self.config, &path)
            }
            ReportFormat::Testng => {
                let parsed = TestngReport::parse(open(&path)?)
                    .map_err(|err| ReportParseError::new(&path, ReportParseErrorKind::Xml(err)))?;
                testng::events(&parsed, &self.config, &path)
            }
            ReportFormat::Tap => {
                let input = std::fs::read_to_string(&path)
                    .map_err(|err| ReportParseError::new(&path, ReportParseErrorKind::Io(err)))?;
                let parsed = TapDocument::parse(&input)
                    .map_err(|err| ReportParseError::new(&path, ReportParseErrorKind::Tap(err)))?;
                tap::events(&parsed, &self.config, report)
            }
        };
        Ok(events)
    }
}

fn open(path: &Utf8Path) -> Result<BufReader<File>, ReportParseError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|err| ReportParseError::new(path, ReportParseErrorKind::Io(err)))
}

/// Reduces the statuses of a group (a class or a suite) to one status.
///
/// Skipped members are left out. A group is `Failed` if any remaining member failed and
/// `Passed` otherwise; a group whose members were all skipped is `Blocked`, and an empty group
/// is `NotRun`.
pub(crate) fn group_status(
    statuses: impl IntoIterator<Item = ExecutionStatus>,
) -> ExecutionStatus {
    let mut any_member = false;
    let mut any_retained = false;
    for status in statuses {
        any_member = true;
        match status {
            ExecutionStatus::Failed => return ExecutionStatus::Failed,
            ExecutionStatus::Blocked => {}
            ExecutionStatus::Passed | ExecutionStatus::NotRun => any_retained = true,
        }
    }
    match (any_member, any_retained) {
        (false, _) => ExecutionStatus::NotRun,
        (true, false) => ExecutionStatus::Blocked,
        (true, true) => ExecutionStatus::Passed,
    }
}

/// Formats a duration as seconds with millisecond precision.
pub(crate) fn format_seconds(duration: Duration) -> String {
    format!("{:.3}s", duration.as_secs_f64())
}
