// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized test events, the common currency between report seekers and the aggregator.

use crate::attachment::Attachment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a test, as understood by the test-management system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStatus {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test was skipped or could not run.
    Blocked,

    /// No result is known.
    NotRun,
}

impl ExecutionStatus {
    /// The single-letter code used by the test-management API.
    pub fn code(self) -> char {
        match self {
            Self::Passed => 'p',
            Self::Failed => 'f',
            Self::Blocked => 'b',
            Self::NotRun => 'n',
        }
    }

    /// Returns a human-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
            Self::NotRun => "not run",
        }
    }

    /// Combines statuses with failure dominance: failed beats blocked beats passed, and not-run
    /// contributes nothing.
    ///
    /// Returns `NotRun` if every status is `NotRun`, or if there are none.
    pub fn dominant(statuses: impl IntoIterator<Item = ExecutionStatus>) -> ExecutionStatus {
        statuses
            .into_iter()
            .fold(ExecutionStatus::NotRun, |acc, status| {
                if status.rank() > acc.rank() {
                    status
                } else {
                    acc
                }
            })
    }

    fn rank(self) -> u8 {
        match self {
            Self::NotRun => 0,
            Self::Passed => 1,
            Self::Blocked => 2,
            Self::Failed => 3,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single format-independent outcome extracted from a report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestEvent {
    /// The identity this event is matched on, e.g. a class name or a TAP file name.
    pub identity: String,

    /// The outcome.
    pub status: ExecutionStatus,

    /// Human-readable notes describing the outcome.
    pub notes: Option<String>,

    /// The platform the report declares, if any.
    pub platform: Option<String>,

    /// The TestNG data provider that produced this event, if any.
    pub data_provider: Option<String>,

    /// Files to upload alongside the result.
    pub attachments: Vec<Attachment>,
}

impl TestEvent {
    /// Creates a new event with no notes, platform, or attachments.
    pub fn new(identity: impl Into<String>, status: ExecutionStatus) -> Self {
        Self {
            identity: identity.into(),
            status,
            notes: None,
            platform: None,
            data_provider: None,
            attachments: Vec::new(),
        }
    }

    /// Sets the notes.
    pub fn set_notes(&mut self, notes: impl Into<String>) -> &mut Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the platform.
    pub fn set_platform(&mut self, platform: impl Into<String>) -> &mut Self {
        self.platform = Some(platform.into());
        self
    }

    /// Sets the data provider.
    pub fn set_data_provider(&mut self, data_provider: impl Into<String>) -> &mut Self {
        self.data_provider = Some(data_provider.into());
        self
    }

    /// Adds attachments.
    pub fn add_attachments(
        &mut self,
        attachments: impl IntoIterator<Item = Attachment>,
    ) -> &mut Self {
        self.attachments.extend(attachments);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use super::ExecutionStatus::*;

    #[test_case(&[], NotRun; "empty")]
    #[test_case(&[NotRun, NotRun], NotRun; "all not run")]
    #[test_case(&[Passed, NotRun], Passed; "not run is neutral")]
    #[test_case(&[Passed, Blocked], Blocked; "blocked beats passed")]
    #[test_case(&[Blocked, Failed, Passed], Failed; "failed beats everything")]
    #[test_case(&[Failed, NotRun], Failed; "not run does not mask failure")]
    fn dominant(statuses: &[ExecutionStatus], expected: ExecutionStatus) {
        assert_eq!(ExecutionStatus::dominant(statuses.iter().copied()), expected);
    }

    #[test]
    fn codes() {
        let codes: String = [Passed, Failed, Blocked, NotRun]
            .into_iter()
            .map(ExecutionStatus::code)
            .collect();
        assert_eq!(codes, "pfbn");
    }
}
