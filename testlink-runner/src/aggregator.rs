// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Accumulates match contributions per test case and reduces them to a verdict.
//!
//! A test case receives one outcome per key value it was matched on. Later contributions to
//! the same key value replace earlier ones. Once every key value configured for the test case
//! has an outcome, the outcomes are reduced with failure dominance (see
//! [`ExecutionStatus::dominant`]).

use crate::{attachment::Attachment, catalog::TrackedTestCase, event::ExecutionStatus};
use indexmap::IndexMap;

/// One key value on a test case: a key field name and one candidate stored in it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyValue {
    /// The key field name.
    pub field: String,

    /// The candidate value.
    pub value: String,
}

impl KeyValue {
    /// Creates a new key value.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Results accumulated for a test case during one run.
#[derive(Clone, Debug, Default)]
pub struct CaseResults {
    outcomes: IndexMap<KeyValue, ExecutionStatus>,
    notes: Vec<String>,
    attachments: Vec<Attachment>,
    platform: Option<String>,
    points: Vec<ExecutionPoint>,
}

/// A contribution kept to be reported as its own execution.
#[derive(Clone, Debug)]
struct ExecutionPoint {
    key: KeyValue,
    status: ExecutionStatus,
    platform: Option<String>,
    notes: Option<String>,
    attachments: Vec<Attachment>,
}

impl CaseResults {
    /// Records the outcome for a key value, replacing any earlier outcome for it.
    pub(crate) fn record(
        &mut self,
        key: KeyValue,
        status: ExecutionStatus,
        platform: Option<&str>,
    ) {
        self.outcomes.insert(key, status);
        if let Some(platform) = platform {
            self.platform = Some(platform.to_owned());
        }
    }

    pub(crate) fn push_notes(&mut self, notes: &str) {
        self.notes.push(notes.to_owned());
    }

    pub(crate) fn push_attachments<'a>(
        &mut self,
        attachments: impl IntoIterator<Item = &'a Attachment>,
    ) {
        for attachment in attachments {
            if !self.attachments.contains(attachment) {
                self.attachments.push(attachment.clone());
            }
        }
    }

    /// Keeps a contribution to be reported as its own execution. The outcome must also be
    /// passed to [`Self::record`].
    pub(crate) fn push_execution_point(
        &mut self,
        key: KeyValue,
        status: ExecutionStatus,
        platform: Option<&str>,
        notes: Option<&str>,
        attachments: &[Attachment],
    ) {
        self.points.push(ExecutionPoint {
            key,
            status,
            platform: platform.map(str::to_owned),
            notes: notes.map(str::to_owned),
            attachments: attachments.to_vec(),
        });
    }

    /// Returns the outcome recorded for each key value, in first-contribution order.
    pub fn outcomes(&self) -> &IndexMap<KeyValue, ExecutionStatus> {
        &self.outcomes
    }

    /// Returns the notes log.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Returns the attachments collected so far.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Returns the platform carried by the most recent contribution that had one.
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// Returns true if contributions were kept to be reported as individual executions.
    pub fn has_execution_points(&self) -> bool {
        !self.points.is_empty()
    }
}

/// A finalized result for one test case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    /// The ID of the test case.
    pub test_case_id: i64,

    /// The reduced outcome. Never `NotRun` for a verdict that is sent.
    pub status: ExecutionStatus,

    /// The notes log joined into one string.
    pub notes: String,

    /// The platform name carried by the contributions, if any.
    pub platform: Option<String>,

    /// Files to upload after the result is reported.
    pub attachments: Vec<Attachment>,
}

/// The state of a test case after aggregation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Finalization {
    /// Some key values have not received a contribution.
    Pending {
        /// Key values with an outcome.
        filled: usize,

        /// Key values that need one.
        expected: usize,
    },

    /// Every key value has an outcome, but all of them are `NotRun`.
    NotRun,

    /// A verdict to report.
    Complete(Verdict),
}

impl TrackedTestCase {
    /// Returns true once every configured key value has received a contribution.
    pub fn is_complete(&self) -> bool {
        self.results.outcomes.len() >= self.expected_contributions()
    }

    /// Returns the effective status: `NotRun` until complete, then the reduced outcome.
    pub fn status(&self) -> ExecutionStatus {
        if self.is_complete() {
            ExecutionStatus::dominant(self.results.outcomes.values().copied())
        } else {
            ExecutionStatus::NotRun
        }
    }

    /// Reduces the accumulated results to a verdict.
    pub fn finalize(&self) -> Finalization {
        let expected = self.expected_contributions();
        let filled = self.results.outcomes.len();
        if filled < expected {
            return Finalization::Pending { filled, expected };
        }

        match self.status() {
            ExecutionStatus::NotRun => Finalization::NotRun,
            status => Finalization::Complete(Verdict {
                test_case_id: self.spec().id,
                status,
                notes: self.results.notes.join("\n"),
                platform: self.results.platform.clone(),
                attachments: self.results.attachments.clone(),
            }),
        }
    }

    /// Returns one verdict per execution point, in contribution order.
    ///
    /// Each point is reduced together with the final outcomes of the other key values, so
    /// every contribution is visible regardless of the order seekers ran in. Returns nothing
    /// until the test case is complete. Points whose reduced outcome is `NotRun` are dropped.
    pub fn executions(&self) -> Vec<Verdict> {
        if !self.is_complete() {
            return Vec::new();
        }

        self.results
            .points
            .iter()
            .filter_map(|point| {
                let others = self
                    .results
                    .outcomes
                    .iter()
                    .filter(|(key, _)| **key != point.key)
                    .map(|(_, status)| *status);
                let status = ExecutionStatus::dominant(others.chain([point.status]));
                (status != ExecutionStatus::NotRun).then(|| Verdict {
                    test_case_id: self.spec().id,
                    status,
                    notes: point.notes.clone().unwrap_or_default(),
                    platform: point
                        .platform
                        .clone()
                        .or_else(|| self.results.platform.clone()),
                    attachments: point.attachments.clone(),
                })
            })
            .collect()
    }
}
