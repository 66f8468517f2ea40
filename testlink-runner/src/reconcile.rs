// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reconciliation driver.
//!
//! A run has two phases. First, every seeker scans for its reports, flattens them into events
//! and feeds the matched contributions into the catalog. Then every test case with a verdict is
//! reported through [`RemoteSync`], followed by its attachments.

use crate::{
    aggregator::{Finalization, Verdict},
    catalog::{Catalog, TrackedTestCase},
    config::{ReconcileConfig, ReconcileSettings, SeekerConfig},
    errors::{ConfigValidationError, DisplayErrorChain, ReconcileError, RemoteSyncError},
    event::{ExecutionStatus, TestEvent},
    matcher::IdentityMatcher,
    remote::{AttachmentUpload, RemoteSync, ResultRequest},
    scan::{GlobScanner, ReportScanner},
    seeker::{ReportFile, Seeker},
};
use camino::Utf8Path;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

/// The overall result of a run, as reported to the build.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildOutcome {
    /// Everything was reported.
    #[default]
    Success,

    /// Some results or attachments could not be reported.
    Unstable,

    /// The build is marked as failed by configuration.
    Failure,
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Unstable => write!(f, "unstable"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Counts describing a finished run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSummary {
    /// Reports that were read successfully.
    pub reports_read: usize,

    /// Reports that failed to parse and were skipped.
    pub parse_errors: usize,

    /// Seekers whose scan failed.
    pub scan_errors: usize,

    /// Unusable key fields on tracked test cases.
    pub identity_errors: usize,

    /// Verdicts that were `Passed`.
    pub passed: usize,

    /// Verdicts that were `Failed`.
    pub failed: usize,

    /// Verdicts that were `Blocked`.
    pub blocked: usize,

    /// Test cases left without a verdict.
    pub not_run: usize,

    /// Results recorded by the remote system.
    pub updated: usize,

    /// Attachments uploaded.
    pub attachments_uploaded: usize,

    /// Attachments whose content could not be read.
    pub attachment_errors: usize,

    /// Remote calls that failed.
    pub sync_errors: usize,

    /// The overall outcome.
    pub outcome: BuildOutcome,
}

impl RunSummary {
    /// The number of verdicts produced.
    pub fn verdicts(&self) -> usize {
        self.passed + self.failed + self.blocked
    }

    fn count(&mut self, status: ExecutionStatus) {
        match status {
            ExecutionStatus::Passed => self.passed += 1,
            ExecutionStatus::Failed => self.failed += 1,
            ExecutionStatus::Blocked => self.blocked += 1,
            ExecutionStatus::NotRun => self.not_run += 1,
        }
    }

    /// Computes the outcome from the counts and the run settings.
    pub fn compute_outcome(&self, settings: &ReconcileSettings) -> BuildOutcome {
        if settings.failed_tests_mark_build_as_failure && self.failed > 0 {
            BuildOutcome::Failure
        } else if settings.fail_if_no_results && self.verdicts() == 0 {
            BuildOutcome::Failure
        } else if self.sync_errors > 0 || self.attachment_errors > 0 {
            BuildOutcome::Unstable
        } else {
            BuildOutcome::Success
        }
    }
}

/// Runs seekers over a base directory and reports the resulting verdicts.
pub struct Reconciler<'a> {
    settings: ReconcileSettings,
    seekers: Vec<Seeker>,
    base_dir: &'a Utf8Path,
    scanner: Box<dyn ReportScanner + 'a>,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler for the given config, scanning under `base_dir` with a
    /// [`GlobScanner`].
    pub fn new(
        config: &ReconcileConfig,
        base_dir: &'a Utf8Path,
    ) -> Result<Self, ConfigValidationError> {
        let seekers = config
            .seekers()
            .iter()
            .enumerate()
            .map(|(index, seeker)| Seeker::new(index, seeker.clone()))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            settings: *config.settings(),
            seekers,
            base_dir,
            scanner: Box::new(GlobScanner),
        })
    }

    /// Replaces the report scanner.
    pub fn with_scanner(mut self, scanner: impl ReportScanner + 'a) -> Self {
        self.scanner = Box::new(scanner);
        self
    }

    /// Runs the reconciliation: seeks results into `catalog`, then reports every verdict
    /// through `sync`.
    ///
    /// Errors local to one report or test case are logged and counted in the summary. Only a
    /// fatal [`RemoteSyncError`] stops the run; results already reported stay reported.
    pub fn run(
        &self,
        catalog: &mut Catalog,
        sync: &mut dyn RemoteSync,
    ) -> Result<RunSummary, ReconcileError> {
        let mut summary = RunSummary::default();
        check_identities(catalog, &mut summary);
        self.seek(catalog, &mut summary);

        for case in catalog.test_cases() {
            for verdict in verdicts(case, &mut summary) {
                summary.count(verdict.status);
                if let Err(err) = report(catalog, case, &verdict, sync, &mut summary) {
                    summary.outcome = summary.compute_outcome(&self.settings);
                    return Err(ReconcileError::SyncAborted {
                        test_case_id: case.spec().id,
                        summary: Box::new(summary),
                        err,
                    });
                }
            }
        }

        summary.outcome = summary.compute_outcome(&self.settings);
        info!(
            updated = summary.updated,
            passed = summary.passed,
            failed = summary.failed,
            blocked = summary.blocked,
            not_run = summary.not_run,
            outcome = %summary.outcome,
            "reconciliation finished"
        );
        Ok(summary)
    }

    /// Scans, parses and matches every report, recording contributions in `catalog`.
    pub fn seek(&self, catalog: &mut Catalog, summary: &mut RunSummary) {
        for (index, seeker) in self.seekers.iter().enumerate() {
            let config = seeker.config();
            let reports = match self.scanner.scan(self.base_dir, &config.include) {
                Ok(reports) => reports,
                Err(err) => {
                    error!(
                        seeker = index,
                        format = %config.format,
                        "{}",
                        DisplayErrorChain::new(&err)
                    );
                    summary.scan_errors += 1;
                    continue;
                }
            };
            if reports.is_empty() {
                warn!(
                    seeker = index,
                    include = %config.include,
                    "no reports found"
                );
            }

            let matcher = seeker.matcher();
            for relative_path in &reports {
                let report = ReportFile {
                    base_dir: self.base_dir,
                    relative_path,
                };
                let events = match seeker.read_events(report) {
                    Ok(events) => events,
                    Err(err) => {
                        warn!(path = %err.path(), "{}", DisplayErrorChain::new(&err));
                        summary.parse_errors += 1;
                        continue;
                    }
                };
                debug!(path = %relative_path, events = events.len(), "read report");
                summary.reports_read += 1;

                for event in &events {
                    apply_event(catalog, &matcher, config, event);
                }
            }
        }
    }
}

fn check_identities(catalog: &Catalog, summary: &mut RunSummary) {
    for case in catalog.test_cases() {
        for err in case.identity_errors() {
            warn!(test_case = case.spec().id, "{err}");
            summary.identity_errors += 1;
        }
    }
}

fn apply_event(
    catalog: &mut Catalog,
    matcher: &IdentityMatcher<'_>,
    config: &SeekerConfig,
    event: &TestEvent,
) {
    let notes = if config.include_notes {
        event.notes.as_deref()
    } else {
        None
    };

    for contribution in matcher.match_event(event, catalog) {
        let Some(case) = catalog.test_case_mut(contribution.case_index) else {
            continue;
        };
        debug!(
            test_case = case.spec().id,
            key_field = %contribution.key.field,
            key_value = %contribution.key.value,
            status = %contribution.status,
            "matched"
        );
        if config.test_points_as_executions {
            case.results.push_execution_point(
                contribution.key.clone(),
                contribution.status,
                contribution.platform.as_deref(),
                notes,
                &event.attachments,
            );
        }
        case.results.record(
            contribution.key,
            contribution.status,
            contribution.platform.as_deref(),
        );
        if let Some(notes) = notes {
            case.results.push_notes(notes);
        }
        case.results.push_attachments(&event.attachments);
    }
}

/// Returns the verdicts to report for a test case: its individual executions if any were
/// recorded, or else its aggregated verdict.
fn verdicts(case: &TrackedTestCase, summary: &mut RunSummary) -> Vec<Verdict> {
    if case.results().has_execution_points() {
        let executions = case.executions();
        if executions.is_empty() {
            summary.not_run += 1;
        }
        return executions;
    }

    match case.finalize() {
        Finalization::Complete(verdict) => vec![verdict],
        Finalization::Pending { filled, expected } => {
            debug!(
                test_case = case.spec().id,
                filled, expected, "not every key value has a result, leaving test case not run"
            );
            summary.not_run += 1;
            Vec::new()
        }
        Finalization::NotRun => {
            summary.not_run += 1;
            Vec::new()
        }
    }
}

fn result_request(catalog: &Catalog, case: &TrackedTestCase, verdict: &Verdict) -> ResultRequest {
    let spec = case.spec();
    let platform = verdict
        .platform
        .as_deref()
        .and_then(|name| {
            let found = catalog.test_plan().platform(name);
            if found.is_none() {
                debug!(
                    test_case = spec.id,
                    platform = name,
                    "platform is not defined in the test plan"
                );
            }
            found
        })
        .or(spec.platform.as_ref());

    ResultRequest {
        test_case_id: spec.id,
        internal_id: spec.internal_id,
        test_plan_id: catalog.test_plan().id,
        status: verdict.status,
        build_id: catalog.build().id,
        build_name: catalog.build().name.clone(),
        notes: verdict.notes.clone(),
        platform_id: platform.map(|platform| platform.id),
        platform_name: platform.map(|platform| platform.name.clone()),
        custom_fields: spec.custom_fields.clone(),
    }
}

/// Reports one verdict and uploads its attachments. Returns an error only if a remote call
/// failed fatally.
fn report(
    catalog: &Catalog,
    case: &TrackedTestCase,
    verdict: &Verdict,
    sync: &mut dyn RemoteSync,
    summary: &mut RunSummary,
) -> Result<(), RemoteSyncError> {
    let request = result_request(catalog, case, verdict);
    let execution_id = match sync.report_result(&request) {
        Ok(execution_id) => execution_id,
        Err(err) => {
            error!(test_case = request.test_case_id, "{}", DisplayErrorChain::new(&err));
            summary.sync_errors += 1;
            return if err.is_fatal() { Err(err) } else { Ok(()) };
        }
    };
    summary.updated += 1;
    info!(
        test_case = request.test_case_id,
        execution = %execution_id,
        status = %request.status,
        "reported result"
    );

    for attachment in &verdict.attachments {
        let content = match attachment.encode_base64() {
            Ok(content) => content,
            Err(err) => {
                warn!(test_case = request.test_case_id, "{}", DisplayErrorChain::new(&err));
                summary.attachment_errors += 1;
                continue;
            }
        };
        let upload = AttachmentUpload {
            execution_id,
            title: &attachment.title,
            description: attachment.description.as_deref(),
            file_name: &attachment.file_name,
            file_type: &attachment.file_type,
            content: &content,
        };
        match sync.upload_attachment(&upload) {
            Ok(()) => summary.attachments_uploaded += 1,
            Err(err) => {
                error!(
                    test_case = request.test_case_id,
                    file_name = %attachment.file_name,
                    "{}",
                    DisplayErrorChain::new(&err)
                );
                summary.sync_errors += 1;
                if err.is_fatal() {
                    return Err(err);
                }
            }
        }
    }
    Ok(())
}
