// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The boundary to the test-management system.
//!
//! The reconciler never talks to the network itself. It hands finalized results to a
//! [`RemoteSync`] implementation, which reports each result and then uploads its attachments.

use crate::{errors::RemoteSyncError, event::ExecutionStatus};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The opaque identifier of an execution recorded by the remote system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub i64);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request to record the result of one test case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResultRequest {
    /// The test case ID.
    pub test_case_id: i64,

    /// The version-specific internal ID of the test case.
    pub internal_id: i64,

    /// The test plan ID.
    pub test_plan_id: i64,

    /// The outcome.
    pub status: ExecutionStatus,

    /// The build ID.
    pub build_id: i64,

    /// The build name.
    pub build_name: String,

    /// Notes describing the outcome.
    pub notes: String,

    /// The platform ID, if a platform was resolved.
    pub platform_id: Option<i64>,

    /// The platform name, if a platform was resolved.
    pub platform_name: Option<String>,

    /// The test case's custom fields.
    pub custom_fields: IndexMap<String, String>,
}

/// A request to attach a file to a recorded execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttachmentUpload<'a> {
    /// The execution to attach to.
    pub execution_id: ExecutionId,

    /// A short title.
    pub title: &'a str,

    /// An optional description.
    pub description: Option<&'a str>,

    /// The file name.
    pub file_name: &'a str,

    /// The MIME type.
    pub file_type: &'a str,

    /// The content, encoded as standard base64.
    pub content: &'a str,
}

/// Records results in the test-management system.
///
/// Calls are made sequentially, at most once per result; a failed call is not retried.
pub trait RemoteSync {
    /// Records a result and returns the ID of the new execution.
    fn report_result(&mut self, request: &ResultRequest) -> Result<ExecutionId, RemoteSyncError>;

    /// Attaches a file to an execution returned by [`report_result`](Self::report_result).
    fn upload_attachment(&mut self, upload: &AttachmentUpload<'_>) -> Result<(), RemoteSyncError>;
}

impl<T: RemoteSync + ?Sized> RemoteSync for &mut T {
    fn report_result(&mut self, request: &ResultRequest) -> Result<ExecutionId, RemoteSyncError> {
        (**self).report_result(request)
    }

    fn upload_attachment(&mut self, upload: &AttachmentUpload<'_>) -> Result<(), RemoteSyncError> {
        (**self).upload_attachment(upload)
    }
}
