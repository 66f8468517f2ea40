// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use testlink_runner::{
    catalog::{Catalog, CatalogSnapshot},
    errors::RemoteSyncError,
    event::ExecutionStatus,
    remote::{AttachmentUpload, ExecutionId, RemoteSync, ResultRequest},
};

pub(crate) fn workspace_dir() -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/workspace")
}

pub(crate) fn load_catalog() -> Catalog {
    let snapshot = CatalogSnapshot::from_path(&workspace_dir().join("catalog.json"))
        .expect("fixture catalog is valid");
    Catalog::new(snapshot)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RecordedUpload {
    pub(crate) execution_id: i64,
    pub(crate) title: String,
    pub(crate) file_name: String,
    pub(crate) content: String,
}

/// A remote system that remembers every call.
#[derive(Debug, Default)]
pub(crate) struct FakeTestLink {
    pub(crate) results: Vec<ResultRequest>,
    pub(crate) uploads: Vec<RecordedUpload>,
    pub(crate) fatal_for: Option<i64>,
}

impl FakeTestLink {
    pub(crate) fn statuses(&self) -> Vec<(i64, ExecutionStatus)> {
        self.results
            .iter()
            .map(|request| (request.test_case_id, request.status))
            .collect()
    }
}

impl RemoteSync for FakeTestLink {
    fn report_result(&mut self, request: &ResultRequest) -> Result<ExecutionId, RemoteSyncError> {
        if self.fatal_for == Some(request.test_case_id) {
            return Err(RemoteSyncError::new("session expired").into_fatal());
        }
        self.results.push(request.clone());
        Ok(ExecutionId(5000 + self.results.len() as i64))
    }

    fn upload_attachment(&mut self, upload: &AttachmentUpload<'_>) -> Result<(), RemoteSyncError> {
        self.uploads.push(RecordedUpload {
            execution_id: upload.execution_id.0,
            title: upload.title.to_owned(),
            file_name: upload.file_name.to_owned(),
            content: upload.content.to_owned(),
        });
        Ok(())
    }
}
