// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    catalog::{Build, Catalog, CatalogSnapshot, Platform, TestCaseSpec, TestPlan},
    errors::RemoteSyncError,
    remote::{AttachmentUpload, ExecutionId, RemoteSync, ResultRequest},
};

pub(crate) fn spec(key_fields: &[&str], custom_fields: &[(&str, &str)]) -> TestCaseSpec {
    TestCaseSpec {
        id: 1,
        internal_id: 2,
        name: "login".to_owned(),
        external_id: None,
        key_fields: key_fields.iter().map(|s| (*s).to_owned()).collect(),
        custom_fields: custom_fields
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect(),
        platform: None,
    }
}

pub(crate) fn with_platform(mut spec: TestCaseSpec, id: i64, name: &str) -> TestCaseSpec {
    spec.platform = Some(Platform {
        id,
        name: name.to_owned(),
    });
    spec
}

pub(crate) fn catalog(test_cases: Vec<TestCaseSpec>) -> Catalog {
    Catalog::new(CatalogSnapshot {
        test_plan: TestPlan {
            id: 10,
            name: "plan".to_owned(),
            platforms: vec![
                Platform {
                    id: 3,
                    name: "linux".to_owned(),
                },
                Platform {
                    id: 4,
                    name: "windows".to_owned(),
                },
            ],
        },
        build: Build {
            id: 7,
            name: "nightly".to_owned(),
        },
        test_cases,
    })
}

/// Records every call and hands out sequential execution IDs.
#[derive(Debug, Default)]
pub(crate) struct RecordingSync {
    pub(crate) results: Vec<ResultRequest>,
    pub(crate) uploads: Vec<(ExecutionId, String)>,
    pub(crate) fail_results_for: Vec<i64>,
    pub(crate) fatal: bool,
    pub(crate) fail_uploads: bool,
}

impl RemoteSync for RecordingSync {
    fn report_result(&mut self, request: &ResultRequest) -> Result<ExecutionId, RemoteSyncError> {
        if self.fail_results_for.contains(&request.test_case_id) {
            let err = RemoteSyncError::new("server said no");
            return Err(if self.fatal { err.into_fatal() } else { err });
        }
        self.results.push(request.clone());
        Ok(ExecutionId(self.results.len() as i64))
    }

    fn upload_attachment(
        &mut self,
        upload: &AttachmentUpload<'_>,
    ) -> Result<(), RemoteSyncError> {
        if self.fail_uploads {
            return Err(RemoteSyncError::new("upload rejected"));
        }
        self.uploads
            .push((upload.execution_id, upload.file_name.to_owned()));
        Ok(())
    }
}
