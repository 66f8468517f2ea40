// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Serialize;
use std::io::{self, Write};
use testlink_runner::{
    errors::RemoteSyncError,
    remote::{AttachmentUpload, ExecutionId, RemoteSync, ResultRequest},
};

/// A [`RemoteSync`] that writes every call as one line of JSON, for a client of the
/// test-management API to replay.
///
/// Execution IDs are assigned sequentially starting from 1. Write failures are fatal, since
/// everything after them would be lost.
pub struct JsonLinesOutbox<W> {
    writer: W,
    last_execution_id: i64,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "kebab-case")]
enum OutboxRecord<'a> {
    Result {
        execution_id: ExecutionId,
        status_code: char,
        #[serde(flatten)]
        request: &'a ResultRequest,
    },
    Attachment {
        #[serde(flatten)]
        upload: &'a AttachmentUpload<'a>,
    },
}

impl<W: Write> JsonLinesOutbox<W> {
    /// Creates an outbox writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            last_execution_id: 0,
        }
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_record(&mut self, record: &OutboxRecord<'_>) -> Result<(), RemoteSyncError> {
        let mut line = serde_json::to_vec(record)
            .map_err(|err| RemoteSyncError::with_source("failed to serialize record", err))?;
        line.push(b'\n');
        self.writer.write_all(&line).map_err(|err| {
            RemoteSyncError::with_source("failed to write to outbox", err).into_fatal()
        })
    }
}

impl<W: Write> RemoteSync for JsonLinesOutbox<W> {
    fn report_result(&mut self, request: &ResultRequest) -> Result<ExecutionId, RemoteSyncError> {
        let execution_id = ExecutionId(self.last_execution_id + 1);
        self.write_record(&OutboxRecord::Result {
            execution_id,
            status_code: request.status.code(),
            request,
        })?;
        self.last_execution_id = execution_id.0;
        Ok(execution_id)
    }

    fn upload_attachment(&mut self, upload: &AttachmentUpload<'_>) -> Result<(), RemoteSyncError> {
        self.write_record(&OutboxRecord::Attachment { upload })
    }
}
