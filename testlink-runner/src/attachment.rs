// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Files uploaded alongside test results.

use crate::errors::AttachmentReadError;
use base64::{Engine, engine::general_purpose::STANDARD};
use camino::{Utf8Path, Utf8PathBuf};
use std::borrow::Cow;

/// A file to attach to a test execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// A short title shown in the test-management system.
    pub title: String,

    /// An optional longer description.
    pub description: Option<String>,

    /// The file name to upload as.
    pub file_name: String,

    /// The MIME type of the content.
    pub file_type: String,

    /// Where the content comes from.
    pub source: AttachmentSource,
}

/// Where the bytes of an [`Attachment`] come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentSource {
    /// Content embedded in the report itself, already decoded.
    Inline(Vec<u8>),

    /// Content read from a file at upload time.
    File(Utf8PathBuf),
}

impl Attachment {
    /// Creates an attachment for a file on disk, titled with its file name.
    pub fn from_file(path: impl Into<Utf8PathBuf>) -> Self {
        let path = path.into();
        let file_name = path.file_name().unwrap_or(path.as_str()).to_owned();
        Self {
            title: file_name.clone(),
            description: None,
            file_type: mime_type_for(&file_name).to_owned(),
            file_name,
            source: AttachmentSource::File(path),
        }
    }

    /// Creates an attachment with inline content.
    pub fn inline(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        let file_name = file_name.into();
        Self {
            title: file_name.clone(),
            description: None,
            file_type: mime_type_for(&file_name).to_owned(),
            file_name,
            source: AttachmentSource::Inline(content),
        }
    }

    /// Reads the content of this attachment.
    pub fn read_content(&self) -> Result<Cow<'_, [u8]>, AttachmentReadError> {
        match &self.source {
            AttachmentSource::Inline(content) => Ok(Cow::Borrowed(content)),
            AttachmentSource::File(path) => std::fs::read(path)
                .map(Cow::Owned)
                .map_err(|err| AttachmentReadError::new(path, err)),
        }
    }

    /// Reads the content of this attachment and encodes it as standard base64.
    pub fn encode_base64(&self) -> Result<String, AttachmentReadError> {
        Ok(STANDARD.encode(self.read_content()?))
    }
}

/// Guesses a MIME type from a file name's extension.
pub fn mime_type_for(file_name: &str) -> &'static str {
    let extension = Utf8Path::new(file_name)
        .extension()
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("xml") => "text/xml",
        Some("tap" | "txt" | "log") => "text/plain",
        Some("html" | "htm") => "text/html",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use test_case::test_case;

    #[test_case("TEST-a.xml", "text/xml"; "xml")]
    #[test_case("run.TAP", "text/plain"; "extension is case insensitive")]
    #[test_case("shot.png", "image/png"; "png")]
    #[test_case("core", "application/octet-stream"; "no extension")]
    fn mime_types(file_name: &str, expected: &str) {
        assert_eq!(mime_type_for(file_name), expected);
    }

    #[test]
    fn encodes_file_content() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "hello world").unwrap();

        let attachment = Attachment::from_file(&path);
        assert_eq!(attachment.file_name, "out.txt");
        assert_eq!(attachment.file_type, "text/plain");
        assert_eq!(attachment.encode_base64().unwrap(), "aGVsbG8gd29ybGQ=");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("gone.xml");
        let err = Attachment::from_file(&path).encode_base64().unwrap_err();
        assert_eq!(err.path(), &path);
    }

    #[test]
    fn inline_content() {
        let attachment = Attachment::inline("a.bin", vec![0, 1, 2]);
        assert_eq!(attachment.encode_base64().unwrap(), "AAEC");
    }
}
