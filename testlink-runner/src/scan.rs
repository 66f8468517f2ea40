// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report file discovery.

use crate::errors::ScanError;
use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

/// Finds report files under a base directory.
pub trait ReportScanner {
    /// Returns the paths, relative to `base_dir`, of files matching the `include` expression.
    ///
    /// The order of the returned paths is the order reports are processed in.
    fn scan(&self, base_dir: &Utf8Path, include: &str) -> Result<Vec<Utf8PathBuf>, ScanError>;
}

/// Scans with Ant-style globs: `*` stays within a directory, `**` crosses directories, and a
/// pattern ending in `/` matches everything below it. Several patterns may be separated by
/// commas.
///
/// Files are returned in a deterministic order: directories are walked with entries sorted by
/// file name.
#[derive(Clone, Debug, Default)]
pub struct GlobScanner;

impl GlobScanner {
    /// Builds the glob set for an include expression.
    pub fn build_glob_set(include: &str) -> Result<GlobSet, ScanError> {
        let mut builder = GlobSetBuilder::new();
        let mut any = false;
        for pattern in include.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let mut pattern = pattern.replace('\\', "/");
            if pattern.ends_with('/') {
                pattern.push_str("**");
            }
            let glob = GlobBuilder::new(&pattern)
                .literal_separator(true)
                .build()
                .map_err(|err| ScanError::InvalidPattern {
                    pattern: pattern.clone(),
                    err,
                })?;
            builder.add(glob);
            any = true;
        }
        if !any {
            return Err(ScanError::NoPatterns {
                include: include.to_owned(),
            });
        }
        builder.build().map_err(|err| ScanError::InvalidPattern {
            pattern: include.to_owned(),
            err,
        })
    }
}

impl ReportScanner for GlobScanner {
    fn scan(&self, base_dir: &Utf8Path, include: &str) -> Result<Vec<Utf8PathBuf>, ScanError> {
        let glob_set = Self::build_glob_set(include)?;

        let mut matches = Vec::new();
        for entry in WalkDir::new(base_dir).sort_by_file_name() {
            let entry = entry.map_err(|err| ScanError::Walk {
                base_dir: base_dir.to_owned(),
                err,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(path) = Utf8PathBuf::try_from(entry.into_path()) else {
                debug!(base_dir = %base_dir, "skipping non-UTF-8 path");
                continue;
            };
            let Ok(relative) = path.strip_prefix(base_dir) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|component| component.as_str())
                .collect::<Vec<_>>()
                .join("/");
            if glob_set.is_match(&relative) {
                matches.push(Utf8PathBuf::from(relative));
            }
        }

        debug!(
            base_dir = %base_dir,
            include,
            count = matches.len(),
            "scanned for reports"
        );
        Ok(matches)
    }
}
