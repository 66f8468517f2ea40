// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The catalog of tracked test cases a reconciliation run matches against.
//!
//! The catalog is read from a JSON snapshot produced by the test-management client, and is
//! consumed by exactly one run.

use crate::{
    aggregator::CaseResults,
    errors::{CatalogLoadError, IdentityError, IdentityErrorKind},
};
use camino::Utf8Path;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// The serialized form of a catalog.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogSnapshot {
    /// The test plan results are reported against.
    pub test_plan: TestPlan,

    /// The build results are reported against.
    pub build: Build,

    /// The automated test cases in the plan.
    #[serde(default)]
    pub test_cases: Vec<TestCaseSpec>,
}

impl CatalogSnapshot {
    /// Reads a snapshot from JSON.
    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogLoadError> {
        let mut deserializer = serde_json::Deserializer::from_reader(reader);
        serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|err| CatalogLoadError::Deserialize { path: None, err })
    }

    /// Reads a snapshot from a JSON file.
    pub fn from_path(path: &Utf8Path) -> Result<Self, CatalogLoadError> {
        let file = std::fs::File::open(path).map_err(|err| CatalogLoadError::Read {
            path: path.to_owned(),
            err,
        })?;
        Self::from_reader(std::io::BufReader::new(file)).map_err(|err| match err {
            CatalogLoadError::Deserialize { err, .. } => CatalogLoadError::Deserialize {
                path: Some(path.to_owned()),
                err,
            },
            other => other,
        })
    }
}

/// A test plan.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TestPlan {
    /// The plan ID.
    pub id: i64,

    /// The plan name.
    pub name: String,

    /// Platforms defined for the plan.
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

impl TestPlan {
    /// Looks up a platform by name.
    pub fn platform(&self, name: &str) -> Option<&Platform> {
        self.platforms.iter().find(|platform| platform.name == name)
    }
}

/// A build within a test plan.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Build {
    /// The build ID.
    pub id: i64,

    /// The build name.
    pub name: String,
}

/// A platform a test case can be executed on.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Platform {
    /// The platform ID.
    pub id: i64,

    /// The platform name, e.g. `linux`.
    pub name: String,
}

/// The read-only description of a tracked test case.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseSpec {
    /// The test case ID.
    pub id: i64,

    /// The version-specific internal ID.
    pub internal_id: i64,

    /// The display name.
    pub name: String,

    /// The human-facing external ID, e.g. `PROJ-12`.
    #[serde(default)]
    pub external_id: Option<String>,

    /// The custom fields this test case is matched on, in order.
    pub key_fields: Vec<String>,

    /// Custom field values by field name.
    #[serde(default)]
    pub custom_fields: IndexMap<String, String>,

    /// The platform the test case is assigned to in the plan.
    #[serde(default)]
    pub platform: Option<Platform>,
}

/// A test case together with the results accumulated for it during a run.
#[derive(Clone, Debug)]
pub struct TrackedTestCase {
    spec: TestCaseSpec,
    pub(crate) results: CaseResults,
}

impl TrackedTestCase {
    /// Creates a new tracked test case with no results.
    pub fn new(spec: TestCaseSpec) -> Self {
        Self {
            spec,
            results: CaseResults::default(),
        }
    }

    /// Returns the read-only description of this test case.
    pub fn spec(&self) -> &TestCaseSpec {
        &self.spec
    }

    /// Returns the results accumulated so far.
    pub fn results(&self) -> &CaseResults {
        &self.results
    }

    /// Returns the name of the assigned platform, if any.
    pub fn platform_name(&self) -> Option<&str> {
        self.spec.platform.as_ref().map(|platform| platform.name.as_str())
    }

    /// Returns true if `field` is one of this test case's key fields.
    pub fn has_key_field(&self, field: &str) -> bool {
        self.spec.key_fields.iter().any(|key| key == field)
    }

    /// Returns the trimmed, non-empty value of a custom field.
    pub fn custom_field(&self, field: &str) -> Option<&str> {
        self.spec
            .custom_fields
            .get(field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Returns the identity candidates stored in a key field.
    pub fn key_values(&self, field: &str) -> Result<Vec<&str>, IdentityError> {
        let raw = self.spec.custom_fields.get(field).ok_or_else(|| {
            IdentityError::new(
                self.spec.id,
                &self.spec.name,
                field,
                IdentityErrorKind::Missing,
            )
        })?;
        let values = split_key_values(raw);
        if values.is_empty() {
            return Err(IdentityError::new(
                self.spec.id,
                &self.spec.name,
                field,
                IdentityErrorKind::Blank,
            ));
        }
        Ok(values)
    }

    /// Returns the number of distinct key values that must receive a contribution before a
    /// verdict can be computed.
    ///
    /// A key field that is missing or blank still counts as one value, which can never be
    /// filled.
    pub fn expected_contributions(&self) -> usize {
        self.spec
            .key_fields
            .iter()
            .unique()
            .map(|field| self.key_values(field).map_or(1, |values| values.len()))
            .sum()
    }

    /// Returns every problem with this test case's key fields.
    pub fn identity_errors(&self) -> Vec<IdentityError> {
        self.spec
            .key_fields
            .iter()
            .unique()
            .filter_map(|field| self.key_values(field).err())
            .collect()
    }
}

/// Splits a raw key field value into trimmed, non-empty, distinct candidates.
pub fn split_key_values(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unique()
        .collect()
}

/// The catalog for one reconciliation run.
#[derive(Clone, Debug)]
pub struct Catalog {
    test_plan: TestPlan,
    build: Build,
    test_cases: Vec<TrackedTestCase>,
}

impl Catalog {
    /// Creates a catalog from a snapshot. Test cases keep their snapshot order.
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            test_plan: snapshot.test_plan,
            build: snapshot.build,
            test_cases: snapshot
                .test_cases
                .into_iter()
                .map(TrackedTestCase::new)
                .collect(),
        }
    }

    /// The test plan.
    pub fn test_plan(&self) -> &TestPlan {
        &self.test_plan
    }

    /// The build.
    pub fn build(&self) -> &Build {
        &self.build
    }

    /// The tracked test cases.
    pub fn test_cases(&self) -> &[TrackedTestCase] {
        &self.test_cases
    }

    pub(crate) fn test_case_mut(&mut self, index: usize) -> Option<&mut TrackedTestCase> {
        self.test_cases.get_mut(index)
    }
}
