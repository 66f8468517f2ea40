// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matches canonical events against the key fields of tracked test cases.

use crate::{
    aggregator::KeyValue,
    catalog::{Catalog, TrackedTestCase},
    event::{ExecutionStatus, TestEvent},
};

/// How an event identity is compared to a key value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchPolicy {
    /// Also accept `<candidate>-<platform>` where `<platform>` is the test case's platform.
    pub platform_suffix: bool,
}

/// How a key value matched an event identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchKind<'a> {
    /// The identity equals the candidate.
    Exact,

    /// The identity equals the candidate suffixed with the test case's platform.
    PlatformSuffix(&'a str),
}

/// One (test case, key value, outcome) produced by matching an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contribution {
    /// The index of the test case in the catalog.
    pub case_index: usize,

    /// The key value that matched.
    pub key: KeyValue,

    /// The event's outcome.
    pub status: ExecutionStatus,

    /// The platform carried by the event, or matched through the identity suffix.
    pub platform: Option<String>,
}

/// Matches events for one seeker: a key field, an optional data-provider field, and a
/// comparison policy.
#[derive(Clone, Debug)]
pub struct IdentityMatcher<'a> {
    key_field: &'a str,
    data_provider_field: Option<&'a str>,
    policy: MatchPolicy,
}

impl<'a> IdentityMatcher<'a> {
    /// Creates a matcher over the given key field.
    pub fn new(key_field: &'a str, policy: MatchPolicy) -> Self {
        Self {
            key_field,
            data_provider_field: None,
            policy,
        }
    }

    /// Additionally requires the event's data provider to equal the value of this custom field.
    pub fn with_data_provider_field(mut self, field: &'a str) -> Self {
        self.data_provider_field = Some(field);
        self
    }

    /// The key field this matcher reads.
    pub fn key_field(&self) -> &'a str {
        self.key_field
    }

    /// The custom field holding the expected data provider, if required.
    pub fn data_provider_field(&self) -> Option<&'a str> {
        self.data_provider_field
    }

    /// Compares one candidate to an event identity.
    pub fn compare<'p>(
        &self,
        candidate: &str,
        case_platform: Option<&'p str>,
        identity: &str,
    ) -> Option<MatchKind<'p>> {
        if candidate == identity {
            return Some(MatchKind::Exact);
        }
        if self.policy.platform_suffix {
            let platform = case_platform?;
            let suffixed = identity
                .strip_prefix(candidate)
                .and_then(|rest| rest.strip_prefix('-'));
            if suffixed == Some(platform) {
                return Some(MatchKind::PlatformSuffix(platform));
            }
        }
        None
    }

    /// Matches an event against one test case.
    ///
    /// A candidate equal to the identity wins over one matched through the platform suffix,
    /// whatever their order in the key field. Otherwise the first matching candidate is used.
    pub fn match_case(
        &self,
        event: &TestEvent,
        case: &TrackedTestCase,
    ) -> Option<(KeyValue, Option<String>)> {
        if !case.has_key_field(self.key_field) {
            return None;
        }
        // Identity errors are reported once per run by the driver.
        let values = case.key_values(self.key_field).ok()?;

        let exact = values
            .iter()
            .find(|value| **value == event.identity)
            .map(|value| (*value, MatchKind::Exact));
        let (value, kind) = exact.or_else(|| {
            values.iter().find_map(|value| {
                self.compare(value, case.platform_name(), &event.identity)
                    .map(|kind| (*value, kind))
            })
        })?;

        if let Some(field) = self.data_provider_field {
            let expected = case.custom_field(field)?;
            if event.data_provider.as_deref().map(str::trim) != Some(expected) {
                return None;
            }
        }

        let platform = match kind {
            MatchKind::Exact => event.platform.clone(),
            MatchKind::PlatformSuffix(platform) => {
                Some(event.platform.clone().unwrap_or_else(|| platform.to_owned()))
            }
        };
        Some((KeyValue::new(self.key_field, value), platform))
    }

    /// Matches an event against every test case in the catalog.
    ///
    /// Each test case receives at most one contribution per event.
    pub fn match_event(&self, event: &TestEvent, catalog: &Catalog) -> Vec<Contribution> {
        catalog
            .test_cases()
            .iter()
            .enumerate()
            .filter_map(|(case_index, case)| {
                let (key, platform) = self.match_case(event, case)?;
                Some(Contribution {
                    case_index,
                    key,
                    status: event.status,
                    platform,
                })
            })
            .collect()
    }
}
