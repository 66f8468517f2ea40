// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for reconciling automated test reports with a test-management catalog.
//!
//! A run scans a directory for reports, flattens each report into [`TestEvent`](event::TestEvent)s,
//! matches events to catalog test cases through their key custom fields, aggregates the
//! contributions into one verdict per test case, and hands the verdicts to a
//! [`RemoteSync`](remote::RemoteSync) implementation. See [`reconcile::Reconciler`] for the
//! entry point.

pub mod aggregator;
pub mod attachment;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod event;
pub mod matcher;
pub mod reconcile;
pub mod remote;
pub mod scan;
pub mod seeker;
#[cfg(test)]
mod test_helpers;
