// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report automated test results into a test-management catalog.
//!
//! `testlink-sync run` reads a catalog snapshot, scans the base directory for JUnit, TestNG and
//! TAP reports as configured in `.config/testlink.toml`, and writes one result per test case,
//! followed by its attachments, to an outbox of JSON lines.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod outbox;
mod output;
#[cfg(test)]
mod tests_integration;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use outbox::JsonLinesOutbox;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
