// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read test reports written by JUnit-style runners, TestNG, and TAP producers.
//!
//! Each format has its own data model, mirroring the shape of the report on disk:
//!
//! * [`JunitReport`]: suites of test cases, each with a classname and a status.
//! * [`TestngReport`]: suites of tests of classes of methods, each method optionally fed by a
//!   data provider.
//! * [`TapDocument`]: a plan and test points with directives. YAMLish diagnostics are kept as
//!   [`serde_yaml::Value`] trees.

pub mod errors;
mod junit;
mod tap;
mod testng;
mod xml;

pub use junit::*;
pub use tap::*;
pub use testng::*;
