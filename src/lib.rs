//! keg - A formula-driven build and install engine
//!
//! This crate provides the library behind the `keg` command: formula
//! loading, dependency resolution, fetching and building sources into a
//! keg/cellar layout, post-install actions, service descriptors and smoke
//! tests.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities for keg unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides an in-memory formula source, formula builders and tarball
/// fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{Dependency, Formula, FormulaVersion, KegLayout, Platform};

pub use resolver::{InstallPlan, Resolver};
pub use util::context::GlobalContext;
