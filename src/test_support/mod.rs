//! Test utilities for keg unit tests.
//!
//! Fixtures build formula text and archives in memory; [`MemorySource`]
//! serves formulas to the resolver without touching the filesystem.

pub mod fixtures;

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;

use crate::core::formula::Formula;
use crate::sources::FormulaSource;

pub use fixtures::*;

/// In-memory formula source.
#[derive(Debug, Default)]
pub struct MemorySource {
    formulas: HashMap<String, Formula>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource::default()
    }

    /// Add a formula.
    pub fn with(mut self, formula: Formula) -> Self {
        self.formulas.insert(formula.name.clone(), formula);
        self
    }

    /// Fetch a formula that must exist.
    pub fn get(&self, name: &str) -> Formula {
        self.formulas
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("no formula `{}` in test source", name))
    }
}

impl FormulaSource for MemorySource {
    fn load(&self, name: &str) -> Result<Option<Formula>> {
        Ok(self.formulas.get(name).cloned())
    }
}

/// Parse a minimal formula whose `dependencies` value is `deps` (TOML).
pub fn formula_with_deps(name: &str, deps: &str) -> Formula {
    let src = format!("dependencies = {}\n{}", deps, minimal_formula(name, &[]));
    Formula::parse(&src, &Path::new("/formulas").join(format!("{}.toml", name)))
        .unwrap_or_else(|e| panic!("invalid test formula `{}`: {:#}", name, anyhow::Error::from(e)))
}

/// Parse formula text as if it were `/formulas/<name>.toml`.
pub fn parse_formula(name: &str, src: &str) -> Formula {
    Formula::parse(src, &Path::new("/formulas").join(format!("{}.toml", name)))
        .unwrap_or_else(|e| panic!("invalid test formula `{}`: {:#}", name, anyhow::Error::from(e)))
}

/// Assertion helpers for testing.
pub mod assertions {
    /// Assert that an error message contains a substring.
    pub fn assert_error_contains<T: std::fmt::Debug>(
        result: Result<T, anyhow::Error>,
        substring: &str,
    ) {
        match result {
            Ok(v) => panic!("expected Err containing '{}', got Ok: {:?}", substring, v),
            Err(e) => {
                let msg = format!("{:#}", e);
                assert!(
                    msg.contains(substring),
                    "error '{}' does not contain '{}'",
                    msg,
                    substring
                );
            }
        }
    }
}
