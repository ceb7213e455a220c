//! Build orchestration.
//!
//! Given a formula, an extracted source tree and installed dependencies,
//! the builder patches the tree, assembles the environment, and runs the
//! recipe's configure/make/inreplace steps into the keg prefix. Every
//! external step writes its combined output to
//! `<cache>/logs/<name>/NN.<step>`.

pub mod autotools;
pub mod env;
pub mod errors;

pub use autotools::{AutotoolsBuilder, StepRecord};
pub use env::{inherited_env, BuildEnvironment};
pub use errors::BuildError;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::formula::Formula;
use crate::core::platform::Platform;
use crate::sources::patch::apply_patches;
use crate::util::process::find_make;
use crate::util::Shell;

/// Inputs of one build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub root: PathBuf,
    pub platform: Platform,
    pub jobs: usize,
    /// Configured make program, if any
    pub make: Option<PathBuf>,
    pub log_dir: PathBuf,
}

/// Patch `source_dir` and run the build recipe of `formula`.
pub fn build_formula(
    formula: &Formula,
    source_dir: &Path,
    opts: &BuildOptions,
    shell: &Shell,
) -> Result<Vec<StepRecord>> {
    // Missing dependency prefixes abort before the tree is touched
    let env = BuildEnvironment::assemble(
        formula,
        &opts.root,
        &opts.platform,
        opts.jobs,
        &inherited_env(),
    )?;

    let make = match find_make(opts.make.as_deref()) {
        Some(make) => make,
        None if formula.build.make.is_empty() => PathBuf::from("make"),
        None => anyhow::bail!("`make` not found in PATH (set KEG_MAKE or build.make)"),
    };

    apply_patches(formula, source_dir, shell)?;

    tracing::info!("building {} {}", formula.name, formula.pkg_version());
    AutotoolsBuilder::new(formula, opts, env, make, source_dir.to_path_buf(), shell)
        .build()
        .with_context(|| format!("failed to build {}", formula.name))
}
