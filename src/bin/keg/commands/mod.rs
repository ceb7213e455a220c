//! Command implementations

pub mod completions;
pub mod deps;
pub mod fetch;
pub mod info;
pub mod install;
pub mod livecheck;
pub mod post_install;
pub mod service;
pub mod test;

use anyhow::Result;

use crate::cli::GlobalArgs;
use keg::core::Formula;
use keg::sources::FormulaRegistry;
use keg::util::{GlobalContext, Shell};

/// Context with the command-line overrides applied.
pub fn context(global: &GlobalArgs) -> Result<GlobalContext> {
    let mut ctx = GlobalContext::new()?;
    if let Some(root) = &global.root {
        ctx = ctx.with_root(root);
    }
    if !global.formula_dirs.is_empty() {
        ctx = ctx.with_formula_dirs(global.formula_dirs.clone());
    }
    ctx.set_verbose(global.verbose);
    Ok(ctx)
}

pub fn shell(global: &GlobalArgs) -> Shell {
    Shell::from_flags(global.quiet, global.verbose, global.color)
}

/// Load a formula by name or path.
pub fn load_formula(ctx: &GlobalContext, name_or_path: &str) -> Result<Formula> {
    FormulaRegistry::from_context(ctx).get(name_or_path)
}
