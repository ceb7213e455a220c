//! `keg test` command

use anyhow::{bail, Result};

use super::{context, load_formula, shell};
use crate::cli::{FormulaArgs, GlobalArgs};
use keg::core::Platform;
use keg::ops::{is_installed, test_formula};
use keg::util::Status;

pub fn execute(args: FormulaArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = context(global)?;
    let shell = shell(global);
    let formula = load_formula(&ctx, &args.formula)?;

    if !is_installed(ctx.root(), &formula.name) {
        bail!(
            "`{}` is not installed\nhelp: run `keg install {}` first",
            formula.name,
            formula.name
        );
    }

    shell.status(Status::Testing, format!("{} {}", formula.name, formula.pkg_version()));
    let report = test_formula(&formula, ctx.root(), &Platform::current(), &shell)?;

    if !report.is_success() {
        bail!(
            "{} of {} test steps failed for `{}`",
            report.failed(),
            report.steps.len(),
            formula.name
        );
    }
    shell.status(
        Status::Finished,
        format!("{} passed, {} skipped", report.passed(), report.skipped()),
    );
    Ok(())
}
