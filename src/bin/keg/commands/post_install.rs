//! `keg post-install` command

use anyhow::Result;

use super::{context, load_formula, shell};
use crate::cli::{FormulaArgs, GlobalArgs};
use keg::core::Platform;
use keg::ops::{run_post_install, ActionOutcome};
use keg::util::Status;

pub fn execute(args: FormulaArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = context(global)?;
    let shell = shell(global);
    let formula = load_formula(&ctx, &args.formula)?;

    let report = run_post_install(&formula, ctx.root(), &Platform::current(), &shell)?;
    shell.status(
        Status::Finished,
        format!(
            "post-install for {}: {} done, {} skipped",
            formula.name,
            report.count(|o| *o == ActionOutcome::Done),
            report.count(|o| matches!(o, ActionOutcome::Skipped { .. }))
        ),
    );
    Ok(())
}
