//! `keg deps` command
//!
//! Prints the install plan in order, dependencies first.

use anyhow::Result;

use super::context;
use crate::cli::{DepsArgs, GlobalArgs};
use keg::core::Platform;
use keg::ops::plan_install;

pub fn execute(args: DepsArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = context(global)?;
    let plan = plan_install(&ctx, &args.formula, &Platform::current())?;

    for step in plan.dependencies() {
        if step.is_satisfied() && !args.installed {
            continue;
        }
        let mut line = format!("{} ({})", step.name, step.kind);
        if let Some(by) = &step.required_by {
            line.push_str(&format!(" <- {}", by));
        }
        if step.is_satisfied() {
            line.push_str(" [installed]");
        }
        println!("{}", line);
    }
    Ok(())
}
