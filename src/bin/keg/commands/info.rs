//! `keg info` command

use anyhow::{Context, Result};
use chrono::Local;

use super::{context, load_formula};
use crate::cli::{GlobalArgs, InfoArgs};
use keg::core::Platform;
use keg::ops::formula_info;

pub fn execute(args: InfoArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = context(global)?;
    let formula = load_formula(&ctx, &args.formula)?;
    let info = formula_info(&formula, ctx.root(), &Platform::current(), Local::now().date_naive())?;

    if args.json {
        let json = serde_json::to_string_pretty(&info).context("failed to serialize info")?;
        println!("{}", json);
    } else {
        print!("{}", info);
    }
    Ok(())
}
