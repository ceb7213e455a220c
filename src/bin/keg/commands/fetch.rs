//! `keg fetch` command

use anyhow::Result;

use super::{context, load_formula, shell};
use crate::cli::{FetchArgs, GlobalArgs};
use keg::core::Platform;
use keg::ops::{downloader, fetch_source, plan_install};
use keg::util::Status;

pub fn execute(args: FetchArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = context(global)?;
    let shell = shell(global);
    let downloader = downloader(&ctx);
    let platform = Platform::current();

    for name in &args.formulas {
        let formulas: Vec<_> = if args.deps {
            plan_install(&ctx, name, &platform)?
                .pending()
                .filter_map(|step| step.formula.clone())
                .collect()
        } else {
            vec![load_formula(&ctx, name)?]
        };

        for formula in &formulas {
            let path = fetch_source(formula, &downloader, &shell)?;
            shell.status(Status::Finished, path.display());
        }
    }
    Ok(())
}
