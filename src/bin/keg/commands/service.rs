//! `keg service` command
//!
//! Renders the descriptor only; loading it is left to launchctl/systemctl.

use anyhow::{Context, Result};

use super::{context, load_formula, shell};
use crate::cli::{GlobalArgs, ServiceArgs};
use keg::core::Platform;
use keg::ops::{render, resolve_service, ServiceFormat};
use keg::util::fs::write_string;
use keg::util::Status;

pub fn execute(args: ServiceArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = context(global)?;
    let platform = Platform::current();
    let formula = load_formula(&ctx, &args.formula)?;

    let service = resolve_service(&formula, ctx.root(), &platform)?;
    let format = args
        .format
        .unwrap_or_else(|| ServiceFormat::for_platform(&platform));
    let text = render(&service, format);

    match &args.output {
        Some(path) => {
            write_string(path, &text)
                .with_context(|| format!("failed to write service file for `{}`", formula.name))?;
            shell(global).status(Status::Finished, format!("wrote {}", path.display()));
        }
        None => print!("{}", text),
    }
    Ok(())
}
