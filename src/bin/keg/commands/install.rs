//! `keg install` command

use anyhow::Result;

use super::{context, shell};
use crate::cli::{GlobalArgs, InstallArgs};
use keg::core::Platform;
use keg::ops::{install, InstallOptions};
use keg::util::Status;

pub fn execute(args: InstallArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = context(global)?;
    let shell = shell(global);

    let opts = InstallOptions {
        force: args.force,
        keep_tmp: args.keep_tmp,
        skip_post_install: args.skip_post_install,
    };

    let summary = install(&ctx, &args.formula, &Platform::current(), &opts, &shell)?;
    if summary.installed.len() > 1 {
        let names: Vec<&str> = summary.installed.iter().map(|k| k.name.as_str()).collect();
        shell.status(Status::Finished, format!("installed {}", names.join(", ")));
    }
    Ok(())
}
