//! `keg livecheck` command

use anyhow::{Context, Result};

use super::{context, load_formula};
use crate::cli::{GlobalArgs, LivecheckArgs};
use keg::ops::{downloader, livecheck};

pub fn execute(args: LivecheckArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = context(global)?;
    let downloader = downloader(&ctx);

    let mut results = Vec::new();
    for name in &args.formulas {
        let formula = load_formula(&ctx, name)?;
        results.push(livecheck(&formula, &downloader)?);
    }

    if args.json {
        let json = serde_json::to_string_pretty(&results).context("failed to serialize results")?;
        println!("{}", json);
        return Ok(());
    }

    for result in &results {
        let latest = result
            .latest
            .as_ref()
            .map_or_else(|| "unknown".to_string(), ToString::to_string);
        let marker = if result.outdated { " (outdated)" } else { "" };
        println!("{}: {} ==> {}{}", result.name, result.current, latest, marker);
    }
    Ok(())
}
