//! Implementation of `keg install`.
//!
//! Every formula in the plan goes through the same pipeline, strictly in
//! order: fetch and verify, extract, patch and build, write the receipt,
//! link, post-install. Any failure before the receipt is written removes
//! the half-built keg and aborts the whole install.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::builder::{build_formula, BuildOptions};
use crate::core::formula::Formula;
use crate::core::platform::Platform;
use crate::ops::keg_fetch::{downloader, fetch_source};
use crate::ops::keg_post_install::{post_install, PostInstallReport};
use crate::ops::link::{link_bins, link_opt};
use crate::ops::receipt::{installed_names, InstallReceipt};
use crate::resolver::{InstallPlan, Resolver};
use crate::sources::{extract_archive, Downloader, FormulaRegistry};
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::{GlobalContext, Shell, Status};

/// Options for the install command.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Reinstall the requested formula even if it is installed
    pub force: bool,

    /// Keep the extracted build tree
    pub keep_tmp: bool,

    /// Do not run post-install actions
    pub skip_post_install: bool,
}

/// A keg this run installed.
#[derive(Debug, Clone)]
pub struct InstalledKeg {
    pub name: String,
    pub prefix: PathBuf,
    pub linked: Vec<PathBuf>,
    pub post_install: Option<PostInstallReport>,
}

/// Outcome of `keg install`.
#[derive(Debug, Clone, Default)]
pub struct InstallSummary {
    pub installed: Vec<InstalledKeg>,
    /// Plan entries that were already installed
    pub satisfied: Vec<String>,
}

/// Resolve the plan for `name_or_path` against the context's registry.
pub fn plan_install(ctx: &GlobalContext, name_or_path: &str, platform: &Platform) -> Result<InstallPlan> {
    let mut dirs = ctx.formula_dirs();
    let root = FormulaRegistry::new(dirs.clone()).get(name_or_path)?;
    // Dependencies of a formula given by path are looked up next to it
    if let Some(dir) = root.path().and_then(Path::parent) {
        if !dirs.iter().any(|d| d == dir) {
            dirs.push(dir.to_path_buf());
        }
    }
    let registry = FormulaRegistry::new(dirs);
    let installed = installed_names(ctx.root())?;
    Resolver::new(&registry, platform.clone())
        .with_installed(installed)
        .resolve(root)
}

/// Install a formula and everything it needs.
pub fn install(
    ctx: &GlobalContext,
    name_or_path: &str,
    platform: &Platform,
    opts: &InstallOptions,
    shell: &Shell,
) -> Result<InstallSummary> {
    shell.status(Status::Resolving, name_or_path);
    let plan = plan_install(ctx, name_or_path, platform)?;
    let downloader = downloader(ctx);
    let mut summary = InstallSummary::default();

    for step in plan.steps() {
        let is_root = step.required_by.is_none();
        if step.is_satisfied() && !(is_root && opts.force) {
            if is_root {
                shell.status(
                    Status::Skipped,
                    format!("{} is already installed (use --force to reinstall)", step.name),
                );
            }
            summary.satisfied.push(step.name.clone());
            continue;
        }

        let formula = step
            .formula
            .as_ref()
            .with_context(|| format!("no formula loaded for `{}`", step.name))?;
        let keg = install_formula(ctx, formula, platform, &downloader, opts, shell)?;
        summary.installed.push(keg);
    }

    Ok(summary)
}

fn install_formula(
    ctx: &GlobalContext,
    formula: &Formula,
    platform: &Platform,
    downloader: &Downloader,
    opts: &InstallOptions,
    shell: &Shell,
) -> Result<InstalledKeg> {
    let root = ctx.root();
    tracing::info!("installing {} {}", formula.name, formula.pkg_version());

    if let Some(deprecation) = &formula.deprecate {
        if formula.is_deprecated(Local::now().date_naive()) {
            shell.warn(format!(
                "{} has been deprecated since {} because it is {}",
                formula.name, deprecation.date, deprecation.because
            ));
        }
    }

    // Nothing is extracted until the checksum has been verified
    let archive = fetch_source(formula, downloader, shell)?;

    let build_dir = ctx.build_dir();
    ensure_dir(&build_dir)?;
    let tmp = tempfile::Builder::new()
        .prefix(&format!("{}-", formula.name))
        .keep(opts.keep_tmp)
        .tempdir_in(&build_dir)
        .with_context(|| format!("failed to create a build directory in {}", build_dir.display()))?;
    if opts.keep_tmp {
        shell.note(format!("keeping build tree {}", tmp.path().display()));
    }
    let source_dir = extract_archive(&archive, tmp.path())?;

    let layout = formula.layout(root);
    let prefix = layout.prefix();
    let previous = set_aside(&prefix)?;
    ensure_dir(&prefix)?;

    let log_dir = ctx.logs_dir(&formula.name);
    let build_opts = BuildOptions {
        root: root.to_path_buf(),
        platform: platform.clone(),
        jobs: ctx.config().jobs(),
        make: ctx.config().build.make.clone(),
        log_dir: log_dir.clone(),
    };
    if let Err(e) = build_formula(formula, &source_dir, &build_opts, shell) {
        remove_partial_keg(&prefix);
        if let Some(previous) = &previous {
            restore(previous, &prefix);
        }
        return Err(e);
    }
    if let Some(previous) = &previous {
        remove_dir_all_if_exists(previous)?;
    }

    InstallReceipt::for_formula(formula, platform).write(&prefix)?;

    shell.status(Status::Linking, format!("{} {}", formula.name, formula.pkg_version()));
    link_opt(&layout)?;
    let linked = match &formula.keg_only {
        Some(reason) => {
            shell.note(format!("{} is keg-only ({}); not linking into {}", formula.name, reason, ctx.bin_dir().display()));
            Vec::new()
        }
        None => link_bins(&layout, &ctx.bin_dir())?,
    };

    let post_install = if opts.skip_post_install || formula.post_install.is_empty() {
        None
    } else {
        let report = post_install(formula, root, platform, shell)?;
        for (label, reason) in report.failures() {
            shell.warn(format!(
                "post-install action `{}` failed: {}\nthe keg is installed; run `keg post-install {}` to retry",
                label, reason, formula.name
            ));
        }
        Some(report)
    };

    if let Some(caveats) = &formula.caveats {
        let text = formula
            .template_vars(root, platform)
            .expand(caveats)
            .with_context(|| format!("invalid caveats in `{}`", formula.name))?;
        shell.status(Status::Caveats, &formula.name);
        for line in text.trim_end().lines() {
            shell.note(line);
        }
    }

    if !ctx.config().build.keep_logs {
        remove_logs(&log_dir);
    }

    shell.status(
        Status::Installed,
        format!("{} {} in {}", formula.name, formula.pkg_version(), prefix.display()),
    );

    Ok(InstalledKeg {
        name: formula.name.clone(),
        prefix,
        linked,
        post_install,
    })
}

/// Move an existing keg out of the way so a failed rebuild can put it back.
fn set_aside(prefix: &Path) -> Result<Option<PathBuf>> {
    if !prefix.exists() {
        return Ok(None);
    }
    let mut previous = prefix.as_os_str().to_owned();
    previous.push(".previous");
    let previous = PathBuf::from(previous);
    remove_dir_all_if_exists(&previous)?;

    tracing::info!("moving existing keg {} aside", prefix.display());
    std::fs::rename(prefix, &previous)
        .with_context(|| format!("failed to move {} aside", prefix.display()))?;
    Ok(Some(previous))
}

fn restore(previous: &Path, prefix: &Path) {
    tracing::info!("restoring previous keg {}", prefix.display());
    if let Err(e) = std::fs::rename(previous, prefix) {
        tracing::warn!("failed to restore {}: {}", prefix.display(), e);
    }
}

fn remove_partial_keg(prefix: &Path) {
    if let Err(e) = std::fs::remove_dir_all(prefix) {
        tracing::warn!("failed to remove partial keg {}: {}", prefix.display(), e);
    }
}

fn remove_logs(log_dir: &Path) {
    if log_dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(log_dir) {
            tracing::debug!("failed to remove {}: {}", log_dir.display(), e);
        }
    }
}
