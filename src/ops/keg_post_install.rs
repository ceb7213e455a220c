//! Post-install actions.
//!
//! Actions are idempotent: `mkpath` on an existing directory does nothing
//! and a `run` guarded by `unless_exists` is skipped once its marker exists.
//! Guards are reported as skipped, never as errors.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::formula::{Formula, PostInstallAction};
use crate::core::platform::Platform;
use crate::ops::receipt::is_installed;
use crate::util::process::{combined_output, ProcessBuilder};
use crate::util::template::TemplateVars;
use crate::util::{Shell, Status};

/// What happened to one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    Skipped { reason: String },
    Failed { reason: String },
}

/// Per-action results of a post-install run.
#[derive(Debug, Clone, Default)]
pub struct PostInstallReport {
    pub actions: Vec<(String, ActionOutcome)>,
}

impl PostInstallReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.actions.iter().filter_map(|(label, outcome)| match outcome {
            ActionOutcome::Failed { reason } => Some((label.as_str(), reason.as_str())),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn count(&self, pred: impl Fn(&ActionOutcome) -> bool) -> usize {
        self.actions.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Run every post-install action of `formula`.
///
/// Failures are collected in the report rather than aborting: the caller
/// decides whether they are warnings (during install) or errors.
pub fn post_install(
    formula: &Formula,
    root: &Path,
    platform: &Platform,
    shell: &Shell,
) -> Result<PostInstallReport> {
    let vars = formula.template_vars(root, platform);
    let mut report = PostInstallReport::default();

    for action in &formula.post_install {
        let (label, outcome) =
            run_action(action, &vars, root, |name| std::env::var_os(name).is_some())?;
        match &outcome {
            ActionOutcome::Done => shell.status(Status::Running, &label),
            ActionOutcome::Skipped { reason } => {
                shell.status(Status::Skipped, format!("{} ({})", label, reason))
            }
            ActionOutcome::Failed { reason } => {
                tracing::warn!("post-install action `{}` failed: {}", label, reason)
            }
        }
        report.actions.push((label, outcome));
    }

    Ok(report)
}

/// `keg post-install`: rerun the actions of an installed formula.
///
/// Unlike during install, a failing action is an error here.
pub fn run_post_install(
    formula: &Formula,
    root: &Path,
    platform: &Platform,
    shell: &Shell,
) -> Result<PostInstallReport> {
    if !is_installed(root, &formula.name) {
        bail!("`{}` is not installed", formula.name);
    }
    let report = post_install(formula, root, platform, shell)?;
    if let Some((label, reason)) = report.failures().next() {
        bail!("post-install action `{}` failed: {}", label, reason);
    }
    Ok(report)
}

fn run_action(
    action: &PostInstallAction,
    vars: &TemplateVars,
    root: &Path,
    env_is_set: impl Fn(&str) -> bool,
) -> Result<(String, ActionOutcome)> {
    match action {
        PostInstallAction::Mkpath { path } => {
            let path = vars.expand_path(path)?;
            let label = format!("mkpath {}", path.display());
            if path.is_dir() {
                return Ok((label, ActionOutcome::Done));
            }
            let outcome = match std::fs::create_dir_all(&path) {
                Ok(()) => ActionOutcome::Done,
                Err(e) => ActionOutcome::Failed {
                    reason: e.to_string(),
                },
            };
            Ok((label, outcome))
        }

        PostInstallAction::Run {
            command,
            unless_exists,
            skip_if_env,
            env,
        } => {
            let argv = vars.expand_all(command)?;
            let label = argv.join(" ");

            if let Some(var) = skip_if_env {
                if env_is_set(var) {
                    return Ok((
                        label,
                        ActionOutcome::Skipped {
                            reason: format!("{} is set", var),
                        },
                    ));
                }
            }

            if let Some(marker) = unless_exists {
                let marker: PathBuf = vars.expand_path(marker)?;
                if marker.exists() {
                    return Ok((
                        label,
                        ActionOutcome::Skipped {
                            reason: format!("{} exists", marker.display()),
                        },
                    ));
                }
            }

            let mut cmd = ProcessBuilder::new(&argv[0]).args(&argv[1..]).cwd(root);
            for (key, value) in env {
                cmd = cmd.env(key, vars.expand(value)?);
            }

            let outcome = match cmd.exec() {
                Ok(output) if output.status.success() => ActionOutcome::Done,
                Ok(output) => ActionOutcome::Failed {
                    reason: format!(
                        "exit code {}: {}",
                        output.status.code().unwrap_or(-1),
                        combined_output(&output).trim()
                    ),
                },
                Err(e) => ActionOutcome::Failed {
                    reason: format!("{:#}", e),
                },
            };
            Ok((label, outcome))
        }
    }
}
