//! Applying formula patches to extracted sources.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::formula::Formula;
use crate::util::hash::sha256_file;
use crate::util::process::{combined_output, find_patch, ProcessBuilder};
use crate::util::{Shell, Status};

/// Apply every patch of `formula` inside `source_dir`, in order.
///
/// Each patch is checksummed (when the formula pins one) and dry-run
/// first, so a patch that does not apply leaves the tree untouched.
pub fn apply_patches(formula: &Formula, source_dir: &Path, shell: &Shell) -> Result<()> {
    for spec in &formula.patches {
        let patch_path = formula.patch_path(spec);

        if !patch_path.is_file() {
            bail!(
                "patch file not found: {} (expected at {})",
                spec.file,
                patch_path.display()
            );
        }

        if let Some(expected) = &spec.sha256 {
            let actual = sha256_file(&patch_path)?;
            if &actual != expected {
                bail!(
                    "patch hash mismatch for {}:\n  expected: {}\n  actual:   {}",
                    spec.file,
                    expected,
                    actual
                );
            }
        }

        shell.status(Status::Patching, &spec.file);
        apply_patch(&patch_path, spec.strip, source_dir)
            .with_context(|| format!("failed to patch {}", formula.name))?;
    }
    Ok(())
}

/// Apply one unified diff with `patch -p<strip>`.
pub fn apply_patch(patch_path: &Path, strip: u32, source_dir: &Path) -> Result<()> {
    let Some(patch) = find_patch() else {
        bail!("`patch` is required to apply {} but was not found in PATH", patch_path.display());
    };

    let base = ProcessBuilder::new(patch)
        .arg("-f")
        .arg(format!("-p{}", strip))
        .arg("-i")
        .arg(patch_path)
        .cwd(source_dir);

    tracing::info!("Applying patch: {}", patch_path.display());

    let check = base.clone().arg("--dry-run").exec()?;
    if !check.status.success() {
        bail!(
            "patch '{}' will not apply cleanly:\n{}",
            patch_path.display(),
            combined_output(&check)
        );
    }

    let output = base.exec()?;
    if !output.status.success() {
        bail!(
            "failed to apply patch '{}':\n{}",
            patch_path.display(),
            combined_output(&output)
        );
    }
    Ok(())
}
