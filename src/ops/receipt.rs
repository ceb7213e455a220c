//! Install receipts and the installed-keg check.
//!
//! A keg counts as installed when `<root>/opt/<name>` resolves to a keg
//! holding an `INSTALL_RECEIPT.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::formula::Formula;
use crate::core::layout::{opt_prefix, RECEIPT_FILE};
use crate::core::platform::Platform;

/// What was installed, when, and from which source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    pub pkg_version: String,
    pub installed_at: DateTime<Utc>,
    pub source_url: String,
    pub source_sha256: String,
    pub runtime_dependencies: Vec<String>,
    /// Bottle tag of the host, or the OS name when there is none
    pub platform: String,
    pub keg_only: bool,
    /// keg release that performed the install
    pub installed_by: String,
}

impl InstallReceipt {
    pub fn for_formula(formula: &Formula, platform: &Platform) -> Self {
        InstallReceipt {
            name: formula.name.clone(),
            version: formula.version.to_string(),
            pkg_version: formula.pkg_version(),
            installed_at: Utc::now(),
            source_url: formula.source.url.clone(),
            source_sha256: formula.source.sha256.clone(),
            runtime_dependencies: formula
                .dependencies_for(platform)
                .filter(|d| !d.is_build())
                .map(|d| d.name().to_string())
                .collect(),
            platform: platform.bottle_tag().unwrap_or_else(|| platform.os().to_string()),
            keg_only: formula.is_keg_only(),
            installed_by: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Write into the keg prefix.
    pub fn write(&self, prefix: &Path) -> Result<PathBuf> {
        let path = prefix.join(RECEIPT_FILE);
        let json = serde_json::to_string_pretty(self).context("failed to serialize receipt")?;
        std::fs::write(&path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn read(prefix: &Path) -> Result<Self> {
        let path = prefix.join(RECEIPT_FILE);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid receipt {}", path.display()))
    }
}

/// The keg `opt/<name>` points at, if it is a complete install.
pub fn installed_keg(root: &Path, name: &str) -> Option<PathBuf> {
    let keg = std::fs::canonicalize(opt_prefix(root, name)).ok()?;
    keg.join(RECEIPT_FILE).is_file().then_some(keg)
}

pub fn is_installed(root: &Path, name: &str) -> bool {
    installed_keg(root, name).is_some()
}

/// Names of every installed keg.
pub fn installed_names(root: &Path) -> Result<Vec<String>> {
    let opt = root.join("opt");
    if !opt.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(&opt).with_context(|| format!("failed to read {}", opt.display()))? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if is_installed(root, &name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
