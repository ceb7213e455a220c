//! Configuration file support for keg.
//!
//! keg supports two configuration file locations:
//! - Global: `<config dir>/config.toml` - User-wide defaults
//! - Project: `.keg/config.toml` - Directory-local overrides
//!
//! Project config takes precedence over global config. Environment
//! variables (`KEG_ROOT`, `KEG_CACHE_DIR`, `KEG_FORMULA_PATH`) are applied by
//! [`GlobalContext`](crate::util::GlobalContext) on top of both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// keg configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Installation root (holds `Cellar/`, `opt/`, `var/`, `etc/`)
    pub root: Option<PathBuf>,

    /// Directories searched for `<name>.toml` formulas, in order
    pub formula_dirs: Vec<PathBuf>,

    /// Build settings
    pub build: BuildConfig,

    /// Network settings
    pub net: NetConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Parallel jobs handed to make through `MAKEFLAGS`
    pub jobs: Option<usize>,

    /// make program to use instead of `gmake`/`make` from PATH
    pub make: Option<PathBuf>,

    /// Keep per-step build logs after a successful install
    pub keep_logs: bool,
}

/// Network configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// HTTP timeout in seconds (no timeout when unset)
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist or is broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.root.is_some() {
            self.root = other.root;
        }
        if !other.formula_dirs.is_empty() {
            // Higher-precedence directories are searched first.
            let mut dirs = other.formula_dirs;
            dirs.extend(std::mem::take(&mut self.formula_dirs));
            self.formula_dirs = dirs;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.make.is_some() {
            self.build.make = other.build.make;
        }
        if other.build.keep_logs {
            self.build.keep_logs = true;
        }
        if other.net.timeout_secs.is_some() {
            self.net.timeout_secs = other.net.timeout_secs;
        }
    }

    /// Number of make jobs, defaulting to the available parallelism.
    pub fn jobs(&self) -> usize {
        self.build.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.keg/config.toml)
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}
