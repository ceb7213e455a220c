//! Global context for keg operations.
//!
//! Provides centralized access to configuration, paths, and environment.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   Cellar/<name>/<pkg_version>/   installed kegs
//!   opt/<name> -> ../Cellar/...    stable per-formula links
//!   bin/                           links for non keg-only formulas
//!   etc/  var/  var/log/           shared state outside kegs
//! <cache>/
//!   downloads/  build/  logs/<name>/
//! ```

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};

use crate::util::config::{load_config, Config};

/// Project directories for keg
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "keg", "keg"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Cache directory for downloads, build trees and logs
    cache: PathBuf,

    /// Installation root
    root: PathBuf,

    /// Formula search path
    formula_dirs: Vec<PathBuf>,

    /// Merged configuration
    config: Config,

    /// Whether to use verbose output
    verbose: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext from config files and the environment.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Self::with_cwd(cwd)
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let (cache, config_dir) = match PROJECT_DIRS.as_ref() {
            Some(dirs) => (dirs.cache_dir().to_path_buf(), dirs.config_dir().to_path_buf()),
            None => {
                let fallback = home_dir().join(".keg");
                (fallback.join("cache"), fallback)
            }
        };

        let cache = match std::env::var_os("KEG_CACHE_DIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => cache,
        };

        let config = load_config(
            &config_dir.join("config.toml"),
            &cwd.join(".keg").join("config.toml"),
        );

        let root = match std::env::var_os("KEG_ROOT") {
            Some(root) if !root.is_empty() => PathBuf::from(root),
            _ => config
                .root
                .clone()
                .unwrap_or_else(|| home_dir().join(".keg")),
        };

        let mut formula_dirs: Vec<PathBuf> = match std::env::var_os("KEG_FORMULA_PATH") {
            Some(paths) if !paths.is_empty() => std::env::split_paths(&paths).collect(),
            _ => Vec::new(),
        };
        formula_dirs.extend(config.formula_dirs.iter().cloned());

        let mut ctx = GlobalContext {
            cwd,
            cache,
            root,
            formula_dirs,
            config,
            verbose: false,
        };
        ctx.make_paths_absolute();
        Ok(ctx)
    }

    /// Override the installation root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self.make_paths_absolute();
        self
    }

    /// Override the cache directory.
    pub fn with_cache_dir(mut self, cache: impl Into<PathBuf>) -> Self {
        self.cache = cache.into();
        self.make_paths_absolute();
        self
    }

    /// Put extra formula directories in front of the search path.
    pub fn with_formula_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        let mut all = dirs;
        all.append(&mut self.formula_dirs);
        self.formula_dirs = all;
        self.make_paths_absolute();
        self
    }

    fn make_paths_absolute(&mut self) {
        let cwd = self.cwd.clone();
        let absolute = |p: &Path| if p.is_absolute() { p.to_path_buf() } else { cwd.join(p) };
        self.root = absolute(&self.root);
        self.cache = absolute(&self.cache);
        self.formula_dirs = self.formula_dirs.iter().map(|d| absolute(d)).collect();
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Get the merged configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the installation root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared `bin/` for linked formulas.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache
    }

    /// Where verified source archives are kept.
    pub fn downloads_dir(&self) -> PathBuf {
        self.cache.join("downloads")
    }

    /// Parent of the temporary build trees.
    pub fn build_dir(&self) -> PathBuf {
        self.cache.join("build")
    }

    /// Per-formula build logs.
    pub fn logs_dir(&self, name: &str) -> PathBuf {
        self.cache.join("logs").join(name)
    }

    /// Formula search path. Falls back to `<root>/formulas` when nothing is configured.
    pub fn formula_dirs(&self) -> Vec<PathBuf> {
        if self.formula_dirs.is_empty() {
            vec![self.root.join("formulas")]
        } else {
            self.formula_dirs.clone()
        }
    }

    /// Ensure a directory exists, creating it if necessary.
    pub fn ensure_dir(&self, path: &Path) -> Result<()> {
        crate::util::fs::ensure_dir(path)
    }
}

fn home_dir() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf())
            .unwrap()
            .with_root(tmp.path().join("root"))
            .with_cache_dir(tmp.path().join("cache"));

        assert_eq!(ctx.root(), tmp.path().join("root"));
        assert_eq!(ctx.bin_dir(), tmp.path().join("root/bin"));
        assert_eq!(ctx.downloads_dir(), tmp.path().join("cache/downloads"));
        assert_eq!(ctx.logs_dir("zstd"), tmp.path().join("cache/logs/zstd"));
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf())
            .unwrap()
            .with_root("prefix");

        assert_eq!(ctx.root(), tmp.path().join("prefix"));
    }

    #[test]
    fn test_formula_dirs_precedence() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf())
            .unwrap()
            .with_root(tmp.path().join("root"))
            .with_formula_dirs(vec![PathBuf::from("mine")]);

        assert_eq!(ctx.formula_dirs()[0], tmp.path().join("mine"));
    }
}
