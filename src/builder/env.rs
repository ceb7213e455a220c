//! Build environment assembly.
//!
//! Dependency prefixes are looked up once, through their opt links, and
//! cached for the rest of the build. Search flags always point at the opt
//! paths so they stay valid when a dependency is upgraded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::builder::errors::BuildError;
use crate::core::formula::Formula;
use crate::core::layout::opt_prefix;
use crate::core::platform::Platform;
use crate::util::process::ProcessBuilder;

/// Environment handed to every build step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnvironment {
    /// Dependency name to its keg (opt link target)
    prefixes: BTreeMap<String, PathBuf>,
    set: BTreeMap<String, String>,
    removed: Vec<String>,
}

impl BuildEnvironment {
    /// Assemble the environment for `formula`.
    ///
    /// `inherited` is the environment the build would otherwise see; flag
    /// variables are prepended to, never replaced. Fails before anything
    /// runs if a dependency has no prefix.
    pub fn assemble(
        formula: &Formula,
        root: &Path,
        platform: &Platform,
        jobs: usize,
        inherited: &BTreeMap<String, String>,
    ) -> Result<Self, BuildError> {
        let mut env = BuildEnvironment {
            removed: formula.build.env_remove.clone(),
            ..BuildEnvironment::default()
        };

        let deps: Vec<&str> = formula.dependencies_for(platform).map(|d| d.name()).collect();
        for name in &deps {
            env.resolve_prefix(root, name)?;
        }

        let inherited_value = |key: &str| -> Option<&String> {
            if env.removed.iter().any(|r| r == key) {
                None
            } else {
                inherited.get(key)
            }
        };

        let search: Vec<PathBuf> = formula
            .build
            .search_paths
            .iter()
            .filter(|name| deps.contains(&name.as_str()))
            .map(|name| opt_prefix(root, name))
            .collect();

        let cppflags: Vec<String> = search
            .iter()
            .map(|p| format!("-I{}", p.join("include").display()))
            .collect();
        let ldflags: Vec<String> = search
            .iter()
            .map(|p| format!("-L{}", p.join("lib").display()))
            .collect();
        let pkg_config: Vec<String> = deps
            .iter()
            .map(|name| opt_prefix(root, name).join("lib").join("pkgconfig").display().to_string())
            .collect();

        let mut set = BTreeMap::new();
        if let Some(value) = prepend(&cppflags, " ", inherited_value("CPPFLAGS")) {
            set.insert("CPPFLAGS".to_string(), value);
        }
        if let Some(value) = prepend(&ldflags, " ", inherited_value("LDFLAGS")) {
            set.insert("LDFLAGS".to_string(), value);
        }
        if let Some(value) = prepend(&pkg_config, ":", inherited_value("PKG_CONFIG_PATH")) {
            set.insert("PKG_CONFIG_PATH".to_string(), value);
        }
        set.insert("MAKEFLAGS".to_string(), format!("-j{}", jobs.max(1)));

        env.set = set;
        Ok(env)
    }

    fn resolve_prefix(&mut self, root: &Path, name: &str) -> Result<&Path, BuildError> {
        if !self.prefixes.contains_key(name) {
            let opt = opt_prefix(root, name);
            let keg = std::fs::canonicalize(&opt).map_err(|_| BuildError::MissingPrefix {
                dependency: name.to_string(),
                path: opt.clone(),
            })?;
            tracing::debug!("{} resolves to {}", name, keg.display());
            self.prefixes.insert(name.to_string(), keg);
        }
        Ok(&self.prefixes[name])
    }

    /// Keg a dependency resolved to.
    pub fn prefix(&self, name: &str) -> Option<&Path> {
        self.prefixes.get(name).map(PathBuf::as_path)
    }

    /// Variables set for every step.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.set
    }

    /// Variables removed for every step.
    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    /// Apply this environment to a command.
    pub fn apply(&self, mut cmd: ProcessBuilder) -> ProcessBuilder {
        for key in &self.removed {
            cmd = cmd.env_remove(key);
        }
        cmd.envs(&self.set)
    }
}

fn prepend(values: &[String], sep: &str, existing: Option<&String>) -> Option<String> {
    let mut parts: Vec<&str> = values.iter().map(String::as_str).collect();
    if let Some(existing) = existing.filter(|e| !e.is_empty()) {
        parts.push(existing);
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(sep))
    }
}

/// The current process environment.
pub fn inherited_env() -> BTreeMap<String, String> {
    std::env::vars().collect()
}
