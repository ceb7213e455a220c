//! Dependency specification.
//!
//! A Dependency names another formula, says whether it is needed only to
//! build or also at runtime, and on which platforms it applies.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::platform::{Os, Platform};

/// When a dependency is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepKind {
    /// Needed only while building from source
    Build,
    /// Needed by the installed keg
    #[default]
    Runtime,
}

impl fmt::Display for DepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepKind::Build => write!(f, "build"),
            DepKind::Runtime => write!(f, "runtime"),
        }
    }
}

/// A dependency of a formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DependencySpec")]
pub struct Dependency {
    name: String,
    kind: DepKind,
    /// Only applies on this OS
    platform: Option<Os>,
    /// Provided by the OS on macOS; a real dependency everywhere else
    uses_from_macos: bool,
}

impl Dependency {
    /// Create a runtime dependency that applies everywhere.
    pub fn new(name: impl Into<String>) -> Self {
        Dependency {
            name: name.into(),
            kind: DepKind::Runtime,
            platform: None,
            uses_from_macos: false,
        }
    }

    /// Mark this as a build-only dependency.
    pub fn build(mut self) -> Self {
        self.kind = DepKind::Build;
        self
    }

    /// Restrict this dependency to one OS.
    pub fn on(mut self, os: Os) -> Self {
        self.platform = Some(os);
        self
    }

    /// Mark this as provided by macOS itself.
    pub fn uses_from_macos(mut self) -> Self {
        self.uses_from_macos = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DepKind {
        self.kind
    }

    pub fn is_build(&self) -> bool {
        self.kind == DepKind::Build
    }

    pub fn platform(&self) -> Option<Os> {
        self.platform
    }

    /// Whether this dependency must be satisfied on `platform`.
    pub fn applies_to(&self, platform: &Platform) -> bool {
        if self.uses_from_macos && platform.is_macos() {
            return false;
        }
        match self.platform {
            Some(os) => os == platform.os(),
            None => true,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.kind == DepKind::Build {
            write!(f, " (build)")?;
        }
        if let Some(os) = self.platform {
            write!(f, " [{}]", os)?;
        }
        if self.uses_from_macos {
            write!(f, " [uses_from_macos]")?;
        }
        Ok(())
    }
}

/// Dependency as written in a formula file.
///
/// Either a bare name (`"zstd"`) or a table
/// (`{ name = "pkg-config", kind = "build" }`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Runtime dependency on every platform
    Simple(String),

    /// Detailed specification
    Detailed(DetailedDependencySpec),
}

/// Detailed dependency specification.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailedDependencySpec {
    pub name: String,

    #[serde(default)]
    pub kind: DepKind,

    #[serde(default)]
    pub platform: Option<Os>,

    #[serde(default)]
    pub uses_from_macos: bool,
}

impl From<DependencySpec> for Dependency {
    fn from(spec: DependencySpec) -> Self {
        match spec {
            DependencySpec::Simple(name) => Dependency::new(name),
            DependencySpec::Detailed(d) => Dependency {
                name: d.name,
                kind: d.kind,
                platform: d.platform,
                uses_from_macos: d.uses_from_macos,
            },
        }
    }
}
