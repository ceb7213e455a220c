//! Formula files: parsing and schema.
//!
//! A formula is a TOML file `<name>.toml` describing one version of an
//! upstream project: where to fetch it, how to build it, what to do after
//! installing, how to supervise its daemon and how to smoke-test it.
//! Formulas are immutable once loaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::core::configure::ConfigureOptions;
use crate::core::dependency::Dependency;
use crate::core::layout::{opt_template_vars, KegLayout};
use crate::core::platform::{Os, Platform};
use crate::core::service::ServiceSpec;
use crate::core::version::FormulaVersion;
use crate::util::hash::is_sha256_hex;
use crate::util::template::TemplateVars;

/// Errors loading or validating a formula.
#[derive(Debug, Error)]
pub enum FormulaError {
    #[error("failed to read formula {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse formula {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid formula `{name}`: {message}")]
    Invalid { name: String, message: String },
}

/// A parsed formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Formula {
    pub name: String,

    #[serde(default)]
    pub desc: Option<String>,

    #[serde(default)]
    pub homepage: Option<String>,

    pub version: FormulaVersion,

    /// Bumped when the build changes without an upstream version change
    #[serde(default)]
    pub revision: u32,

    #[serde(default)]
    pub license: Option<String>,

    /// Reason this formula is never linked into `<root>/bin`
    #[serde(default)]
    pub keg_only: Option<String>,

    /// Text shown after installing; may contain placeholders
    #[serde(default)]
    pub caveats: Option<String>,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    pub source: SourceSpec,

    #[serde(default)]
    pub livecheck: Option<Livecheck>,

    #[serde(default)]
    pub deprecate: Option<Deprecation>,

    /// Bottle checksums keyed by platform tag
    #[serde(default)]
    pub bottle: BTreeMap<String, String>,

    #[serde(default)]
    pub patches: Vec<PatchSpec>,

    #[serde(default)]
    pub build: BuildRecipe,

    #[serde(default)]
    pub post_install: Vec<PostInstallAction>,

    #[serde(default)]
    pub service: Option<ServiceSpec>,

    #[serde(default)]
    pub test: Vec<TestStep>,

    /// File this formula was loaded from
    #[serde(skip)]
    path: Option<PathBuf>,
}

/// Upstream source archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    pub url: String,
    pub sha256: String,
}

impl SourceSpec {
    /// Archive file name taken from the last URL path segment, or the file
    /// name of a bare path.
    pub fn file_name(&self) -> String {
        let name = match Url::parse(&self.url) {
            Ok(url) => url
                .path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string)),
            Err(_) => Path::new(&self.url)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
        };
        name.filter(|s| !s.is_empty())
            .unwrap_or_else(|| "source".to_string())
    }
}

/// Where and how to look for newer upstream versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Livecheck {
    pub url: String,
    /// Regex whose first capture group is a version
    pub regex: String,
}

/// Planned end of support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deprecation {
    pub date: NaiveDate,
    pub because: String,
}

/// A unified diff applied to the extracted source before building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchSpec {
    /// Path relative to the formula file
    pub file: String,

    /// Leading path components to strip (`patch -p<strip>`)
    #[serde(default = "default_strip")]
    pub strip: u32,

    #[serde(default)]
    pub sha256: Option<String>,
}

fn default_strip() -> u32 {
    1
}

/// How to build the extracted source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildRecipe {
    /// Environment variables removed before building
    pub env_remove: Vec<String>,

    /// Dependencies whose `opt_include`/`opt_lib` go into CPPFLAGS/LDFLAGS
    pub search_paths: Vec<String>,

    /// `./configure` invocation; skipped when absent
    pub configure: Option<ConfigureOptions>,

    /// make invocations, in order
    pub make: Vec<MakeStep>,

    /// Text replacements applied after installing
    pub inreplace: Vec<Inreplace>,
}

/// One `make` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MakeStep {
    pub targets: Vec<String>,

    /// `VAR=value` overrides; values are templates
    pub vars: BTreeMap<String, String>,
}

/// Replace text in an installed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inreplace {
    pub path: String,
    pub before: String,
    pub after: String,

    #[serde(default)]
    pub platform: Option<Os>,
}

/// A post-install action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PostInstallAction {
    /// Create a directory (and parents)
    Mkpath { path: String },

    /// Run a command unless its guard says it already happened
    Run {
        command: Vec<String>,

        /// Skip when this path exists
        #[serde(default)]
        unless_exists: Option<String>,

        /// Skip when this environment variable is set
        #[serde(default)]
        skip_if_env: Option<String>,

        #[serde(default)]
        env: BTreeMap<String, String>,
    },
}

/// A smoke-test step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestStep {
    pub run: Vec<String>,

    /// Trimmed stdout must equal this
    #[serde(default)]
    pub expect_eq: Option<String>,

    /// Stdout must contain this
    #[serde(default)]
    pub expect_contains: Option<String>,

    #[serde(default)]
    pub skip_if_env: Option<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Formula {
    /// Load and validate a formula file.
    pub fn load(path: &Path) -> Result<Self, FormulaError> {
        let contents = std::fs::read_to_string(path).map_err(|source| FormulaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse and validate formula text; `path` anchors relative patch files.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, FormulaError> {
        let mut formula: Formula =
            toml::from_str(contents).map_err(|source| FormulaError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        formula.path = Some(path.to_path_buf());
        formula.validate()?;
        Ok(formula)
    }

    fn invalid(&self, message: impl Into<String>) -> FormulaError {
        FormulaError::Invalid {
            name: self.name.clone(),
            message: message.into(),
        }
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), FormulaError> {
        if !is_valid_name(&self.name) {
            return Err(self.invalid(
                "name must be non-empty and use only [a-z0-9@._+-]",
            ));
        }
        if let Some(path) = &self.path {
            let stem = path.file_stem().map(|s| s.to_string_lossy());
            if stem.as_deref().is_some_and(|s| s != self.name) {
                return Err(self.invalid(format!(
                    "file name `{}` does not match the formula name",
                    path.display()
                )));
            }
        }
        if self.version.as_str().trim().is_empty() {
            return Err(self.invalid("version must not be empty"));
        }
        if !is_sha256_hex(&self.source.sha256) {
            return Err(self.invalid("source.sha256 must be 64 lowercase hex characters"));
        }
        match Url::parse(&self.source.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => {}
            Ok(url) => {
                return Err(self.invalid(format!("unsupported url scheme `{}`", url.scheme())))
            }
            Err(_) if Path::new(&self.source.url).is_absolute() => {}
            Err(e) => return Err(self.invalid(format!("invalid source url: {}", e))),
        }
        for (tag, sha) in &self.bottle {
            if !is_sha256_hex(sha) {
                return Err(self.invalid(format!("bottle `{}` has an invalid sha256", tag)));
            }
        }
        for patch in &self.patches {
            if let Some(sha) = &patch.sha256 {
                if !is_sha256_hex(sha) {
                    return Err(self.invalid(format!("patch `{}` has an invalid sha256", patch.file)));
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        for dep in &self.dependencies {
            if dep.name() == self.name {
                return Err(self.invalid("formula depends on itself"));
            }
            if !seen.insert((dep.name(), dep.platform())) {
                return Err(self.invalid(format!("duplicate dependency `{}`", dep.name())));
            }
        }
        for name in &self.build.search_paths {
            if !self.dependencies.iter().any(|d| d.name() == name) {
                return Err(self.invalid(format!(
                    "search path `{}` is not a declared dependency",
                    name
                )));
            }
        }
        if let Some(service) = &self.service {
            if service.run.is_empty() {
                return Err(self.invalid("service.run must name a program"));
            }
        }
        for action in &self.post_install {
            if let PostInstallAction::Run { command, .. } = action {
                if command.is_empty() {
                    return Err(self.invalid("post_install command must not be empty"));
                }
            }
        }
        for step in &self.test {
            if step.run.is_empty() {
                return Err(self.invalid("test steps must run a command"));
            }
        }
        Ok(())
    }

    /// File this formula was loaded from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// `<version>` or `<version>_<revision>`.
    pub fn pkg_version(&self) -> String {
        self.version.pkg_version(self.revision)
    }

    pub fn is_keg_only(&self) -> bool {
        self.keg_only.is_some()
    }

    /// Install locations under `root`.
    pub fn layout(&self, root: &Path) -> KegLayout {
        KegLayout::new(root, &self.name, self.version.clone(), self.revision)
    }

    /// Dependencies that apply on `platform`, in declaration order.
    pub fn dependencies_for<'a>(
        &'a self,
        platform: &'a Platform,
    ) -> impl Iterator<Item = &'a Dependency> + 'a {
        self.dependencies.iter().filter(move |d| d.applies_to(platform))
    }

    /// Placeholders for this formula: its own layout plus `{dep:*}` for each
    /// applicable dependency.
    pub fn template_vars(&self, root: &Path, platform: &Platform) -> TemplateVars {
        let mut vars = self.layout(root).template_vars();
        for dep in self.dependencies_for(platform) {
            vars.set_scoped(dep.name(), &opt_template_vars(root, dep.name()));
        }
        vars
    }

    /// Absolute path of a patch file.
    pub fn patch_path(&self, patch: &PatchSpec) -> PathBuf {
        let base = self
            .path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(Path::new("."));
        base.join(&patch.file)
    }

    /// Bottle checksum for the platform, if one was published.
    pub fn bottle_for(&self, platform: &Platform) -> Option<(String, &str)> {
        let tag = platform.bottle_tag()?;
        let sha = self.bottle.get(&tag)?;
        Some((tag, sha.as_str()))
    }

    /// Whether the deprecation date has been reached on `today`.
    pub fn is_deprecated(&self, today: NaiveDate) -> bool {
        self.deprecate.as_ref().is_some_and(|d| today >= d.date)
    }
}

/// Formula names: lowercase, digits and `@._+-`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "@._+-".contains(c))
}
