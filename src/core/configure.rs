//! Typed `./configure` arguments.
//!
//! A recipe names features and paths; rendering to `--enable-x`,
//! `--with-y=z`, `--datadir=...` happens in one place.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::layout::KegLayout;
use crate::core::platform::{Os, Platform};
use crate::util::template::{TemplateError, TemplateVars};

/// A single rendered configure argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigureArg {
    /// `--disable-debug`, `--prefix=...` and the rest of the standard set
    Std(String),
    /// `--<kind>=<path>`
    Path(PathKind, String),
    Enable(String),
    Disable(String),
    With(String, Option<String>),
    Without(String),
    /// Trailing `NAME=value`
    Var(String, String),
}

impl fmt::Display for ConfigureArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigureArg::Std(arg) => write!(f, "{}", arg),
            ConfigureArg::Path(kind, value) => write!(f, "--{}={}", kind, value),
            ConfigureArg::Enable(name) => write!(f, "--enable-{}", name),
            ConfigureArg::Disable(name) => write!(f, "--disable-{}", name),
            ConfigureArg::With(name, None) => write!(f, "--with-{}", name),
            ConfigureArg::With(name, Some(value)) => write!(f, "--with-{}={}", name, value),
            ConfigureArg::Without(name) => write!(f, "--without-{}", name),
            ConfigureArg::Var(name, value) => write!(f, "{}={}", name, value),
        }
    }
}

/// Installation directories configure knows how to override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathKind {
    Datadir,
    Libdir,
    Includedir,
    Sysconfdir,
    Docdir,
    Localstatedir,
    Mandir,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PathKind::Datadir => "datadir",
            PathKind::Libdir => "libdir",
            PathKind::Includedir => "includedir",
            PathKind::Sysconfdir => "sysconfdir",
            PathKind::Docdir => "docdir",
            PathKind::Localstatedir => "localstatedir",
            PathKind::Mandir => "mandir",
        };
        write!(f, "{}", s)
    }
}

/// Path overrides; values are templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathOverrides {
    pub datadir: Option<String>,
    pub libdir: Option<String>,
    pub includedir: Option<String>,
    pub sysconfdir: Option<String>,
    pub docdir: Option<String>,
    pub localstatedir: Option<String>,
    pub mandir: Option<String>,
}

impl PathOverrides {
    fn entries(&self) -> Vec<(PathKind, &String)> {
        [
            (PathKind::Datadir, &self.datadir),
            (PathKind::Libdir, &self.libdir),
            (PathKind::Includedir, &self.includedir),
            (PathKind::Sysconfdir, &self.sysconfdir),
            (PathKind::Docdir, &self.docdir),
            (PathKind::Localstatedir, &self.localstatedir),
            (PathKind::Mandir, &self.mandir),
        ]
        .into_iter()
        .filter_map(|(kind, value)| value.as_ref().map(|v| (kind, v)))
        .collect()
    }
}

/// Feature switches, shared by the base options and platform overlays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureArgs {
    pub enable: Vec<String>,
    pub disable: Vec<String>,
    pub with: Vec<String>,
    pub without: Vec<String>,
    /// `--with-<key>=<value>`
    pub with_values: BTreeMap<String, String>,
    /// Trailing `NAME=value` arguments
    pub vars: BTreeMap<String, String>,
}

impl FeatureArgs {
    fn render_features(&self, vars: &TemplateVars, out: &mut Vec<ConfigureArg>) -> Result<(), TemplateError> {
        out.extend(self.enable.iter().map(|n| ConfigureArg::Enable(n.clone())));
        out.extend(self.disable.iter().map(|n| ConfigureArg::Disable(n.clone())));
        out.extend(self.with.iter().map(|n| ConfigureArg::With(n.clone(), None)));
        for (name, value) in &self.with_values {
            out.push(ConfigureArg::With(name.clone(), Some(vars.expand(value)?)));
        }
        out.extend(self.without.iter().map(|n| ConfigureArg::Without(n.clone())));
        Ok(())
    }

    fn render_vars(&self, vars: &TemplateVars, out: &mut Vec<ConfigureArg>) -> Result<(), TemplateError> {
        for (name, value) in &self.vars {
            out.push(ConfigureArg::Var(name.clone(), vars.expand(value)?));
        }
        Ok(())
    }
}

/// Everything passed to `./configure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigureOptions {
    /// Emit the standard prefix/libdir/debug arguments first
    #[serde(default = "default_true")]
    pub std_args: bool,

    #[serde(default)]
    pub paths: PathOverrides,

    #[serde(default)]
    pub enable: Vec<String>,

    #[serde(default)]
    pub disable: Vec<String>,

    #[serde(default)]
    pub with: Vec<String>,

    #[serde(default)]
    pub without: Vec<String>,

    #[serde(default)]
    pub with_values: BTreeMap<String, String>,

    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    #[serde(default)]
    pub linux: Option<FeatureArgs>,

    #[serde(default)]
    pub macos: Option<FeatureArgs>,
}

fn default_true() -> bool {
    true
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        ConfigureOptions {
            std_args: true,
            paths: PathOverrides::default(),
            enable: Vec::new(),
            disable: Vec::new(),
            with: Vec::new(),
            without: Vec::new(),
            with_values: BTreeMap::new(),
            vars: BTreeMap::new(),
            linux: None,
            macos: None,
        }
    }
}

impl ConfigureOptions {
    /// The platform-independent feature switches.
    pub fn base_features(&self) -> FeatureArgs {
        FeatureArgs {
            enable: self.enable.clone(),
            disable: self.disable.clone(),
            with: self.with.clone(),
            without: self.without.clone(),
            with_values: self.with_values.clone(),
            vars: self.vars.clone(),
        }
    }

    /// The overlay that applies to `platform`, if any.
    pub fn overlay_for(&self, platform: &Platform) -> Option<&FeatureArgs> {
        match platform.os() {
            Os::Linux => self.linux.as_ref(),
            Os::Macos => self.macos.as_ref(),
            Os::Other => None,
        }
    }

    /// Render the argument list.
    ///
    /// Order: standard args, paths, base features, platform overlay
    /// features, then `NAME=value` vars (base first).
    pub fn render(
        &self,
        layout: &KegLayout,
        platform: &Platform,
        vars: &TemplateVars,
    ) -> Result<Vec<ConfigureArg>, TemplateError> {
        let mut out = Vec::new();

        if self.std_args {
            out.extend(std_configure_args(layout));
        }

        for (kind, value) in self.paths.entries() {
            out.push(ConfigureArg::Path(kind, vars.expand(value)?));
        }

        let base = self.base_features();
        base.render_features(vars, &mut out)?;
        let overlay = self.overlay_for(platform);
        if let Some(overlay) = overlay {
            overlay.render_features(vars, &mut out)?;
        }

        base.render_vars(vars, &mut out)?;
        if let Some(overlay) = overlay {
            overlay.render_vars(vars, &mut out)?;
        }

        Ok(out)
    }
}

/// Arguments every autotools build gets unless opted out.
pub fn std_configure_args(layout: &KegLayout) -> Vec<ConfigureArg> {
    vec![
        ConfigureArg::Std("--disable-debug".to_string()),
        ConfigureArg::Std("--disable-dependency-tracking".to_string()),
        ConfigureArg::Std(format!("--prefix={}", layout.prefix().display())),
        ConfigureArg::Std(format!("--libdir={}", layout.lib().display())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::Arch;
    use crate::core::version::FormulaVersion;

    fn layout() -> KegLayout {
        KegLayout::new("/opt/keg", "postgresql@15", FormulaVersion::new("15.5"), 3)
    }

    fn render(opts: &ConfigureOptions, platform: &Platform) -> Vec<String> {
        let layout = layout();
        opts.render(&layout, platform, &layout.template_vars())
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_render_order() {
        let opts: ConfigureOptions = toml::from_str(
            r#"
enable = ["nls", "thread-safety"]
with = ["icu", "openssl"]
with_values = { uuid = "e2fs" }
vars = { PG_SYSROOT = "/sdk" }

[paths]
datadir = "{opt_pkgshare}"
sysconfdir = "{etc}"

[macos]
with = ["bonjour", "tcl"]
"#,
        )
        .unwrap();

        let linux = Platform::new(Os::Linux, Arch::X86_64);
        assert_eq!(
            render(&opts, &linux),
            vec![
                "--disable-debug",
                "--disable-dependency-tracking",
                "--prefix=/opt/keg/Cellar/postgresql@15/15.5_3",
                "--libdir=/opt/keg/Cellar/postgresql@15/15.5_3/lib",
                "--datadir=/opt/keg/opt/postgresql@15/share/postgresql@15",
                "--sysconfdir=/opt/keg/etc",
                "--enable-nls",
                "--enable-thread-safety",
                "--with-icu",
                "--with-openssl",
                "--with-uuid=e2fs",
                "PG_SYSROOT=/sdk",
            ]
        );

        let mac = Platform::new(Os::Macos, Arch::Arm64).with_macos_version(14);
        let args = render(&opts, &mac);
        let uuid = args.iter().position(|a| a == "--with-uuid=e2fs").unwrap();
        let bonjour = args.iter().position(|a| a == "--with-bonjour").unwrap();
        assert!(bonjour > uuid);
        assert_eq!(args.last().unwrap(), "PG_SYSROOT=/sdk");
    }

    #[test]
    fn test_without_std_args() {
        let opts = ConfigureOptions {
            std_args: false,
            without: vec!["readline".to_string()],
            ..ConfigureOptions::default()
        };
        let linux = Platform::new(Os::Linux, Arch::X86_64);
        assert_eq!(render(&opts, &linux), vec!["--without-readline"]);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let parsed: Result<ConfigureOptions, _> = toml::from_str("enabled = [\"nls\"]");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_bad_template_surfaces() {
        let opts: ConfigureOptions = toml::from_str("[paths]\ndatadir = \"{nowhere}\"").unwrap();
        let layout = layout();
        let linux = Platform::new(Os::Linux, Arch::X86_64);
        assert!(opts.render(&layout, &linux, &layout.template_vars()).is_err());
    }
}
