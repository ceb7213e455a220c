//! Formula summaries for `keg info`.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::core::dependency::DepKind;
use crate::core::formula::Formula;
use crate::core::platform::Platform;
use crate::core::service::service_label;
use crate::ops::receipt::installed_keg;

#[derive(Debug, Clone, Serialize)]
pub struct FormulaInfo {
    pub name: String,
    pub version: String,
    pub pkg_version: String,
    pub desc: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
    pub source_url: String,
    pub dependencies: Vec<DependencyInfo>,
    pub bottle: Option<BottleInfo>,
    pub keg_only: Option<String>,
    pub deprecated: Option<DeprecationInfo>,
    pub installed: Option<PathBuf>,
    pub service: Option<String>,
    pub caveats: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyInfo {
    pub name: String,
    pub kind: DepKind,
    pub installed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BottleInfo {
    pub tag: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeprecationInfo {
    pub date: NaiveDate,
    pub because: String,
    /// Whether the date has passed
    pub active: bool,
}

/// Summarize `formula` as seen from `root` on `platform`.
pub fn formula_info(
    formula: &Formula,
    root: &Path,
    platform: &Platform,
    today: NaiveDate,
) -> Result<FormulaInfo> {
    let caveats = formula
        .caveats
        .as_deref()
        .map(|c| formula.template_vars(root, platform).expand(c))
        .transpose()?;

    Ok(FormulaInfo {
        name: formula.name.clone(),
        version: formula.version.to_string(),
        pkg_version: formula.pkg_version(),
        desc: formula.desc.clone(),
        homepage: formula.homepage.clone(),
        license: formula.license.clone(),
        source_url: formula.source.url.clone(),
        dependencies: formula
            .dependencies_for(platform)
            .map(|d| DependencyInfo {
                name: d.name().to_string(),
                kind: d.kind(),
                installed: installed_keg(root, d.name()).is_some(),
            })
            .collect(),
        bottle: formula.bottle_for(platform).map(|(tag, sha)| BottleInfo {
            tag,
            sha256: sha.to_string(),
        }),
        keg_only: formula.keg_only.clone(),
        deprecated: formula.deprecate.as_ref().map(|d| DeprecationInfo {
            date: d.date,
            because: d.because.clone(),
            active: formula.is_deprecated(today),
        }),
        installed: installed_keg(root, &formula.name),
        service: formula.service.as_ref().map(|_| service_label(&formula.name)),
        caveats,
    })
}

impl fmt::Display for FormulaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.pkg_version)?;
        if let Some(desc) = &self.desc {
            writeln!(f, "{}", desc)?;
        }
        if let Some(homepage) = &self.homepage {
            writeln!(f, "{}", homepage)?;
        }
        if let Some(license) = &self.license {
            writeln!(f, "License: {}", license)?;
        }
        writeln!(f, "From: {}", self.source_url)?;

        match &self.installed {
            Some(keg) => writeln!(f, "Installed: {}", keg.display())?,
            None => writeln!(f, "Not installed")?,
        }
        match &self.bottle {
            Some(b) => writeln!(f, "Bottle: {} ({})", b.tag, b.sha256)?,
            None => writeln!(f, "Bottle: none for this platform")?,
        }
        if let Some(reason) = &self.keg_only {
            writeln!(f, "Keg-only: {}", reason)?;
        }
        if let Some(d) = &self.deprecated {
            let when = if d.active { "Deprecated" } else { "Will be deprecated" };
            writeln!(f, "{} on {}: {}", when, d.date, d.because)?;
        }

        if !self.dependencies.is_empty() {
            writeln!(f, "Dependencies:")?;
            for kind in [DepKind::Build, DepKind::Runtime] {
                let names: Vec<String> = self
                    .dependencies
                    .iter()
                    .filter(|d| d.kind == kind)
                    .map(|d| format!("{}{}", d.name, if d.installed { " ✔" } else { "" }))
                    .collect();
                if !names.is_empty() {
                    writeln!(f, "  {}: {}", kind, names.join(", "))?;
                }
            }
        }

        if let Some(label) = &self.service {
            writeln!(f, "Service: {}", label)?;
        }
        if let Some(caveats) = &self.caveats {
            writeln!(f, "Caveats:")?;
            for line in caveats.trim_end().lines() {
                writeln!(f, "  {}", line)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{Arch, Os};
    use crate::test_support::{parse_formula, SHA_A};
    use tempfile::TempDir;

    fn formula() -> Formula {
        parse_formula(
            "postgresql@15",
            &format!(
                r#"
name = "postgresql@15"
desc = "Object-relational database system"
version = "15.5"
revision = 1
keg_only = "versioned formula"
caveats = "Data lives in {{datadir}}"
dependencies = [{{ name = "pkg-config", kind = "build" }}, "icu4c", {{ name = "readline", platform = "linux" }}]

[source]
url = "https://ftp.postgresql.org/pub/source/v15.5/postgresql-15.5.tar.bz2"
sha256 = "{SHA_A}"

[deprecate]
date = "2027-11-11"
because = "unsupported"

[bottle]
x86_64_linux = "{SHA_A}"

[service]
run = ["{{opt_bin}}/postgres"]
"#
            ),
        )
    }

    #[test]
    fn test_info_for_platform() {
        let tmp = TempDir::new().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let info = formula_info(&formula(), tmp.path(), &Platform::new(Os::Linux, Arch::X86_64), today)
            .unwrap();

        assert_eq!(info.pkg_version, "15.5_1");
        assert_eq!(info.bottle.as_ref().unwrap().tag, "x86_64_linux");
        assert_eq!(info.dependencies.len(), 3);
        assert!(!info.deprecated.as_ref().unwrap().active);
        assert_eq!(info.service.as_deref(), Some("keg.postgresql@15"));
        assert_eq!(
            info.caveats.as_deref(),
            Some(format!("Data lives in {}", tmp.path().join("var/postgresql@15").display()).as_str())
        );
        assert!(info.installed.is_none());

        let text = info.to_string();
        assert!(text.starts_with("postgresql@15 15.5_1\n"));
        assert!(text.contains("Keg-only: versioned formula"));
        assert!(text.contains("  build: pkg-config"));
        assert!(text.contains("  runtime: icu4c, readline"));
        assert!(text.contains("Will be deprecated on 2027-11-11"));
    }

    #[test]
    fn test_platform_filters_deps_and_bottle() {
        let tmp = TempDir::new().unwrap();
        let today = NaiveDate::from_ymd_opt(2028, 1, 1).unwrap();
        let macos = Platform::new(Os::Macos, Arch::Arm64).with_macos_version(14);
        let info = formula_info(&formula(), tmp.path(), &macos, today).unwrap();

        let names: Vec<&str> = info.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["pkg-config", "icu4c"]);
        assert!(info.bottle.is_none());
        assert!(info.deprecated.unwrap().active);
    }
}
