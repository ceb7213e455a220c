//! Keg/cellar path conventions.
//!
//! ```text
//! <root>/Cellar/<name>/<pkg_version>   prefix (the keg)
//! <root>/opt/<name>                    opt prefix, links to the keg
//! <prefix>/{bin,lib,include,share}     per-keg directories
//! <prefix>/share/<name>                pkgshare
//! <prefix>/share/doc/<name>            doc
//! <root>/etc, <root>/var, <root>/var/log
//! <root>/var/<name>                    data directory
//! ```

use std::path::{Path, PathBuf};

use crate::core::version::FormulaVersion;
use crate::util::template::TemplateVars;

pub const RECEIPT_FILE: &str = "INSTALL_RECEIPT.json";

/// Install locations of one formula under an installation root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KegLayout {
    root: PathBuf,
    name: String,
    version: FormulaVersion,
    pkg_version: String,
}

impl KegLayout {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>, version: FormulaVersion, revision: u32) -> Self {
        let pkg_version = version.pkg_version(revision);
        KegLayout {
            root: root.into(),
            name: name.into(),
            version,
            pkg_version,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &FormulaVersion {
        &self.version
    }

    pub fn pkg_version(&self) -> &str {
        &self.pkg_version
    }

    /// `<root>/Cellar/<name>`, holding every installed version.
    pub fn rack(&self) -> PathBuf {
        self.root.join("Cellar").join(&self.name)
    }

    /// The keg itself.
    pub fn prefix(&self) -> PathBuf {
        self.rack().join(&self.pkg_version)
    }

    pub fn bin(&self) -> PathBuf {
        self.prefix().join("bin")
    }

    pub fn lib(&self) -> PathBuf {
        self.prefix().join("lib")
    }

    pub fn include(&self) -> PathBuf {
        self.prefix().join("include")
    }

    pub fn share(&self) -> PathBuf {
        self.prefix().join("share")
    }

    pub fn pkgshare(&self) -> PathBuf {
        self.share().join(&self.name)
    }

    pub fn doc(&self) -> PathBuf {
        self.share().join("doc").join(&self.name)
    }

    pub fn opt_prefix(&self) -> PathBuf {
        opt_prefix(&self.root, &self.name)
    }

    pub fn opt_bin(&self) -> PathBuf {
        self.opt_prefix().join("bin")
    }

    pub fn opt_lib(&self) -> PathBuf {
        self.opt_prefix().join("lib")
    }

    pub fn opt_include(&self) -> PathBuf {
        self.opt_prefix().join("include")
    }

    pub fn opt_share(&self) -> PathBuf {
        self.opt_prefix().join("share")
    }

    pub fn opt_pkgshare(&self) -> PathBuf {
        self.opt_share().join(&self.name)
    }

    pub fn etc(&self) -> PathBuf {
        self.root.join("etc")
    }

    pub fn var(&self) -> PathBuf {
        self.root.join("var")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.var().join("log")
    }

    /// Persistent data directory, `<root>/var/<name>`.
    pub fn datadir(&self) -> PathBuf {
        self.var().join(&self.name)
    }

    pub fn receipt_path(&self) -> PathBuf {
        self.prefix().join(RECEIPT_FILE)
    }

    /// Placeholders for this formula's own templates.
    pub fn template_vars(&self) -> TemplateVars {
        let path = |p: PathBuf| p.to_string_lossy().into_owned();
        let mut vars = opt_template_vars(&self.root, &self.name);
        vars.set("version", self.version.as_str())
            .set("pkg_version", self.pkg_version.as_str())
            .set("prefix", path(self.prefix()))
            .set("bin", path(self.bin()))
            .set("lib", path(self.lib()))
            .set("include", path(self.include()))
            .set("share", path(self.share()))
            .set("pkgshare", path(self.pkgshare()))
            .set("doc", path(self.doc()))
            .set("etc", path(self.etc()))
            .set("var", path(self.var()))
            .set("log_dir", path(self.log_dir()))
            .set("datadir", path(self.datadir()));
        vars
    }
}

/// `<root>/opt/<name>`.
pub fn opt_prefix(root: &Path, name: &str) -> PathBuf {
    root.join("opt").join(name)
}

/// Placeholders describing another formula through its opt prefix.
///
/// Only opt paths are exposed: they stay valid across version bumps of the
/// dependency.
pub fn opt_template_vars(root: &Path, name: &str) -> TemplateVars {
    let opt = opt_prefix(root, name);
    let path = |p: PathBuf| p.to_string_lossy().into_owned();
    let mut vars = TemplateVars::new();
    vars.set("root", root.to_string_lossy())
        .set("name", name)
        .set("opt_prefix", path(opt.clone()))
        .set("opt_bin", path(opt.join("bin")))
        .set("opt_lib", path(opt.join("lib")))
        .set("opt_include", path(opt.join("include")))
        .set("opt_share", path(opt.join("share")))
        .set("opt_pkgshare", path(opt.join("share").join(name)));
    vars
}
