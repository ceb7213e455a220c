//! Linking kegs into the installation root.
//!
//! Links are relative so the whole root can be moved.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::layout::KegLayout;
use crate::util::fs::{relative_path, replace_symlink};

/// Point `<root>/opt/<name>` at the keg.
pub fn link_opt(layout: &KegLayout) -> Result<PathBuf> {
    let link = layout.opt_prefix();
    relative_link(&layout.prefix(), &link)?;
    Ok(link)
}

/// Link every executable in the keg's `bin` into `bin_dir`.
///
/// Returns the links created. A keg without `bin` links nothing.
pub fn link_bins(layout: &KegLayout, bin_dir: &Path) -> Result<Vec<PathBuf>> {
    let keg_bin = layout.bin();
    if !keg_bin.is_dir() {
        return Ok(Vec::new());
    }

    let mut links = Vec::new();
    for entry in WalkDir::new(&keg_bin).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to read {}", keg_bin.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let link = bin_dir.join(entry.file_name());
        relative_link(entry.path(), &link)?;
        links.push(link);
    }
    tracing::debug!("linked {} executables from {}", links.len(), keg_bin.display());
    Ok(links)
}

fn relative_link(target: &Path, link: &Path) -> Result<()> {
    let base = link.parent().unwrap_or(Path::new("."));
    replace_symlink(&relative_path(base, target), link)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::version::FormulaVersion;
    use tempfile::TempDir;

    #[test]
    fn test_opt_and_bin_links_are_relative() {
        let tmp = TempDir::new().unwrap();
        let layout = KegLayout::new(tmp.path(), "demo", FormulaVersion::new("1.0"), 1);
        std::fs::create_dir_all(layout.bin()).unwrap();
        std::fs::write(layout.bin().join("demo"), "#!/bin/sh\n").unwrap();

        let opt = link_opt(&layout).unwrap();
        assert_eq!(
            std::fs::read_link(&opt).unwrap(),
            PathBuf::from("../Cellar/demo/1.0_1")
        );
        assert_eq!(
            std::fs::canonicalize(&opt).unwrap(),
            std::fs::canonicalize(layout.prefix()).unwrap()
        );

        let bin_dir = tmp.path().join("bin");
        let links = link_bins(&layout, &bin_dir).unwrap();
        assert_eq!(links, vec![bin_dir.join("demo")]);
        assert_eq!(
            std::fs::read_link(bin_dir.join("demo")).unwrap(),
            PathBuf::from("../Cellar/demo/1.0_1/bin/demo")
        );
    }

    #[test]
    fn test_relinking_replaces_old_version() {
        let tmp = TempDir::new().unwrap();
        let old = KegLayout::new(tmp.path(), "demo", FormulaVersion::new("1.0"), 0);
        let new = KegLayout::new(tmp.path(), "demo", FormulaVersion::new("1.1"), 0);
        std::fs::create_dir_all(old.prefix()).unwrap();
        std::fs::create_dir_all(new.prefix()).unwrap();

        link_opt(&old).unwrap();
        link_opt(&new).unwrap();
        assert_eq!(
            std::fs::read_link(new.opt_prefix()).unwrap(),
            PathBuf::from("../Cellar/demo/1.1")
        );
    }
}
