//! Formula lookup across formula directories.
//!
//! A formula directory is a flat directory of `<name>.toml` files. Patch
//! files live next to them, usually in a `<name>/` subdirectory. The first
//! directory containing a formula wins.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::formula::{is_valid_name, Formula};
use crate::util::GlobalContext;

/// Something formulas can be loaded from.
pub trait FormulaSource {
    /// Load a formula by name. `Ok(None)` means no such formula exists.
    fn load(&self, name: &str) -> Result<Option<Formula>>;
}

/// Formulas found on disk.
#[derive(Debug, Clone)]
pub struct FormulaRegistry {
    dirs: Vec<PathBuf>,
}

impl FormulaRegistry {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        FormulaRegistry { dirs }
    }

    /// Registry over the context's formula directories.
    pub fn from_context(ctx: &GlobalContext) -> Self {
        FormulaRegistry::new(ctx.formula_dirs())
    }

    /// Directories searched, in priority order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Path of a formula file, if any directory has it.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        if !is_valid_name(name) {
            return None;
        }
        self.dirs
            .iter()
            .map(|dir| dir.join(format!("{}.toml", name)))
            .find(|path| path.is_file())
    }

    /// Load a formula by name, or from a path to a `.toml` file.
    pub fn get(&self, name_or_path: &str) -> Result<Formula> {
        let as_path = Path::new(name_or_path);
        if name_or_path.ends_with(".toml") && as_path.is_file() {
            return Formula::load(as_path)
                .with_context(|| format!("failed to load {}", as_path.display()));
        }

        match self.load(name_or_path)? {
            Some(formula) => Ok(formula),
            None => {
                let searched: Vec<String> =
                    self.dirs.iter().map(|d| d.display().to_string()).collect();
                bail!(
                    "could not find formula `{}` (searched: {})",
                    name_or_path,
                    if searched.is_empty() {
                        "no formula directories".to_string()
                    } else {
                        searched.join(", ")
                    }
                )
            }
        }
    }

    /// Names of every formula in every directory.
    pub fn names(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for dir in &self.dirs {
            if !dir.is_dir() {
                continue;
            }
            let entries = std::fs::read_dir(dir)
                .with_context(|| format!("failed to read formula directory {}", dir.display()))?;
            for entry in entries {
                let path = entry?.path();
                if path.extension().is_some_and(|e| e == "toml") {
                    if let Some(stem) = path.file_stem() {
                        names.insert(stem.to_string_lossy().into_owned());
                    }
                }
            }
        }
        Ok(names.into_iter().collect())
    }
}

impl FormulaSource for FormulaRegistry {
    fn load(&self, name: &str) -> Result<Option<Formula>> {
        let Some(path) = self.find(name) else {
            return Ok(None);
        };
        tracing::debug!("loading formula {} from {}", name, path.display());
        let formula = Formula::load(&path)
            .with_context(|| format!("failed to load formula `{}`", name))?;
        Ok(Some(formula))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::assertions::assert_error_contains;
    use crate::test_support::fixtures::minimal_formula;
    use tempfile::TempDir;

    fn write_formula(dir: &Path, name: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(format!("{}.toml", name)), minimal_formula(name, &[])).unwrap();
    }

    #[test]
    fn test_first_directory_wins() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        write_formula(&first, "zlib");
        write_formula(&second, "zlib");
        write_formula(&second, "zstd");

        let registry = FormulaRegistry::new(vec![first.clone(), second.clone()]);
        assert_eq!(registry.find("zlib"), Some(first.join("zlib.toml")));
        assert_eq!(registry.find("zstd"), Some(second.join("zstd.toml")));
        assert_eq!(registry.names().unwrap(), vec!["zlib", "zstd"]);
    }

    #[test]
    fn test_missing_formula() {
        let tmp = TempDir::new().unwrap();
        let registry = FormulaRegistry::new(vec![tmp.path().to_path_buf()]);

        assert!(registry.load("nope").unwrap().is_none());
        assert_error_contains(registry.get("nope"), "could not find formula `nope`");
    }

    #[test]
    fn test_get_by_path() {
        let tmp = TempDir::new().unwrap();
        write_formula(tmp.path(), "zlib");
        let registry = FormulaRegistry::new(Vec::new());

        let path = tmp.path().join("zlib.toml");
        let formula = registry.get(path.to_str().unwrap()).unwrap();
        assert_eq!(formula.name, "zlib");
    }

    #[test]
    fn test_invalid_names_never_touch_disk() {
        let registry = FormulaRegistry::new(vec![PathBuf::from("/")]);
        assert!(registry.find("../etc/passwd").is_none());
    }
}
