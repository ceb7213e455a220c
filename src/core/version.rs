//! Formula versions.
//!
//! Upstream versions are not semver (`15.5`, `1.1.1w`, `2024a`), so they are
//! compared component by component: numeric parts numerically, everything
//! else lexically, numbers sorting after letters at the same position.
//! Spellings that compare equal that way (`15.05`, `15.5`) fall back to the
//! raw string, so ordering agrees with `Eq`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaVersion(String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Component<'a> {
    Text(&'a str),
    Number(u64),
}

impl FormulaVersion {
    pub fn new(version: impl Into<String>) -> Self {
        FormulaVersion(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First numeric component (`15` for `15.5`).
    pub fn major(&self) -> Option<u64> {
        self.components().into_iter().find_map(|c| match c {
            Component::Number(n) => Some(n),
            Component::Text(_) => None,
        })
    }

    /// Version with the revision suffix used for keg directories.
    pub fn pkg_version(&self, revision: u32) -> String {
        if revision == 0 {
            self.0.clone()
        } else {
            format!("{}_{}", self.0, revision)
        }
    }

    fn components(&self) -> Vec<Component<'_>> {
        let mut out = Vec::new();
        for part in self.0.split(['.', '-', '_', '+']) {
            let mut rest = part;
            while !rest.is_empty() {
                let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
                if digits > 0 {
                    let (num, tail) = rest.split_at(digits);
                    out.push(Component::Number(num.parse().unwrap_or(u64::MAX)));
                    rest = tail;
                } else {
                    let letters = rest.chars().take_while(|c| !c.is_ascii_digit()).count();
                    let (text, tail) = rest.split_at(letters);
                    out.push(Component::Text(text));
                    rest = tail;
                }
            }
        }
        out
    }
}

impl Ord for FormulaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components()
            .cmp(&other.components())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for FormulaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FormulaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FormulaVersion {
    fn from(s: &str) -> Self {
        FormulaVersion::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> FormulaVersion {
        FormulaVersion::new(s)
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("15.10") > v("15.9"));
        assert!(v("15.5") > v("15.4.1"));
        assert!(v("16") > v("15.99"));
        assert_eq!(v("15.5").cmp(&v("15.5")), Ordering::Equal);
    }

    #[test]
    fn test_ordering_agrees_with_eq() {
        assert_ne!(v("15.05"), v("15.5"));
        assert_ne!(v("15.05").cmp(&v("15.5")), Ordering::Equal);
        assert!(v("15.05") < v("15.6"));
        assert!(v("15.5") < v("15.6"));

        let latest = ["15.5", "15.05", "15.4"].into_iter().map(v).max().unwrap();
        assert_eq!(latest, v("15.5"));
    }

    #[test]
    fn test_letter_suffixes() {
        assert!(v("1.1.1w") > v("1.1.1v"));
        assert!(v("1.1.1") < v("1.1.1a"));
        assert!(v("2024a") < v("2024b"));
    }

    #[test]
    fn test_pkg_version() {
        assert_eq!(v("15.5").pkg_version(0), "15.5");
        assert_eq!(v("15.5").pkg_version(3), "15.5_3");
    }

    #[test]
    fn test_major() {
        assert_eq!(v("15.5").major(), Some(15));
        assert_eq!(v("v2.0").major(), Some(2));
    }
}
