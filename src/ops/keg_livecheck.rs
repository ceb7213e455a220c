//! Upstream version checks.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::core::formula::Formula;
use crate::core::version::FormulaVersion;
use crate::sources::Downloader;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LivecheckResult {
    pub name: String,
    pub current: FormulaVersion,
    pub latest: Option<FormulaVersion>,
    pub outdated: bool,
}

/// Fetch the formula's livecheck page and compare versions.
pub fn livecheck(formula: &Formula, downloader: &Downloader) -> Result<LivecheckResult> {
    let check = formula
        .livecheck
        .as_ref()
        .with_context(|| format!("formula `{}` has no livecheck", formula.name))?;

    tracing::info!("checking {} for new versions of {}", check.url, formula.name);
    let page = downloader.fetch_text(&check.url)?;
    let latest = latest_version(&page, &check.regex)
        .with_context(|| format!("livecheck for `{}` failed", formula.name))?;

    if latest.is_none() {
        tracing::warn!("no versions matched `{}` at {}", check.regex, check.url);
    }

    Ok(LivecheckResult {
        name: formula.name.clone(),
        outdated: latest.as_ref().is_some_and(|l| *l > formula.version),
        current: formula.version.clone(),
        latest,
    })
}

/// Greatest version captured by the first group of `pattern` in `page`.
pub fn latest_version(page: &str, pattern: &str) -> Result<Option<FormulaVersion>> {
    let re = Regex::new(pattern).with_context(|| format!("invalid livecheck regex `{}`", pattern))?;
    if re.captures_len() < 2 {
        anyhow::bail!("livecheck regex `{}` has no capture group", pattern);
    }

    Ok(re
        .captures_iter(page)
        .filter_map(|caps| caps.get(1))
        .map(|m| FormulaVersion::new(m.as_str()))
        .max())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{parse_formula, SHA_A};
    use std::time::Duration;
    use tempfile::TempDir;

    const PAGE: &str = r#"
<a href="v15.4/">v15.4/</a>
<a href="v15.10/">v15.10/</a>
<a href="v15.5/">v15.5/</a>
<a href="v16.1/">v16.1/</a>
"#;

    #[test]
    fn test_latest_is_numeric_max() {
        let latest = latest_version(PAGE, r#"href=["']?v?(15(?:\.\d+)+)/?["' >]"#).unwrap();
        assert_eq!(latest, Some(FormulaVersion::new("15.10")));
    }

    #[test]
    fn test_regex_needs_a_group() {
        assert!(latest_version(PAGE, r"v15\.\d+").is_err());
        assert_eq!(latest_version("nothing", r"v(\d+)").unwrap(), None);
    }

    #[test]
    fn test_livecheck_against_local_page() {
        let tmp = TempDir::new().unwrap();
        let page = tmp.path().join("index.html");
        std::fs::write(&page, PAGE).unwrap();

        let formula = parse_formula(
            "demo",
            &format!(
                r#"
name = "demo"
version = "15.5"

[source]
url = "https://example.com/demo.tar.gz"
sha256 = "{SHA_A}"

[livecheck]
url = "{}"
regex = 'href="v(15(?:\.\d+)+)/"'
"#,
                page.display()
            ),
        );

        let downloader = Downloader::new(tmp.path().join("downloads"), Duration::from_secs(5));
        let result = livecheck(&formula, &downloader).unwrap();
        assert_eq!(result.latest, Some(FormulaVersion::new("15.10")));
        assert!(result.outdated);
    }
}
