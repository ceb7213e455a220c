//! Implementation of `keg fetch`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::core::formula::Formula;
use crate::sources::Downloader;
use crate::util::{GlobalContext, Shell};

/// Downloader configured from the context's cache and net settings.
pub fn downloader(ctx: &GlobalContext) -> Downloader {
    // reqwest's blocking client defaults to 30s when no timeout is given
    let timeout = ctx
        .config()
        .net
        .timeout_secs
        .map_or(Duration::from_secs(30), Duration::from_secs);
    Downloader::new(ctx.downloads_dir(), timeout)
}

/// Download and verify the source archive of `formula`.
pub fn fetch_source(formula: &Formula, downloader: &Downloader, shell: &Shell) -> Result<PathBuf> {
    downloader
        .fetch(
            &formula.source.url,
            &formula.source.file_name(),
            &formula.source.sha256,
            shell,
        )
        .with_context(|| format!("failed to fetch source for `{}`", formula.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::parse_formula;
    use crate::util::hash::sha256_bytes;
    use crate::util::shell::{ColorChoice, Verbosity};
    use tempfile::TempDir;

    #[test]
    fn test_fetch_into_context_cache() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("demo-1.0.tar.gz");
        std::fs::write(&archive, b"demo").unwrap();

        let formula = parse_formula(
            "demo",
            &format!(
                "name = \"demo\"\nversion = \"1.0\"\n\n[source]\nurl = \"{}\"\nsha256 = \"{}\"\n",
                url::Url::from_file_path(&archive).unwrap(),
                sha256_bytes(b"demo")
            ),
        );

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf())
            .unwrap()
            .with_cache_dir(tmp.path().join("cache"));
        let shell = Shell::new(Verbosity::Quiet, ColorChoice::Never);

        let path = fetch_source(&formula, &downloader(&ctx), &shell).unwrap();
        assert!(path.starts_with(tmp.path().join("cache/downloads")));
        assert!(path.to_string_lossy().ends_with("--demo-1.0.tar.gz"));
    }
}
