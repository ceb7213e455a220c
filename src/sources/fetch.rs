//! Downloading and verifying source archives.
//!
//! Downloads are cached under `<cache>/downloads/<sha256[..16]>--<file>`.
//! A cached file is reused only after its checksum is re-verified. A
//! download whose checksum does not match is deleted before the error is
//! returned, so a bad archive is never left behind to be extracted later.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use url::Url;

use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::hash::{sha256_file, HashingWriter};
use crate::util::{Shell, Status};

/// Errors specific to fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("checksum mismatch for {url}\n  expected: {expected}\n  actual:   {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("failed to download {url}: HTTP {status}")]
    Http { url: String, status: u16 },
}

impl FetchError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            FetchError::ChecksumMismatch {
                url,
                expected,
                actual,
            } => Diagnostic::error(format!("checksum mismatch for {}", url))
                .with_context(format!("expected: {}", expected))
                .with_context(format!("actual:   {}", actual))
                .with_suggestion(suggestions::CHECKSUM_MISMATCH),
            FetchError::Http { .. } => Diagnostic::error(self.to_string()),
        }
    }
}

/// Where a URL's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Remote(Url),
    Local(PathBuf),
}

impl Location {
    fn parse(url: &str) -> Result<Self> {
        match Url::parse(url) {
            Ok(u) if u.scheme() == "file" => u
                .to_file_path()
                .map(Location::Local)
                .map_err(|_| anyhow::anyhow!("invalid file url: {}", url)),
            Ok(u) => Ok(Location::Remote(u)),
            // Bare filesystem paths
            Err(_) => Ok(Location::Local(PathBuf::from(url))),
        }
    }
}

/// Fetches archives into the download cache.
#[derive(Debug, Clone)]
pub struct Downloader {
    dir: PathBuf,
    timeout: Duration,
}

impl Downloader {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Downloader {
            dir: dir.into(),
            timeout,
        }
    }

    /// Cache location for a download.
    pub fn cache_path(&self, file_name: &str, sha256: &str) -> PathBuf {
        let short = &sha256[..sha256.len().min(16)];
        self.dir.join(format!("{}--{}", short, file_name))
    }

    /// Fetch `url` as `file_name`, verifying it against `sha256`.
    ///
    /// Returns the path of the verified file in the cache.
    pub fn fetch(&self, url: &str, file_name: &str, sha256: &str, shell: &Shell) -> Result<PathBuf> {
        let dest = self.cache_path(file_name, sha256);

        if dest.is_file() {
            let actual = sha256_file(&dest)?;
            if actual == sha256 {
                tracing::debug!("using cached download {}", dest.display());
                shell.status(Status::Verified, format!("{} (cached)", file_name));
                return Ok(dest);
            }
            tracing::warn!("cached {} is corrupt, downloading again", dest.display());
            std::fs::remove_file(&dest)
                .with_context(|| format!("failed to remove {}", dest.display()))?;
        }

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let mut partial = dest.clone().into_os_string();
        partial.push(".incomplete");
        let partial = PathBuf::from(partial);
        shell.status(Status::Fetching, url);
        let actual = match Location::parse(url)? {
            Location::Local(path) => copy_local(&path, &partial),
            Location::Remote(remote) => self.download(&remote, &partial, file_name, shell),
        };
        let actual = match actual {
            Ok(hash) => hash,
            Err(e) => {
                let _ = std::fs::remove_file(&partial);
                return Err(e);
            }
        };

        if actual != sha256 {
            std::fs::remove_file(&partial)
                .with_context(|| format!("failed to remove {}", partial.display()))?;
            return Err(FetchError::ChecksumMismatch {
                url: url.to_string(),
                expected: sha256.to_string(),
                actual,
            }
            .into());
        }

        std::fs::rename(&partial, &dest)
            .with_context(|| format!("failed to move download into {}", dest.display()))?;
        shell.status(Status::Verified, format!("{} sha256 {}", file_name, &sha256[..sha256.len().min(16)]));
        Ok(dest)
    }

    /// Fetch a page as text, uncached. Used by livecheck.
    pub fn fetch_text(&self, url: &str) -> Result<String> {
        match Location::parse(url)? {
            Location::Local(path) => std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display())),
            Location::Remote(remote) => {
                let response = self
                    .client()?
                    .get(remote.clone())
                    .send()
                    .with_context(|| format!("failed to fetch {}", remote))?;
                if !response.status().is_success() {
                    return Err(FetchError::Http {
                        url: remote.to_string(),
                        status: response.status().as_u16(),
                    }
                    .into());
                }
                response
                    .text()
                    .with_context(|| format!("failed to read response body from {}", remote))
            }
        }
    }

    fn client(&self) -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("keg/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to create HTTP client")
    }

    fn download(&self, url: &Url, dest: &Path, label: &str, shell: &Shell) -> Result<String> {
        let mut response = self
            .client()?
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to download {}", url))?;

        if !response.status().is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        let progress = shell.bytes_progress(label, response.content_length());
        let file = File::create(dest)
            .with_context(|| format!("failed to create {}", dest.display()))?;
        let mut writer = HashingWriter::new(BufWriter::new(file));

        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = response
                .read(&mut buf)
                .with_context(|| format!("failed to read response body from {}", url))?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n])?;
            progress.inc(n as u64);
        }
        progress.finish();

        tracing::debug!("downloaded {} bytes from {}", writer.written(), url);
        let (_, hash) = writer.finish()?;
        Ok(hash)
    }
}

fn copy_local(src: &Path, dest: &Path) -> Result<String> {
    let mut input = File::open(src)
        .with_context(|| format!("failed to open source archive {}", src.display()))?;
    let file = File::create(dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;
    let mut writer = HashingWriter::new(BufWriter::new(file));
    io::copy(&mut input, &mut writer)
        .with_context(|| format!("failed to copy {}", src.display()))?;
    let (_, hash) = writer.finish()?;
    Ok(hash)
}
