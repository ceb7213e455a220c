//! Unpacking source archives.
//!
//! gzip-compressed and plain tarballs are unpacked in-process. Anything
//! else (bzip2, xz, zstd) is handed to the system `tar`, which detects the
//! compression itself.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

use crate::util::process::{find_tar, ProcessBuilder};

/// How an archive gets unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Tar,
    /// Delegated to the system `tar`
    Other,
}

impl ArchiveKind {
    pub fn from_file_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            ArchiveKind::TarGz
        } else if name.ends_with(".tar") {
            ArchiveKind::Tar
        } else {
            ArchiveKind::Other
        }
    }
}

/// Unpack `archive` into `dest` and return the source root.
///
/// When the archive holds a single top-level directory (the usual
/// `name-version/` layout) that directory is the source root; otherwise
/// `dest` itself is.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;

    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let unpacked = match ArchiveKind::from_file_name(&file_name) {
        ArchiveKind::TarGz => {
            let file = open(archive)?;
            unpack_tar(GzDecoder::new(BufReader::new(file)), dest)
        }
        ArchiveKind::Tar => unpack_tar(BufReader::new(open(archive)?), dest),
        ArchiveKind::Other => unpack_with_system_tar(archive, dest),
    };
    unpacked.with_context(|| format!("failed to extract {}", archive.display()))?;

    source_root(dest)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("failed to open {}", path.display()))
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_mtime(true);

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry
            .path()
            .context("failed to get entry path")?
            .to_string_lossy()
            .into_owned();

        // unpack_in refuses paths that would escape `dest`
        let unpacked = entry
            .unpack_in(dest)
            .with_context(|| format!("failed to extract {}", entry_path))?;
        if !unpacked {
            bail!("tarball entry escapes destination directory: {}", entry_path);
        }
    }

    Ok(())
}

fn unpack_with_system_tar(archive: &Path, dest: &Path) -> Result<()> {
    let Some(tar) = find_tar() else {
        bail!(
            "`tar` is required to extract {} but was not found in PATH",
            archive.display()
        );
    };

    ProcessBuilder::new(tar)
        .arg("-xf")
        .arg(archive)
        .arg("-C")
        .arg(dest)
        .exec_and_check()?;
    Ok(())
}

fn source_root(dest: &Path) -> Result<PathBuf> {
    let mut entries = std::fs::read_dir(dest)
        .with_context(|| format!("failed to read {}", dest.display()))?
        .collect::<Result<Vec<_>, _>>()?;

    if entries.len() == 1 {
        let only = entries.remove(0).path();
        if only.is_dir() {
            return Ok(only);
        }
    }
    Ok(dest.to_path_buf())
}
