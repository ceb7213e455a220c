//! Test fixtures for common test scenarios.
//!
//! Formula text generators and an in-memory tarball builder.

use flate2::write::GzEncoder;
use flate2::Compression;

/// A syntactically valid sha256 for formulas whose archive is never fetched.
pub const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// Smallest valid formula: name, version 1.0 and a source.
pub fn minimal_formula(name: &str, deps: &[&str]) -> String {
    let mut text = format!("name = \"{}\"\nversion = \"1.0\"\n", name);
    if !deps.is_empty() {
        let quoted: Vec<String> = deps.iter().map(|d| format!("\"{}\"", d)).collect();
        text.push_str(&format!("dependencies = [{}]\n", quoted.join(", ")));
    }
    text.push_str(&format!(
        r#"
[source]
url = "https://example.com/{name}-1.0.tar.gz"
sha256 = "{SHA_A}"
"#
    ));
    text
}

/// One entry of a fixture tarball.
#[derive(Debug, Clone)]
pub struct TarEntry {
    pub path: String,
    pub contents: Vec<u8>,
    pub mode: u32,
    pub is_dir: bool,
}

impl TarEntry {
    pub fn dir(path: &str) -> Self {
        TarEntry {
            path: path.to_string(),
            contents: Vec::new(),
            mode: 0o755,
            is_dir: true,
        }
    }

    pub fn file(path: &str, contents: impl Into<Vec<u8>>) -> Self {
        TarEntry {
            path: path.to_string(),
            contents: contents.into(),
            mode: 0o644,
            is_dir: false,
        }
    }

    pub fn executable(path: &str, contents: impl Into<Vec<u8>>) -> Self {
        TarEntry {
            mode: 0o755,
            ..TarEntry::file(path, contents)
        }
    }
}

/// Build a gzip-compressed tarball in memory.
pub fn tar_gz(entries: &[TarEntry]) -> Vec<u8> {
    let mut data = Vec::new();
    {
        let encoder = GzEncoder::new(&mut data, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for entry in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(&entry.path).unwrap();
            header.set_size(entry.contents.len() as u64);
            header.set_mode(entry.mode);
            if entry.is_dir {
                header.set_entry_type(tar::EntryType::Directory);
            }
            header.set_cksum();
            builder
                .append(&header, std::io::Cursor::new(&entry.contents))
                .unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap();
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formula::Formula;
    use std::path::Path;

    #[test]
    fn test_minimal_formula_parses() {
        let src = minimal_formula("zlib", &["zstd"]);
        let formula = Formula::parse(&src, Path::new("zlib.toml")).unwrap();
        assert_eq!(formula.dependencies.len(), 1);
    }

    #[test]
    fn test_tar_gz_is_gzip() {
        let data = tar_gz(&[TarEntry::file("a", "b")]);
        assert_eq!(&data[..2], &[0x1f, 0x8b]);
    }
}
