//! Host platform detection and bottle tags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::process::ProcessBuilder;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macos,
    /// Anything else; formulas cannot target it explicitly.
    #[serde(skip)]
    Other,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Os::Linux => write!(f, "linux"),
            Os::Macos => write!(f, "macos"),
            Os::Other => write!(f, "other"),
        }
    }
}

/// CPU architecture, spelled the way bottle tags spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    Arm64,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::X86_64 => write!(f, "x86_64"),
            Arch::Arm64 => write!(f, "arm64"),
        }
    }
}

/// The platform formulas are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    os: Os,
    arch: Arch,
    /// macOS major version (14 for Sonoma), when known
    macos_version: Option<u32>,
}

impl Platform {
    pub fn new(os: Os, arch: Arch) -> Self {
        Platform {
            os,
            arch,
            macos_version: None,
        }
    }

    pub fn with_macos_version(mut self, major: u32) -> Self {
        self.macos_version = Some(major);
        self
    }

    /// Detect the host platform.
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::Macos,
            _ => Os::Other,
        };
        let arch = match std::env::consts::ARCH {
            "aarch64" | "arm64" => Arch::Arm64,
            _ => Arch::X86_64,
        };

        let mut platform = Platform::new(os, arch);
        if os == Os::Macos {
            if let Some(major) = detect_macos_major() {
                platform = platform.with_macos_version(major);
            }
        }
        platform
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn is_macos(&self) -> bool {
        self.os == Os::Macos
    }

    pub fn is_linux(&self) -> bool {
        self.os == Os::Linux
    }

    /// Bottle tag for this platform (`arm64_sonoma`, `sonoma`, `x86_64_linux`).
    pub fn bottle_tag(&self) -> Option<String> {
        match self.os {
            Os::Linux => Some(format!("{}_linux", self.arch)),
            Os::Macos => {
                let codename = macos_codename(self.macos_version?)?;
                Some(match self.arch {
                    Arch::Arm64 => format!("arm64_{}", codename),
                    Arch::X86_64 => codename.to_string(),
                })
            }
            Os::Other => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bottle_tag() {
            Some(tag) => write!(f, "{}", tag),
            None => write!(f, "{}-{}", self.arch, self.os),
        }
    }
}

/// Marketing name used in macOS bottle tags.
pub fn macos_codename(major: u32) -> Option<&'static str> {
    match major {
        11 => Some("big_sur"),
        12 => Some("monterey"),
        13 => Some("ventura"),
        14 => Some("sonoma"),
        15 => Some("sequoia"),
        26 => Some("tahoe"),
        _ => None,
    }
}

fn detect_macos_major() -> Option<u32> {
    let output = ProcessBuilder::new("sw_vers")
        .arg("-productVersion")
        .exec_and_check()
        .ok()?;
    let version = String::from_utf8_lossy(&output.stdout);
    version.trim().split('.').next()?.parse().ok()
}
