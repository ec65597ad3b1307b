//! Canonical mapping of upstream release assets to manifest targets
//!
//! When upstream adds or drops a platform, update ONLY the ASSET_TARGETS
//! array below.

use crate::target::{Arch, Platform, Target};

/// Upstream repository whose releases are packaged
pub const DEFAULT_REPO: &str = "dprint/dprint";

/// Release tag packaged when none is given
pub const DEFAULT_TAG: &str = "0.51.1";

/// How one release asset becomes a manifest target
#[derive(Debug, Clone, Copy)]
pub struct AssetTarget {
    pub asset: &'static str,
    pub name: &'static str,
    pub platform: Platform,
    pub arch: Arch,
    pub manylinux: Option<&'static str>,
    pub macos_target_version: Option<&'static str>,
}

impl AssetTarget {
    pub fn to_target(&self, url: &str) -> Target {
        Target {
            url: url.to_string(),
            name: self.name.to_string(),
            platform: self.platform,
            arch: self.arch,
            manylinux: self.manylinux.map(str::to_string),
            macos_target_version: self.macos_target_version.map(str::to_string),
        }
    }
}

pub const ASSET_TARGETS: &[AssetTarget] = &[
    AssetTarget {
        asset: "dprint-x86_64-pc-windows-msvc.zip",
        name: "dprint.exe",
        platform: Platform::Win32,
        arch: Arch::Amd64,
        manylinux: None,
        macos_target_version: None,
    },
    AssetTarget {
        asset: "dprint-x86_64-unknown-linux-gnu.zip",
        name: "dprint",
        platform: Platform::Linux,
        arch: Arch::Amd64,
        manylinux: Some("2.17"),
        macos_target_version: None,
    },
    AssetTarget {
        asset: "dprint-aarch64-unknown-linux-gnu.zip",
        name: "dprint",
        platform: Platform::Linux,
        arch: Arch::Arm64,
        manylinux: Some("2.17"),
        macos_target_version: None,
    },
    AssetTarget {
        asset: "dprint-aarch64-apple-darwin.zip",
        name: "dprint",
        platform: Platform::Osx,
        arch: Arch::Arm64,
        manylinux: None,
        macos_target_version: Some("11.0"),
    },
    AssetTarget {
        asset: "dprint-x86_64-apple-darwin.zip",
        name: "dprint",
        platform: Platform::Osx,
        arch: Arch::Amd64,
        manylinux: None,
        macos_target_version: Some("11.0"),
    },
];
