//! Repackage prebuilt release binaries as platform-tagged Python wheels
//!
//! A `[tool.pack-binary]` table in `pyproject.toml` lists one target per
//! (platform, architecture). For each target the packer renders the download
//! URL, fetches the release archive, extracts the named binary and writes a
//! wheel whose `.data/scripts` directory installs it as a console command.

pub mod build;
pub mod cli;
pub mod config;
pub mod download;
pub mod generate;
pub mod target;
pub mod template;
pub mod wheel;

pub use build::{build_all, package_archive, resolve_target, BuildOptions, BuildReport};
pub use config::{Manifest, Project};
pub use target::{Arch, Platform, Target};
