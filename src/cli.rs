use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::generate::{DEFAULT_REPO, DEFAULT_TAG};
use crate::target::Platform;

#[derive(Parser, Debug)]
#[command(name = "pack-binary")]
#[command(version, about = "Repackage prebuilt release binaries as Python wheels")]
pub struct Args {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub sub: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Download every manifest target and write one wheel per target
    Build {
        /// Path to the manifest
        #[arg(long, default_value = "pyproject.toml")]
        pyproject: PathBuf,

        /// Directory wheels are written to
        #[arg(long, short = 'o', default_value = "dist")]
        out_dir: PathBuf,

        /// Only build targets for this platform (repeatable)
        #[arg(long, value_parser = parse_platform)]
        platform: Vec<Platform>,

        /// Targets processed concurrently
        #[arg(long, short = 'j', default_value_t = 1)]
        jobs: usize,

        /// Print resolved URLs and wheel names without downloading
        #[arg(long)]
        dry_run: bool,
    },
    /// Regenerate [tool.pack-binary] from an upstream release
    GenerateConfig {
        /// Upstream release tag
        #[arg(long, default_value = DEFAULT_TAG)]
        tag: String,

        /// Upstream GitHub repository (owner/name)
        #[arg(long, default_value = DEFAULT_REPO)]
        repo: String,

        /// Manifest providing cmd and project metadata
        #[arg(long, default_value = "pyproject.toml")]
        pyproject: PathBuf,

        /// Replace the [tool.pack-binary] block in the manifest
        #[arg(long, conflicts_with = "output")]
        write_pyproject: bool,

        /// Write the generated block to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check wheels against their RECORD (Exit 0 = all valid)
    Verify {
        #[arg(required = true)]
        wheels: Vec<PathBuf>,
    },
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    match s {
        "win32" => Ok(Platform::Win32),
        "linux" => Ok(Platform::Linux),
        "osx" => Ok(Platform::Osx),
        other => Err(format!("unknown platform {other:?} (expected win32, linux or osx)")),
    }
}
