//! Single-member extraction from downloaded release archives
//!
//! Handles `.zip` and `.tar.gz` archives held in memory. The member is
//! matched by its exact path inside the archive.

use anyhow::{anyhow, Context, Result};
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use tar::Archive;
use zip::ZipArchive;

/// Mode used when the archive does not record one
pub const DEFAULT_EXECUTABLE_MODE: u32 = 0o755;

/// Archive container formats the packer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Pick the format from the URL suffix, falling back to magic bytes
    pub fn detect(url: &str, data: &[u8]) -> Result<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
        if path.ends_with(".zip") {
            return Ok(ArchiveFormat::Zip);
        }
        if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            return Ok(ArchiveFormat::TarGz);
        }

        match data {
            [b'P', b'K', 0x03, 0x04, ..] => Ok(ArchiveFormat::Zip),
            [0x1f, 0x8b, ..] => Ok(ArchiveFormat::TarGz),
            _ => Err(anyhow!("Unrecognised archive format for {}", url)),
        }
    }
}

/// The binary pulled out of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBinary {
    pub content: Vec<u8>,
    /// Unix permission bits recorded in the archive, if any
    pub unix_mode: Option<u32>,
}

impl ExtractedBinary {
    /// Permission bits to stamp on the packaged script
    pub fn executable_mode(&self) -> u32 {
        match self.unix_mode {
            Some(mode) if mode & 0o777 != 0 => mode & 0o7777,
            _ => DEFAULT_EXECUTABLE_MODE,
        }
    }
}

/// Extract the member named exactly `member` from `data`
pub fn extract_member(data: &[u8], format: ArchiveFormat, member: &str) -> Result<ExtractedBinary> {
    match format {
        ArchiveFormat::Zip => extract_from_zip(data, member),
        ArchiveFormat::TarGz => extract_from_tar_gz(data, member),
    }
}

fn extract_from_zip(data: &[u8], member: &str) -> Result<ExtractedBinary> {
    let mut archive = ZipArchive::new(Cursor::new(data)).context("Failed to read ZIP archive")?;

    let found = match archive.by_name(member) {
        Ok(mut file) if !file.is_dir() => {
            let mut content = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut content)
                .with_context(|| format!("Failed to extract {} from ZIP", member))?;
            Some(ExtractedBinary {
                content,
                unix_mode: file.unix_mode(),
            })
        }
        Ok(_) | Err(zip::result::ZipError::FileNotFound) => None,
        Err(e) => return Err(e).with_context(|| format!("Failed to read ZIP entry {}", member)),
    };

    found.ok_or_else(|| {
        anyhow!(
            "Binary {} not found in ZIP archive. Archive contains: {}",
            member,
            archive.file_names().collect::<Vec<_>>().join(", ")
        )
    })
}

fn extract_from_tar_gz(data: &[u8], member: &str) -> Result<ExtractedBinary> {
    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));
    let mut seen = Vec::new();

    for entry in archive.entries().context("Failed to read tar.gz archive")? {
        let mut entry = entry.context("Failed to read tar.gz entry")?;
        let path = entry.path()?.to_string_lossy().into_owned();
        let normalised = path.strip_prefix("./").unwrap_or(&path);

        if normalised == member && entry.header().entry_type().is_file() {
            let mut content = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut content)
                .with_context(|| format!("Failed to extract {} from tar.gz", member))?;
            return Ok(ExtractedBinary {
                content,
                unix_mode: entry.header().mode().ok(),
            });
        }
        seen.push(path);
    }

    Err(anyhow!(
        "Binary {} not found in tar.gz archive. Archive contains: {}",
        member,
        seen.join(", ")
    ))
}
