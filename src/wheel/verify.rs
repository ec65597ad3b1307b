//! Integrity checks for built wheels

use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::path::Path;

use super::record::{self, record_hash};

#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    #[error("failed to open wheel: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read wheel archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("wheel has no .dist-info/RECORD")]
    MissingRecord,
    #[error("RECORD is invalid: {0}")]
    InvalidRecord(String),
    #[error("{0} is listed in RECORD but missing from the wheel")]
    MissingFile(String),
    #[error("{0} is in the wheel but not listed in RECORD")]
    Unlisted(String),
    #[error("{path} hash mismatch: RECORD says {expected}, content is {actual}")]
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("{path} size mismatch: RECORD says {expected}, content is {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },
}

/// Summary of a verified wheel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedWheel {
    pub files: usize,
    pub tag: Option<String>,
}

/// Verify the wheel at `path`
pub fn verify_wheel(path: &Path) -> Result<VerifiedWheel, VerifyError> {
    let file = std::fs::File::open(path)?;
    verify_archive(file)
}

/// Verify a wheel read from any seekable source
///
/// Every file must appear in `RECORD` with a matching hash and size.
pub fn verify_archive<R: Read + Seek>(reader: R) -> Result<VerifiedWheel, VerifyError> {
    let mut archive = zip::ZipArchive::new(reader)?;

    let mut contents = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let mut buffer = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buffer)?;
        contents.insert(file.name().to_string(), buffer);
    }

    let record_path = contents
        .keys()
        .find(|name| {
            name.ends_with(".dist-info/RECORD") && name.matches('/').count() == 1
        })
        .cloned()
        .ok_or(VerifyError::MissingRecord)?;

    let record_text = String::from_utf8(contents[&record_path].clone())
        .map_err(|e| VerifyError::InvalidRecord(e.to_string()))?;
    let rows = record::parse(&record_text).map_err(VerifyError::InvalidRecord)?;

    let mut listed = Vec::with_capacity(rows.len());
    for row in &rows {
        listed.push(row.path.as_str());
        if row.path == record_path {
            continue;
        }

        let content = contents
            .get(&row.path)
            .ok_or_else(|| VerifyError::MissingFile(row.path.clone()))?;

        let actual = record_hash(content);
        if row.hash != actual {
            return Err(VerifyError::HashMismatch {
                path: row.path.clone(),
                expected: row.hash.clone(),
                actual,
            });
        }

        let size = content.len() as u64;
        if let Some(expected) = row.size
            && expected != size
        {
            return Err(VerifyError::SizeMismatch {
                path: row.path.clone(),
                expected,
                actual: size,
            });
        }
    }

    if let Some(unlisted) = contents.keys().find(|name| !listed.contains(&name.as_str())) {
        return Err(VerifyError::Unlisted(unlisted.clone()));
    }

    let wheel_path = record_path.replace("/RECORD", "/WHEEL");
    let tag = contents
        .get(&wheel_path)
        .and_then(|w| std::str::from_utf8(w).ok())
        .and_then(|w| {
            w.lines()
                .find_map(|l| l.strip_prefix("Tag:").map(|t| t.trim().to_string()))
        });

    Ok(VerifiedWheel {
        files: contents.len(),
        tag,
    })
}
