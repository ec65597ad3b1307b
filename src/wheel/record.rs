//! `RECORD` hashing and parsing

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// `sha256=<urlsafe base64, unpadded>` digest of `content`
pub fn record_hash(content: &[u8]) -> String {
    format!("sha256={}", URL_SAFE_NO_PAD.encode(Sha256::digest(content)))
}

/// One `RECORD` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    pub path: String,
    /// Empty for the `RECORD` file itself
    pub hash: String,
    pub size: Option<u64>,
}

impl RecordEntry {
    pub fn for_content(path: &str, content: &[u8]) -> Self {
        Self {
            path: path.to_string(),
            hash: record_hash(content),
            size: Some(content.len() as u64),
        }
    }

    /// The self-referencing `RECORD,,` row
    pub fn unhashed(path: &str) -> Self {
        Self {
            path: path.to_string(),
            hash: String::new(),
            size: None,
        }
    }
}

/// Render rows as `path,hash,size` lines
pub fn render(entries: &[RecordEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.path);
        out.push(',');
        out.push_str(&entry.hash);
        out.push(',');
        if let Some(size) = entry.size {
            out.push_str(&size.to_string());
        }
        out.push('\n');
    }
    out
}

/// Parse a `RECORD` file
///
/// Paths are split at the last two commas, so commas inside paths survive.
pub fn parse(text: &str) -> Result<Vec<RecordEntry>, String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut parts = line.rsplitn(3, ',');
            let size = parts.next();
            let hash = parts.next();
            let path = parts.next();
            match (path, hash, size) {
                (Some(path), Some(hash), Some(size)) => {
                    let size = if size.is_empty() {
                        None
                    } else {
                        Some(
                            size.parse::<u64>()
                                .map_err(|_| format!("invalid size in RECORD line {:?}", line))?,
                        )
                    };
                    Ok(RecordEntry {
                        path: path.to_string(),
                        hash: hash.to_string(),
                        size,
                    })
                }
                _ => Err(format!("malformed RECORD line {:?}", line)),
            }
        })
        .collect()
}
