//! Release archive download and binary extraction
//!
//! ## Module Organization
//!
//! - `core` - HTTP client, streamed download and progress tracking
//! - `github` - GitHub API interaction for release asset discovery
//! - `extract` - Single-member extraction from ZIP and tar.gz archives

mod core;
mod extract;
mod github;

pub use self::core::{download_archive, http_client, USER_AGENT};
pub use extract::{extract_member, ArchiveFormat, ExtractedBinary, DEFAULT_EXECUTABLE_MODE};
pub use github::{fetch_release_assets, parse_asset_links, AssetUrls};
