//! Archive download with progress tracking

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::time::Duration;
use tokio::time::timeout;

const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(30); // Initial connection
const DOWNLOAD_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300); // 5 min no data
const MAX_PREALLOCATION: u64 = 256 << 20;

pub const USER_AGENT: &str = concat!("pack-binary/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client used for archive and API requests
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

fn progress_bar(total: Option<u64>, label: &str) -> ProgressBar {
    let bar = match total {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    let style = ProgressStyle::with_template(
        "{prefix:>16} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    bar.set_style(style);
    bar.set_prefix(label.to_string());
    bar
}

/// Content-Length is only a hint; the buffer still grows past the cap
fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.unwrap_or(0).min(MAX_PREALLOCATION) as usize
}

/// Download `url` fully into memory
///
/// Redirects are followed. Non-success statuses and stalled transfers are
/// errors; there is no retry.
pub async fn download_archive(client: &reqwest::Client, url: &str, label: &str) -> Result<Vec<u8>> {
    info!("downloading {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("Download of {} failed: HTTP {}", url, status));
    }

    let total_bytes = response.content_length();
    let bar = progress_bar(total_bytes, label);
    let mut data = Vec::with_capacity(initial_capacity(total_bytes));
    let mut stream = response.bytes_stream();

    loop {
        let chunk = match timeout(DOWNLOAD_INACTIVITY_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => {
                bar.abandon();
                return Err(e).with_context(|| format!("Failed while downloading {}", url));
            }
            Ok(None) => break,
            Err(_) => {
                bar.abandon();
                return Err(anyhow!(
                    "Download timeout: No data received for {} seconds while downloading {}. \
                     Downloaded {} bytes.",
                    DOWNLOAD_INACTIVITY_TIMEOUT.as_secs(),
                    url,
                    data.len()
                ));
            }
        };

        data.extend_from_slice(&chunk);
        bar.set_position(data.len() as u64);
    }

    bar.finish_and_clear();

    if let Some(expected) = total_bytes
        && expected != data.len() as u64
    {
        return Err(anyhow!(
            "Truncated download of {}: expected {} bytes, got {}",
            url,
            expected,
            data.len()
        ));
    }

    debug!("downloaded {} bytes from {}", data.len(), url);
    Ok(data)
}
