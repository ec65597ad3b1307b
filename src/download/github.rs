//! GitHub release asset discovery
//!
//! Prefers the REST API and falls back to scraping the release page's
//! expanded asset list when the API refuses (rate limits) or returns nothing.

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

/// GitHub release metadata from API
#[derive(Deserialize, Debug)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

/// GitHub release asset metadata
#[derive(Deserialize, Debug)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// Asset name → download URL for one release
pub type AssetUrls = BTreeMap<String, String>;

fn with_token(request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match std::env::var("GITHUB_TOKEN").or_else(|_| std::env::var("GH_TOKEN")) {
        Ok(token) if !token.is_empty() => request.bearer_auth(token),
        _ => request,
    }
}

/// Fetch the asset list of `repo` at `tag`
pub async fn fetch_release_assets(
    client: &reqwest::Client,
    repo: &str,
    tag: &str,
) -> Result<AssetUrls> {
    let url = format!("https://api.github.com/repos/{}/releases/tags/{}", repo, tag);
    debug!("fetching release metadata from {}", url);

    let response = with_token(client.get(&url))
        .header("Accept", "application/vnd.github+json")
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
        .with_context(|| format!("network error while fetching release metadata for {}", tag))?;

    if response.status().is_success() {
        let release: GitHubRelease = response
            .json()
            .await
            .with_context(|| format!("Failed to parse release metadata for {}", tag))?;
        let assets: AssetUrls = release
            .assets
            .into_iter()
            .map(|a| (a.name, a.browser_download_url))
            .collect();
        if !assets.is_empty() {
            return Ok(assets);
        }
        warn!(
            "GitHub API returned no assets for {}, falling back to HTML scraping",
            release.tag_name
        );
    } else {
        warn!(
            "GitHub API returned {}, falling back to HTML scraping for {}",
            response.status(),
            tag
        );
    }

    scrape_release_assets(client, repo, tag).await
}

async fn scrape_release_assets(
    client: &reqwest::Client,
    repo: &str,
    tag: &str,
) -> Result<AssetUrls> {
    let html_url = format!("https://github.com/{}/releases/expanded_assets/{}", repo, tag);
    let response = client
        .get(&html_url)
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
        .with_context(|| format!("failed to fetch release page {}", html_url))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "release page {} returned HTTP {}",
            html_url,
            response.status()
        ));
    }

    let html = response.text().await?;
    let assets = parse_asset_links(&html, repo, tag)?;
    if assets.is_empty() {
        return Err(anyhow!("failed to find assets on release page {}", html_url));
    }
    Ok(assets)
}

/// Extract `releases/download/{tag}/{name}` links from a release page
pub fn parse_asset_links(html: &str, repo: &str, tag: &str) -> Result<AssetUrls> {
    let pattern = Regex::new(&format!(
        r#"href="(?P<url>(?:https://github\.com)?/{}/releases/download/{}/(?P<name>[^"?#]+))""#,
        regex::escape(repo),
        regex::escape(tag)
    ))?;

    Ok(pattern
        .captures_iter(html)
        .map(|caps| {
            let url = &caps["url"];
            let url = if url.starts_with('/') {
                format!("https://github.com{}", url)
            } else {
                url.to_string()
            };
            (caps["name"].to_string(), url)
        })
        .collect())
}
