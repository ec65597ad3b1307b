//! Per-target build orchestration
//!
//! For every manifest target: render the URL, download the archive, extract
//! the binary, assemble the wheel and write it to the output directory.
//! Targets are independent; one failing target does not stop the others.

use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Manifest;
use crate::download::{download_archive, extract_member, http_client, ArchiveFormat};
use crate::target::{Platform, Target};
use crate::template;
use crate::wheel::{Wheel, WheelSpec};

/// Options for one `build` invocation
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub out_dir: PathBuf,
    /// Only build these platforms; empty means all
    pub platforms: Vec<Platform>,
    /// Maximum targets in flight
    pub jobs: usize,
    /// Resolve URLs and tags without downloading
    pub dry_run: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("dist"),
            platforms: Vec::new(),
            jobs: 1,
            dry_run: false,
        }
    }
}

/// A target with its URL and wheel tag resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub target: Target,
    pub url: String,
    pub tag: String,
}

/// Render the URL and compute the tag; no I/O
pub fn resolve_target(manifest: &Manifest, target: &Target) -> Result<ResolvedTarget> {
    let url = template::render(&target.url, &manifest.context)
        .with_context(|| format!("Failed to render URL for {}", target.label()))?;
    let tag = target
        .wheel_tag()
        .with_context(|| format!("Failed to compute wheel tag for {}", target.label()))?;
    Ok(ResolvedTarget {
        target: target.clone(),
        url,
        tag,
    })
}

/// Turn a downloaded archive into a wheel for `resolved`
pub fn package_archive(manifest: &Manifest, resolved: &ResolvedTarget, data: &[u8]) -> Result<Wheel> {
    let format = ArchiveFormat::detect(&resolved.url, data)?;
    let binary = extract_member(data, format, &resolved.target.name)
        .with_context(|| format!("Failed to extract {} from {}", resolved.target.name, resolved.url))?;

    let spec = WheelSpec {
        project: &manifest.project,
        cmd: &manifest.cmd,
        root: &manifest.root,
    };
    spec.assemble(&resolved.target, binary)
}

/// Outcome of one target
#[derive(Debug)]
pub struct TargetOutcome {
    pub label: String,
    pub result: Result<PathBuf>,
}

/// Outcome of a whole build
#[derive(Debug, Default)]
pub struct BuildReport {
    pub outcomes: Vec<TargetOutcome>,
}

impl BuildReport {
    pub fn built(&self) -> impl Iterator<Item = &Path> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(PathBuf::as_path))
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Collapse into an error if any target failed
    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        let failed: Vec<_> = self.failures().map(|o| o.label.clone()).collect();
        if !failed.is_empty() {
            return Err(anyhow!("{} target(s) failed: {}", failed.len(), failed.join(", ")));
        }
        Ok(self.outcomes.into_iter().filter_map(|o| o.result.ok()).collect())
    }
}

async fn build_target(
    client: reqwest::Client,
    manifest: Arc<Manifest>,
    target: Target,
    out_dir: PathBuf,
) -> Result<PathBuf> {
    let resolved = resolve_target(&manifest, &target)?;
    let data = download_archive(&client, &resolved.url, &target.label()).await?;

    tokio::task::spawn_blocking(move || {
        let wheel = package_archive(&manifest, &resolved, &data)?;
        info!("writing {}", wheel.file_name);
        wheel.write_to(&out_dir)
    })
    .await
    .context("Packaging task panicked")?
}

/// Build every selected target of `manifest`
pub async fn build_all(manifest: Manifest, options: &BuildOptions) -> Result<BuildReport> {
    let targets = manifest.select(&options.platforms);
    if targets.is_empty() {
        return Err(anyhow!("No manifest targets match the requested platforms"));
    }

    if options.dry_run {
        let outcomes = targets
            .iter()
            .map(|target| TargetOutcome {
                label: target.label(),
                result: resolve_target(&manifest, target)
                    .map(|r| {
                        let file_name = format!("{}-{}.whl", manifest.project.name_with_version(), r.tag);
                        info!("{} -> {} ({})", r.url, file_name, target.label());
                        options.out_dir.join(file_name)
                    })
                    .inspect_err(|e| error!("{}: {:#}", target.label(), e)),
            })
            .collect();
        return Ok(BuildReport { outcomes });
    }

    let client = http_client()?;
    let manifest = Arc::new(manifest);
    let jobs = options.jobs.max(1);

    let outcomes = stream::iter(targets)
        .map(|target| {
            let label = target.label();
            let fut = build_target(
                client.clone(),
                Arc::clone(&manifest),
                target,
                options.out_dir.clone(),
            );
            async move {
                let result = fut.await;
                if let Err(e) = &result {
                    error!("{}: {:#}", label, e);
                }
                TargetOutcome { label, result }
            }
        })
        .buffered(jobs)
        .collect()
        .await;

    Ok(BuildReport { outcomes })
}
