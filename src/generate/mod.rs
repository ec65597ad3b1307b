//! `[tool.pack-binary]` generation from an upstream release
//!
//! Looks up the release's assets, maps them through `assets::ASSET_TARGETS`
//! and renders a fresh block. The existing `cmd` and `project` entries are
//! carried over (both are required); only `context.version`, `project.version` and the target
//! list change.

mod assets;

pub use assets::{AssetTarget, ASSET_TARGETS, DEFAULT_REPO, DEFAULT_TAG};

use anyhow::{anyhow, Context, Result};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use toml_edit::{value, ArrayOfTables, DocumentMut, InlineTable, Item, Table};

use crate::download::{fetch_release_assets, http_client, AssetUrls};

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+(?:\.\d+)?$").expect("valid tag pattern"));

/// Where the generated block goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(std::path::PathBuf),
    /// Replace the block inside the manifest itself
    Pyproject,
}

/// Reject tags that are not `x.y.z` or `x.y.z.w`
pub fn validate_tag(tag: &str) -> Result<&str> {
    if TAG_PATTERN.is_match(tag) {
        Ok(tag)
    } else {
        Err(anyhow!("tag {:?} is not in the expected format 'x.y.z'", tag))
    }
}

/// Upstream tags are `x.y.z`; the Python package keeps a fourth segment
/// for re-packs of the same upstream release.
pub fn normalize_python_version(tag: &str) -> String {
    if tag.split('.').count() == 4 {
        tag.to_string()
    } else {
        format!("{}.0", tag)
    }
}

fn existing_block(doc: &DocumentMut) -> Result<&Table> {
    doc.get("tool")
        .and_then(|tool| tool.get("pack-binary"))
        .and_then(Item::as_table)
        .ok_or_else(|| anyhow!("failed to find [tool.pack-binary] in pyproject.toml"))
}

/// Copy a table without its document position so it renders where it is inserted
fn detached(table: &Table) -> Table {
    let mut out = Table::new();
    for (key, item) in table.iter() {
        let item = match item {
            Item::Table(t) => Item::Table(detached(t)),
            other => other.clone(),
        };
        out.insert(key, item);
    }
    out
}

/// Build the new `[tool.pack-binary]` table
///
/// Every entry of `ASSET_TARGETS` must be present in `assets`.
pub fn build_config(pyproject: &DocumentMut, tag: &str, assets: &AssetUrls) -> Result<Table> {
    let tag = validate_tag(tag)?;
    let base = existing_block(pyproject)?;

    let cmd = base
        .get("cmd")
        .and_then(Item::as_str)
        .ok_or_else(|| anyhow!("[tool.pack-binary] has no cmd"))?;
    // The wheel version must follow the tag, so the metadata has to live in
    // the block being regenerated.
    let project = base
        .get("project")
        .and_then(Item::as_table)
        .ok_or_else(|| anyhow!("[tool.pack-binary] has no project table to carry the new version"))?;

    let missing: Vec<&str> = ASSET_TARGETS
        .iter()
        .filter(|a| !assets.contains_key(a.asset))
        .map(|a| a.asset)
        .collect();
    if !missing.is_empty() {
        return Err(anyhow!("missing release assets: {}", missing.join(", ")));
    }

    let mut block = Table::new();
    block.insert("cmd", value(cmd));

    let mut context = InlineTable::new();
    context.insert("version", tag.into());
    block.insert("context", value(context));

    let mut project = detached(project);
    project.insert("version", value(normalize_python_version(tag)));
    project.decor_mut().set_prefix("\n");
    for (_, item) in project.iter_mut() {
        if let Some(sub) = item.as_table_mut() {
            sub.decor_mut().set_prefix("\n");
        }
    }
    block.insert("project", Item::Table(project));

    let mut targets = ArrayOfTables::new();
    for asset in ASSET_TARGETS {
        let target = asset.to_target(&assets[asset.asset]);
        let mut entry = Table::new();
        entry.decor_mut().set_prefix("\n");
        entry.insert("url", value(target.url));
        entry.insert("name", value(target.name));
        entry.insert("platform", value(target.platform.as_str()));
        entry.insert("arch", value(target.arch.as_str()));
        if let Some(manylinux) = target.manylinux {
            entry.insert("manylinux", value(manylinux));
        }
        if let Some(version) = target.macos_target_version {
            entry.insert("macos_target_version", value(version));
        }
        targets.push(entry);
    }
    block.insert("target", Item::ArrayOfTables(targets));

    Ok(block)
}

/// Render `block` on its own, headed `[tool.pack-binary]`
pub fn render_block(block: Table) -> String {
    let mut tool = Table::new();
    tool.set_implicit(true);
    tool.insert("pack-binary", Item::Table(block));

    let mut doc = DocumentMut::new();
    doc["tool"] = Item::Table(tool);
    doc.to_string()
}

/// Replace the block inside `original`, leaving everything else untouched
pub fn replace_block(original: &str, mut block: Table) -> Result<String> {
    let mut doc: DocumentMut = original.parse().context("failed to parse pyproject.toml")?;
    let old = existing_block(&doc)?;
    *block.decor_mut() = old.decor().clone();
    if let Some(position) = old.position() {
        block.set_position(position);
    }
    doc["tool"]["pack-binary"] = Item::Table(block);
    Ok(doc.to_string())
}

/// Fetch release `tag` of `repo` and emit the generated block to `destination`
pub async fn generate(pyproject: &Path, repo: &str, tag: &str, destination: &Destination) -> Result<()> {
    let tag = validate_tag(tag)?;
    let original = std::fs::read_to_string(pyproject)
        .with_context(|| format!("Failed to read {}", pyproject.display()))?;
    let doc: DocumentMut = original.parse().context("failed to parse pyproject.toml")?;

    let client = http_client()?;
    let assets = fetch_release_assets(&client, repo, tag).await?;
    info!("found {} assets for {} {}", assets.len(), repo, tag);

    let block = build_config(&doc, tag, &assets)?;

    match destination {
        Destination::Stdout => {
            print!("{}", render_block(block));
        }
        Destination::File(path) => {
            std::fs::write(path, render_block(block))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        Destination::Pyproject => {
            let updated = replace_block(&original, block)?;
            std::fs::write(pyproject, updated)
                .with_context(|| format!("Failed to write {}", pyproject.display()))?;
            info!("updated {}", pyproject.display());
        }
    }
    Ok(())
}
