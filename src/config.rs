//! `pyproject.toml` manifest loading
//!
//! The packer reads two tables:
//! - `[tool.pack-binary]` - command name, template context and targets
//! - `[project]` - wheel metadata, overridable by `[tool.pack-binary.project]`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::target::{Platform, Target};

/// Errors raised while loading the manifest
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{} has no [tool.pack-binary] table", .0.display())]
    MissingTable(PathBuf),
    #[error("{} has neither [tool.pack-binary.project] nor [project]", .0.display())]
    MissingProject(PathBuf),
    #[error("[tool.pack-binary] declares no targets")]
    NoTargets,
    #[error("project.urls.{0} must be a string")]
    InvalidUrl(String),
    #[error("targets {first} and {second} both produce a {tag} wheel")]
    DuplicateTarget {
        first: String,
        second: String,
        tag: String,
    },
}

/// A person listed under `authors` or `maintainers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// `license = "MIT"` or `license = { text = "MIT" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum License {
    Expression(String),
    Text { text: String },
}

impl License {
    pub fn as_str(&self) -> &str {
        match self {
            License::Expression(s) => s,
            License::Text { text } => text,
        }
    }
}

/// Wheel metadata; keys the packer cannot express are rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Project {
    pub name: String,
    pub version: String,
    pub requires_python: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Person>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Person>,
    /// Kept as a table so file order survives into `Project-URL` lines
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub urls: toml::Table,
}

impl Project {
    /// Distribution name as used in wheel file and directory names
    pub fn distribution(&self) -> String {
        self.name.replace('-', "_")
    }

    /// `{distribution}-{version}`, the prefix of `.data` and `.dist-info`
    pub fn name_with_version(&self) -> String {
        format!("{}-{}", self.distribution(), self.version)
    }

    /// `(label, url)` pairs in declaration order
    pub fn project_urls(&self) -> Result<Vec<(&str, &str)>, ConfigError> {
        self.urls
            .iter()
            .map(|(label, value)| {
                value
                    .as_str()
                    .map(|url| (label.as_str(), url))
                    .ok_or_else(|| ConfigError::InvalidUrl(label.clone()))
            })
            .collect()
    }
}

/// `[tool.pack-binary]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackBinary {
    /// Name of the installed command
    pub cmd: String,
    /// Variables available to URL templates
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    #[serde(default)]
    pub target: Vec<Target>,
}

#[derive(Debug, Deserialize)]
struct PyProject {
    /// Left loose; only checked when it is the metadata source
    #[serde(default)]
    project: Option<toml::Table>,
    #[serde(default)]
    tool: Option<Tools>,
}

#[derive(Debug, Deserialize)]
struct Tools {
    #[serde(rename = "pack-binary")]
    pack_binary: Option<PackBinary>,
}

/// Fully resolved manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    pub cmd: String,
    pub context: BTreeMap<String, String>,
    pub project: Project,
    pub targets: Vec<Target>,
    /// Directory containing `pyproject.toml`; relative paths resolve here
    pub root: PathBuf,
}

impl Manifest {
    /// Load and validate the manifest at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&text, path, root)
    }

    /// Parse manifest text; `origin` is only used in error messages
    pub fn parse(text: &str, origin: &Path, root: PathBuf) -> Result<Self, ConfigError> {
        let pyproject: PyProject = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        let pack = pyproject
            .tool
            .and_then(|t| t.pack_binary)
            .ok_or_else(|| ConfigError::MissingTable(origin.to_path_buf()))?;

        let project = match (pack.project, pyproject.project) {
            (Some(project), _) => project,
            (None, Some(table)) => toml::Value::Table(table)
                .try_into::<Project>()
                .map_err(|source| ConfigError::Parse {
                    path: origin.to_path_buf(),
                    source,
                })?,
            (None, None) => return Err(ConfigError::MissingProject(origin.to_path_buf())),
        };

        if pack.target.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        project.project_urls()?;
        check_unique_tags(&pack.target)?;

        Ok(Self {
            cmd: pack.cmd,
            context: pack.context,
            project,
            targets: pack.target,
            root,
        })
    }

    /// Targets restricted to `platforms`; an empty filter keeps everything
    pub fn select(&self, platforms: &[Platform]) -> Vec<Target> {
        self.targets
            .iter()
            .filter(|t| platforms.is_empty() || platforms.contains(&t.platform))
            .cloned()
            .collect()
    }
}

/// Two targets with the same wheel tag would overwrite each other's output.
/// Targets whose tag cannot be computed fail later, per target.
fn check_unique_tags(targets: &[Target]) -> Result<(), ConfigError> {
    let mut seen: BTreeMap<String, &Target> = BTreeMap::new();
    for target in targets {
        let Ok(tag) = target.wheel_tag() else {
            continue;
        };
        if let Some(first) = seen.get(&tag) {
            return Err(ConfigError::DuplicateTarget {
                first: first.label(),
                second: target.label(),
                tag,
            });
        }
        seen.insert(tag, target);
    }
    Ok(())
}
