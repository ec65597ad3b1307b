//! Core metadata (`METADATA`) and `WHEEL` file rendering

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{Person, Project};

pub const METADATA_VERSION: &str = "2.4";
pub const README_CONTENT_TYPE: &str = "text/markdown; charset=UTF-8; variant=GFM";

/// RFC 5322 specials that force a quoted display name
const SPECIALS: &[char] = &['(', ')', '<', '>', '@', ',', ':', ';', '.', '"', '[', ']', '\\'];

/// Render the `.dist-info/WHEEL` file for `tag`
pub fn wheel_file(tag: &str) -> String {
    format!(
        "Wheel-Version: 1.0\n\
         Generator: pack-binary ({})\n\
         Root-Is-Purelib: false\n\
         Tag: {}\n",
        env!("CARGO_PKG_VERSION"),
        tag
    )
}

/// Format a person the way mail headers do: `Name <email>`, `email`, or `Name`
pub fn format_person(person: &Person) -> Option<String> {
    let name = person.name.as_deref().filter(|n| !n.is_empty());
    match (name, person.email.as_deref()) {
        (Some(name), Some(email)) if name.contains(SPECIALS) => {
            let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
            Some(format!("\"{}\" <{}>", escaped, email))
        }
        (Some(name), Some(email)) => Some(format!("{} <{}>", name, email)),
        (None, Some(email)) => Some(email.to_string()),
        (Some(name), None) => Some(name.to_string()),
        (None, None) => None,
    }
}

/// Render the `.dist-info/METADATA` file
///
/// `root` is the directory the readme path is resolved against.
pub fn metadata_file(project: &Project, root: &Path) -> Result<String> {
    let mut lines = vec![
        format!("Metadata-Version: {}", METADATA_VERSION),
        format!("Name: {}", project.name),
        format!("Version: {}", project.version),
        format!("Requires-Python: {}", project.requires_python),
    ];

    lines.extend(project.classifiers.iter().map(|c| format!("Classifier: {}", c)));

    if let Some(summary) = project.description.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Summary: {}", summary));
    }

    if let Some(license) = &project.license {
        lines.push(format!("License: {}", license.as_str()));
    }

    if !project.keywords.is_empty() {
        lines.push(format!("Keywords: {}", project.keywords.join(",")));
    }

    for (people, header) in [(&project.authors, "Author"), (&project.maintainers, "Maintainer")] {
        lines.extend(
            people
                .iter()
                .filter_map(format_person)
                .map(|p| format!("{}: {}", header, p)),
        );
    }

    for (label, url) in project.project_urls()? {
        lines.push(format!("Project-URL: {}, {}", label, url));
    }

    if let Some(readme) = project.readme.as_deref().filter(|r| !r.is_empty()) {
        let path = root.join(readme);
        let body = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read readme {}", path.display()))?;
        lines.push(format!("Description-Content-Type: {}", README_CONTENT_TYPE));
        lines.push(String::new());
        lines.push(body);
    }

    Ok(lines.join("\n") + "\n")
}
