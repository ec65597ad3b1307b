//! `{{ key }}` substitution for download URL templates

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder pattern")
});

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template {template:?} references undefined variable {name:?}")]
    Undefined { template: String, name: String },
    #[error("template {template:?} still contains placeholder syntax after rendering: {rendered:?}")]
    Unresolved { template: String, rendered: String },
}

/// Render `template` against `context`
///
/// Every `{{ name }}` must be defined in `context`, and the output may not
/// contain any leftover `{{`/`}}` or `{name}`-style placeholders.
pub fn render(template: &str, context: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    let mut missing = None;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        match context.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    if let Some(name) = missing {
        return Err(TemplateError::Undefined {
            template: template.to_string(),
            name,
        });
    }

    if has_placeholder(&rendered) {
        return Err(TemplateError::Unresolved {
            template: template.to_string(),
            rendered: rendered.into_owned(),
        });
    }

    Ok(rendered.into_owned())
}

/// True if `s` still looks like an unrendered template
pub fn has_placeholder(s: &str) -> bool {
    s.contains("{{") || s.contains("}}") || s.contains("{%") || has_brace_var(s)
}

fn has_brace_var(s: &str) -> bool {
    static BRACE_VAR: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\{[A-Za-z_][A-Za-z0-9_]*\}").expect("valid brace pattern"));
    BRACE_VAR.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_version() {
        let url = render(
            "https://github.com/dprint/dprint/releases/download/{{ version }}/dprint-x86_64-unknown-linux-gnu.zip",
            &ctx(&[("version", "0.51.1")]),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://github.com/dprint/dprint/releases/download/0.51.1/dprint-x86_64-unknown-linux-gnu.zip"
        );
    }

    #[test]
    fn tolerates_missing_whitespace() {
        assert_eq!(render("v{{version}}", &ctx(&[("version", "1")])).unwrap(), "v1");
    }

    #[test]
    fn plain_urls_pass_through() {
        let url = "https://example.invalid/a.zip";
        assert_eq!(render(url, &BTreeMap::new()).unwrap(), url);
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let err = render("{{ version }}/{{ arch }}", &ctx(&[("version", "1")])).unwrap_err();
        assert_eq!(
            err,
            TemplateError::Undefined {
                template: "{{ version }}/{{ arch }}".into(),
                name: "arch".into()
            }
        );
    }

    #[test]
    fn leftover_placeholders_are_an_error() {
        assert!(matches!(
            render("https://x/{version}/a.zip", &BTreeMap::new()),
            Err(TemplateError::Unresolved { .. })
        ));
        assert!(matches!(
            render("https://x/{{ 1 }}/a.zip", &BTreeMap::new()),
            Err(TemplateError::Unresolved { .. })
        ));
    }
}
