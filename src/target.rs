//! Manifest targets and wheel tag computation

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `MAJOR.MINOR` form required for manylinux and macOS version constraints
static OS_VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+$").expect("valid OS version pattern"));

/// Operating system a prebuilt binary runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Win32,
    Linux,
    Osx,
}

impl Platform {
    /// Suffix appended to the installed command name
    pub fn executable_suffix(&self) -> &'static str {
        match self {
            Platform::Win32 => ".exe",
            Platform::Linux | Platform::Osx => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Win32 => "win32",
            Platform::Linux => "linux",
            Platform::Osx => "osx",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture, spelled the way upstream release manifests spell it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    /// Architecture suffix used in manylinux platform tags
    fn linux_tag(&self) -> &'static str {
        match self {
            Arch::Amd64 => "x86_64",
            Arch::Arm64 => "aarch64",
        }
    }

    /// Architecture suffix used in macosx platform tags
    fn macos_tag(&self) -> &'static str {
        match self {
            Arch::Amd64 => "x86_64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while computing a wheel tag
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TagError {
    #[error("{field} is required for target(url={url:?})")]
    MissingConstraint { field: &'static str, url: String },
    #[error("{field} must match the pattern of {pattern:?}, got {value} instead")]
    MalformedConstraint {
        field: &'static str,
        pattern: &'static str,
        value: String,
    },
}

/// One `[[tool.pack-binary.target]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    /// Download URL template, rendered against the manifest context
    pub url: String,
    /// Archive member holding the binary
    pub name: String,
    pub platform: Platform,
    pub arch: Arch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manylinux: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macos_target_version: Option<String>,
}

impl Target {
    /// Compute the `python-abi-platform` wheel tag for this target
    pub fn wheel_tag(&self) -> Result<String, TagError> {
        match self.platform {
            Platform::Win32 => Ok(format!("py3-none-win_{}", self.arch.as_str())),
            Platform::Linux => {
                let manylinux = self.os_constraint("manylinux", self.manylinux.as_deref())?;
                Ok(format!(
                    "py3-none-manylinux_{}_{}",
                    manylinux.replace('.', "_"),
                    self.arch.linux_tag()
                ))
            }
            Platform::Osx => {
                let version = self.os_constraint(
                    "macos_target_version",
                    self.macos_target_version.as_deref(),
                )?;
                Ok(format!(
                    "py3-none-macosx_{}_{}",
                    version.replace('.', "_"),
                    self.arch.macos_tag()
                ))
            }
        }
    }

    fn os_constraint<'a>(
        &self,
        field: &'static str,
        value: Option<&'a str>,
    ) -> Result<&'a str, TagError> {
        let value = value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| TagError::MissingConstraint {
                field,
                url: self.url.clone(),
            })?;

        if !OS_VERSION_PATTERN.is_match(value) {
            return Err(TagError::MalformedConstraint {
                field,
                pattern: r"^\d+\.\d+$",
                value: value.to_string(),
            });
        }
        Ok(value)
    }

    /// Short label for log lines, e.g. `linux-arm64`
    pub fn label(&self) -> String {
        format!("{}-{}", self.platform, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(platform: Platform, arch: Arch) -> Target {
        Target {
            url: "https://example.invalid/tool.zip".into(),
            name: "tool".into(),
            platform,
            arch,
            manylinux: None,
            macos_target_version: None,
        }
    }

    #[test]
    fn windows_tags_use_arch_verbatim() {
        assert_eq!(
            target(Platform::Win32, Arch::Amd64).wheel_tag().unwrap(),
            "py3-none-win_amd64"
        );
        assert_eq!(
            target(Platform::Win32, Arch::Arm64).wheel_tag().unwrap(),
            "py3-none-win_arm64"
        );
    }

    #[test]
    fn linux_tags_map_arch_and_version() {
        let mut t = target(Platform::Linux, Arch::Arm64);
        t.manylinux = Some("2.17".into());
        assert_eq!(t.wheel_tag().unwrap(), "py3-none-manylinux_2_17_aarch64");

        t.arch = Arch::Amd64;
        assert_eq!(t.wheel_tag().unwrap(), "py3-none-manylinux_2_17_x86_64");
    }

    #[test]
    fn macos_tags_map_arch_and_version() {
        let mut t = target(Platform::Osx, Arch::Arm64);
        t.macos_target_version = Some("11.0".into());
        assert_eq!(t.wheel_tag().unwrap(), "py3-none-macosx_11_0_arm64");

        t.arch = Arch::Amd64;
        assert_eq!(t.wheel_tag().unwrap(), "py3-none-macosx_11_0_x86_64");
    }

    #[test]
    fn missing_constraints_are_rejected() {
        let err = target(Platform::Linux, Arch::Amd64).wheel_tag().unwrap_err();
        assert!(matches!(
            err,
            TagError::MissingConstraint {
                field: "manylinux",
                ..
            }
        ));

        let err = target(Platform::Osx, Arch::Amd64).wheel_tag().unwrap_err();
        assert!(matches!(
            err,
            TagError::MissingConstraint {
                field: "macos_target_version",
                ..
            }
        ));
    }

    #[test]
    fn malformed_constraints_are_rejected() {
        let mut t = target(Platform::Linux, Arch::Amd64);
        t.manylinux = Some("2014".into());
        assert!(matches!(
            t.wheel_tag(),
            Err(TagError::MalformedConstraint { .. })
        ));

        t.manylinux = Some("2.17.1".into());
        assert!(t.wheel_tag().is_err());
    }

    #[test]
    fn unknown_platform_fails_to_parse() {
        let err = toml::from_str::<Target>(
            "url = 'u'\nname = 'n'\nplatform = 'freebsd'\narch = 'amd64'\n",
        );
        assert!(err.is_err());
    }
}
