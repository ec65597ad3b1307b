//! Wheel assembly and deterministic ZIP writing

use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::metadata::{metadata_file, wheel_file};
use super::record::{self, RecordEntry};
use crate::config::Project;
use crate::download::ExtractedBinary;
use crate::target::{Platform, Target};

const REGULAR_FILE_MODE: u32 = 0o644;

/// One file inside a wheel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelEntry {
    pub path: String,
    pub content: Vec<u8>,
    pub unix_mode: u32,
}

/// A fully assembled wheel, ready to be written
#[derive(Debug, Clone)]
pub struct Wheel {
    /// `{dist}-{version}-{tag}.whl`
    pub file_name: String,
    pub tag: String,
    pub entries: Vec<WheelEntry>,
}

/// Inputs shared by every target of one manifest
#[derive(Debug, Clone, Copy)]
pub struct WheelSpec<'a> {
    pub project: &'a Project,
    /// Installed command name, without platform suffix
    pub cmd: &'a str,
    /// Directory the project's relative paths resolve against
    pub root: &'a Path,
}

impl WheelSpec<'_> {
    /// Lay out the wheel for `target` around an extracted `binary`
    ///
    /// Entry order is fixed: script, `WHEEL`, `METADATA`, `RECORD`.
    pub fn assemble(&self, target: &Target, binary: ExtractedBinary) -> Result<Wheel> {
        let tag = target.wheel_tag()?;
        let prefix = self.project.name_with_version();
        let dist_info = format!("{}.dist-info", prefix);

        let script_mode = match target.platform {
            Platform::Win32 => REGULAR_FILE_MODE,
            Platform::Linux | Platform::Osx => binary.executable_mode(),
        };

        let mut entries = vec![
            WheelEntry {
                path: format!(
                    "{}.data/scripts/{}{}",
                    prefix,
                    self.cmd,
                    target.platform.executable_suffix()
                ),
                content: binary.content,
                unix_mode: script_mode,
            },
            WheelEntry {
                path: format!("{}/WHEEL", dist_info),
                content: wheel_file(&tag).into_bytes(),
                unix_mode: REGULAR_FILE_MODE,
            },
            WheelEntry {
                path: format!("{}/METADATA", dist_info),
                content: metadata_file(self.project, self.root)?.into_bytes(),
                unix_mode: REGULAR_FILE_MODE,
            },
        ];

        let record_path = format!("{}/RECORD", dist_info);
        let mut rows: Vec<RecordEntry> = entries
            .iter()
            .map(|e| RecordEntry::for_content(&e.path, &e.content))
            .collect();
        rows.push(RecordEntry::unhashed(&record_path));

        entries.push(WheelEntry {
            path: record_path,
            content: record::render(&rows).into_bytes(),
            unix_mode: REGULAR_FILE_MODE,
        });

        Ok(Wheel {
            file_name: format!("{}-{}.whl", prefix, tag),
            tag,
            entries,
        })
    }
}

impl Wheel {
    /// Serialize to ZIP bytes with fixed timestamps
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(DateTime::default())
                .unix_permissions(entry.unix_mode);
            zip.start_file(entry.path.as_str(), options)
                .with_context(|| format!("Failed to add {} to wheel", entry.path))?;
            zip.write_all(&entry.content)
                .with_context(|| format!("Failed to write {} into wheel", entry.path))?;
        }

        Ok(zip.finish().context("Failed to finish wheel archive")?.into_inner())
    }

    /// Write into `out_dir` atomically, replacing any previous build
    pub fn write_to(&self, out_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

        let final_path = out_dir.join(&self.file_name);
        let bytes = self.to_bytes()?;

        let mut tmp = tempfile::NamedTempFile::with_prefix_in(".pack-binary", out_dir)
            .with_context(|| format!("Failed to create temporary file in {}", out_dir.display()))?;
        tmp.write_all(&bytes)?;
        tmp.persist(&final_path)
            .with_context(|| format!("Failed to move wheel to {}", final_path.display()))?;

        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Arch;
    use std::io::Read;

    fn project() -> Project {
        toml::from_str(
            "name = \"dprint-py\"\nversion = \"0.51.1.0\"\nrequires-python = \">=3.8\"\n",
        )
        .unwrap()
    }

    fn target(platform: Platform) -> Target {
        Target {
            url: "https://example.invalid/a.zip".into(),
            name: "dprint".into(),
            platform,
            arch: Arch::Amd64,
            manylinux: Some("2.17".into()),
            macos_target_version: None,
        }
    }

    fn binary() -> ExtractedBinary {
        ExtractedBinary {
            content: b"\x7fELF fake".to_vec(),
            unix_mode: Some(0o100755),
        }
    }

    #[test]
    fn lays_out_wheel_entries() {
        let project = project();
        let spec = WheelSpec {
            project: &project,
            cmd: "dprint",
            root: Path::new("."),
        };
        let wheel = spec.assemble(&target(Platform::Linux), binary()).unwrap();

        assert_eq!(
            wheel.file_name,
            "dprint_py-0.51.1.0-py3-none-manylinux_2_17_x86_64.whl"
        );
        let paths: Vec<_> = wheel.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "dprint_py-0.51.1.0.data/scripts/dprint",
                "dprint_py-0.51.1.0.dist-info/WHEEL",
                "dprint_py-0.51.1.0.dist-info/METADATA",
                "dprint_py-0.51.1.0.dist-info/RECORD",
            ]
        );
        assert_eq!(wheel.entries[0].unix_mode, 0o755);
    }

    #[test]
    fn windows_script_gets_exe_suffix() {
        let project = project();
        let spec = WheelSpec {
            project: &project,
            cmd: "dprint",
            root: Path::new("."),
        };
        let wheel = spec.assemble(&target(Platform::Win32), binary()).unwrap();
        assert_eq!(wheel.file_name, "dprint_py-0.51.1.0-py3-none-win_amd64.whl");
        assert_eq!(wheel.entries[0].path, "dprint_py-0.51.1.0.data/scripts/dprint.exe");
        assert_eq!(wheel.entries[0].unix_mode, REGULAR_FILE_MODE);
    }

    #[test]
    fn zip_preserves_executable_mode() {
        let project = project();
        let spec = WheelSpec {
            project: &project,
            cmd: "dprint",
            root: Path::new("."),
        };
        let bytes = spec
            .assemble(&target(Platform::Linux), binary())
            .unwrap()
            .to_bytes()
            .unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut script = archive
            .by_name("dprint_py-0.51.1.0.data/scripts/dprint")
            .unwrap();
        assert_eq!(script.unix_mode().map(|m| m & 0o777), Some(0o755));
        let mut content = Vec::new();
        script.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"\x7fELF fake");
    }

    #[test]
    fn write_to_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let project = project();
        let spec = WheelSpec {
            project: &project,
            cmd: "dprint",
            root: Path::new("."),
        };
        let wheel = spec.assemble(&target(Platform::Linux), binary()).unwrap();

        let first = wheel.write_to(dir.path()).unwrap();
        let second = wheel.write_to(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), wheel.to_bytes().unwrap());
    }
}
