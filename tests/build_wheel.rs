use std::io::{Cursor, Read, Write};
use std::path::Path;

use pack_binary::config::Manifest;
use pack_binary::wheel::verify_wheel;
use pack_binary::{package_archive, resolve_target};
use zip::write::SimpleFileOptions;

const PYPROJECT: &str = r#"
[project]
name = "dprint-py"
version = "0.51.1.0"
requires-python = ">=3.8"
description = "dprint code formatter"
readme = "README.md"
authors = [{ name = "Packager", email = "packager@example.com" }]

[tool.pack-binary]
cmd = "dprint"
context = { version = "0.51.1" }

[[tool.pack-binary.target]]
url = "https://github.com/dprint/dprint/releases/download/{{ version }}/dprint-x86_64-unknown-linux-gnu.zip"
name = "dprint"
platform = "linux"
arch = "amd64"
manylinux = "2.17"

[[tool.pack-binary.target]]
url = "https://github.com/dprint/dprint/releases/download/{{ version }}/dprint-x86_64-pc-windows-msvc.zip"
name = "dprint.exe"
platform = "win32"
arch = "amd64"
"#;

fn upstream_zip(name: &str, content: &[u8]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("LICENSE", SimpleFileOptions::default().unix_permissions(0o644))
        .unwrap();
    zip.write_all(b"MIT").unwrap();
    zip.start_file(name, SimpleFileOptions::default().unix_permissions(0o755))
        .unwrap();
    zip.write_all(content).unwrap();
    zip.finish().unwrap().into_inner()
}

fn manifest_in(dir: &Path) -> Manifest {
    std::fs::write(dir.join("README.md"), "# dprint-py\n").unwrap();
    let path = dir.join("pyproject.toml");
    std::fs::write(&path, PYPROJECT).unwrap();
    Manifest::load(&path).unwrap()
}

fn read_entry(wheel: &Path, name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(wheel).unwrap()).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = Vec::new();
    file.read_to_end(&mut out).unwrap();
    out
}

#[test]
fn linux_wheel_installs_binary_as_script() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = manifest_in(dir.path());
    let resolved = resolve_target(&manifest, &manifest.targets[0]).unwrap();
    assert!(!resolved.url.contains('{'));

    let archive = upstream_zip("dprint", b"\x7fELF dprint");
    let wheel = package_archive(&manifest, &resolved, &archive).unwrap();
    let out = dir.path().join("dist");
    let path = wheel.write_to(&out).unwrap();

    assert_eq!(
        path,
        out.join("dprint_py-0.51.1.0-py3-none-manylinux_2_17_x86_64.whl")
    );
    assert_eq!(
        read_entry(&path, "dprint_py-0.51.1.0.data/scripts/dprint"),
        b"\x7fELF dprint"
    );

    let metadata = String::from_utf8(read_entry(&path, "dprint_py-0.51.1.0.dist-info/METADATA")).unwrap();
    assert!(metadata.starts_with("Metadata-Version: 2.4\nName: dprint-py\nVersion: 0.51.1.0\n"));
    assert!(metadata.contains("Author: Packager <packager@example.com>\n"));
    assert!(metadata.ends_with("\n# dprint-py\n\n"));

    let verified = verify_wheel(&path).unwrap();
    assert_eq!(verified.files, 4);
    assert_eq!(verified.tag.as_deref(), Some("py3-none-manylinux_2_17_x86_64"));
}

#[test]
fn windows_wheel_uses_exe_script() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = manifest_in(dir.path());
    let resolved = resolve_target(&manifest, &manifest.targets[1]).unwrap();

    let wheel = package_archive(&manifest, &resolved, &upstream_zip("dprint.exe", b"MZ")).unwrap();
    assert_eq!(wheel.file_name, "dprint_py-0.51.1.0-py3-none-win_amd64.whl");
    let path = wheel.write_to(dir.path()).unwrap();
    assert_eq!(read_entry(&path, "dprint_py-0.51.1.0.data/scripts/dprint.exe"), b"MZ");
}

#[test]
fn archive_without_declared_binary_fails() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = manifest_in(dir.path());
    let resolved = resolve_target(&manifest, &manifest.targets[0]).unwrap();

    let err = package_archive(&manifest, &resolved, &upstream_zip("dprint-renamed", b"x")).unwrap_err();
    assert!(format!("{err:#}").contains("dprint"));
}

#[test]
fn rebuilding_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = manifest_in(dir.path());
    let resolved = resolve_target(&manifest, &manifest.targets[0]).unwrap();
    let archive = upstream_zip("dprint", b"\x7fELF dprint");

    let first = package_archive(&manifest, &resolved, &archive)
        .unwrap()
        .to_bytes()
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(1100));
    let second = package_archive(&manifest, &resolved, &archive)
        .unwrap()
        .to_bytes()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_target_url_resolves_without_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = manifest_in(dir.path());
    for target in &manifest.targets {
        let resolved = resolve_target(&manifest, target).unwrap();
        assert!(!resolved.url.contains("{{"), "{}", resolved.url);
        assert!(resolved.url.contains("/0.51.1/"));
    }
}
