//! Archive fetching end to end, without touching the network.
//!
//! Zip fetches are driven from a pre-seeded cache file and git fetches from
//! a local repository, so every test runs offline.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use shipwright::fetch::{fetch, ArchiveKind, ArchiveSource};

fn seed_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, contents) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

fn seed_git_repo(path: &Path) {
    let repo = git2::Repository::init(path).unwrap();
    fs::write(path.join("README.md"), "framework sources\n").unwrap();
    fs::create_dir_all(path.join("lib")).unwrap();
    fs::write(path.join("lib/main.js"), "exports.main = 1;\n").unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new("README.md")).unwrap();
    index.add_path(Path::new("lib/main.js")).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = git2::Signature::now("builder", "builder@localhost").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "initial import", &tree, &[])
        .unwrap();
}

#[test]
fn test_zip_fetch_normalizes_wrapper_directory() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("compiler-latest.zip");
    seed_zip(
        &cache,
        &[
            ("compiler-20100616/compiler.jar", "jar bytes"),
            ("compiler-20100616/COPYING", "license"),
        ],
    );

    let source = ArchiveSource {
        name: "compiler".to_string(),
        url: "http://invalid.invalid/compiler-latest.zip".to_string(),
        dest: dir.path().join("compiler"),
        cache,
        kind: ArchiveKind::Zip,
    };

    fetch(&source, false).unwrap();
    assert_eq!(
        fs::read_to_string(source.dest.join("compiler.jar")).unwrap(),
        "jar bytes"
    );
    assert_eq!(
        fs::read_to_string(source.dest.join("COPYING")).unwrap(),
        "license"
    );
    assert!(!source.dest.join("compiler-20100616").exists());
}

#[test]
fn test_second_fetch_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("toolkit.zip");
    seed_zip(&cache, &[("toolkit-2.3.0/app/run.js", "run")]);

    let source = ArchiveSource {
        name: "toolkit".to_string(),
        url: "http://invalid.invalid/toolkit.zip".to_string(),
        dest: dir.path().join("toolkit"),
        cache,
        kind: ArchiveKind::Zip,
    };

    fetch(&source, false).unwrap();
    // Local edits under the destination survive a repeated fetch
    fs::write(source.dest.join("app/run.js"), "patched").unwrap();
    fetch(&source, false).unwrap();
    assert_eq!(
        fs::read_to_string(source.dest.join("app/run.js")).unwrap(),
        "patched"
    );
}

#[test]
fn test_forced_fetch_discards_local_state() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("toolkit.zip");
    seed_zip(&cache, &[("toolkit-2.3.0/app/run.js", "run")]);

    let source = ArchiveSource {
        name: "toolkit".to_string(),
        url: "http://invalid.invalid/toolkit.zip".to_string(),
        dest: dir.path().join("toolkit"),
        cache,
        kind: ArchiveKind::Zip,
    };

    fetch(&source, false).unwrap();
    fs::write(source.dest.join("app/run.js"), "patched").unwrap();
    fetch(&source, true).unwrap();
    assert_eq!(
        fs::read_to_string(source.dest.join("app/run.js")).unwrap(),
        "run"
    );
}

#[test]
fn test_git_fetch_clones_local_repository() {
    let dir = TempDir::new().unwrap();
    let upstream = dir.path().join("upstream");
    fs::create_dir_all(&upstream).unwrap();
    seed_git_repo(&upstream);

    let source = ArchiveSource {
        name: "tiki".to_string(),
        url: upstream.to_string_lossy().to_string(),
        dest: dir.path().join("frameworks").join("tiki"),
        cache: dir.path().join("frameworks").join("tiki.tgz"),
        kind: ArchiveKind::Git { branch: None },
    };

    fetch(&source, false).unwrap();
    assert_eq!(
        fs::read_to_string(source.dest.join("README.md")).unwrap(),
        "framework sources\n"
    );
    assert_eq!(
        fs::read_to_string(source.dest.join("lib/main.js")).unwrap(),
        "exports.main = 1;\n"
    );
    assert!(source.dest.join(".git").exists());

    // And the clone is idempotent like every other kind
    fetch(&source, false).unwrap();
}
