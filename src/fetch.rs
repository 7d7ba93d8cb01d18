//! Idempotent archive fetching and normalization.
//!
//! Third-party dependencies are pulled once into a canonical local layout.
//! The destination directory is the cache key: if it exists the fetch is a
//! pure no-op, unless `force` removes it first. A failed download or
//! extraction leaves any partial destination in place; repair is an explicit
//! forced re-fetch.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use git2::build::RepoBuilder;
use zip::ZipArchive;

use crate::util::run_tool;
use crate::{shiplog, shiplog_debug, Error, Result};

/// How a source is fetched and unpacked.
#[derive(Debug, Clone)]
pub enum ArchiveKind {
    /// Clone the repository straight into the destination.
    Git { branch: Option<String> },
    /// Download `<url>/<branch>` as a gzipped tarball whose single top-level
    /// directory becomes the destination.
    Tarball { branch: String },
    /// Download a zip bundle into the cache file, then expand it with its
    /// first path segment stripped.
    Zip,
}

/// A remote dependency and its canonical local location.
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    pub name: String,
    pub url: String,
    pub dest: PathBuf,
    /// Local download cache; only consulted by the zip and tarball kinds.
    pub cache: PathBuf,
    pub kind: ArchiveKind,
}

/// Fetch a source into its destination directory.
///
/// No-op when the destination already exists, unless `force` is set, in
/// which case the destination is removed and fetched fresh.
pub fn fetch(source: &ArchiveSource, force: bool) -> Result<()> {
    if source.dest.exists() {
        if !force {
            shiplog!("{} is already here, no action being taken", source.name);
            return Ok(());
        }
        shiplog!("removing {} for forced re-fetch", source.dest.display());
        fs::remove_dir_all(&source.dest)?;
    }

    match &source.kind {
        ArchiveKind::Git { branch } => clone_repository(source, branch.as_deref()),
        ArchiveKind::Tarball { branch } => fetch_tarball(source, branch),
        ArchiveKind::Zip => fetch_zip(source),
    }
}

fn clone_repository(source: &ArchiveSource, branch: Option<&str>) -> Result<()> {
    shiplog!("cloning {} from {}", source.name, source.url);
    let mut builder = RepoBuilder::new();
    if let Some(branch) = branch {
        builder.branch(branch);
    }
    builder.clone(&source.url, &source.dest)?;
    Ok(())
}

fn fetch_tarball(source: &ArchiveSource, branch: &str) -> Result<()> {
    let url = format!("{}/{}", source.url.trim_end_matches('/'), branch);
    shiplog!("downloading {}/{} as a tarball", source.name, branch);
    download(&url, &source.cache)?;

    // Expand into a staging directory, then promote the archive's single
    // top-level directory to the destination name.
    let staging = staging_dir(source)?;
    let mut cmd = Command::new("tar");
    cmd.arg("xzf").arg(&source.cache).arg("-C").arg(&staging);
    run_tool(cmd)?;

    let top = single_top_level(&staging, &source.name)?;
    if let Some(parent) = source.dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(&top, &source.dest)?;
    fs::remove_dir_all(&staging)?;
    Ok(())
}

fn fetch_zip(source: &ArchiveSource) -> Result<()> {
    if !source.cache.exists() {
        shiplog!("downloading {} from {}", source.name, source.url);
        download(&source.url, &source.cache)?;
    } else {
        shiplog_debug!("using cached {}", source.cache.display());
    }
    shiplog!("uncompressing {}", source.name);
    extract_zip(&source.cache, &source.dest)
}

/// Download a URL into a local file, creating parent directories.
fn download(url: &str, dest: &Path) -> Result<()> {
    let response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        return Err(Error::Network(format!(
            "GET {} returned {}",
            url,
            response.status()
        )));
    }
    let bytes = response.bytes()?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, &bytes)?;
    Ok(())
}

fn staging_dir(source: &ArchiveSource) -> Result<PathBuf> {
    let parent = source.dest.parent().unwrap_or_else(|| Path::new("."));
    let staging = parent.join(format!(".{}-staging", source.name));
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;
    Ok(staging)
}

/// The extracted tarball must contain exactly one top-level directory.
fn single_top_level(staging: &Path, name: &str) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(staging)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    match dirs.len() {
        1 => Ok(dirs.remove(0)),
        n => Err(Error::Config(format!(
            "expected a single top-level directory in the {} tarball, found {}",
            name, n
        ))),
    }
}

/// Expand a zip archive into `dest`, stripping the wrapper directory.
///
/// Entries without a path separator are written directly under `dest`;
/// for all others the first path segment is dropped and the remainder is
/// recreated, with intermediate directories for directory entries.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;
    fs::create_dir_all(dest)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let raw = entry.name().to_string();
        if raw.split('/').any(|part| part == "..") {
            return Err(Error::Config(format!(
                "refusing to expand zip entry escaping the destination: {}",
                raw
            )));
        }

        let target = match raw.split_once('/') {
            // Flat entry: keep it at the destination root
            None => dest.join(&raw),
            // The wrapper directory itself
            Some((_, "")) => continue,
            // Strip the first segment
            Some((_, rest)) => dest.join(rest),
        };

        if raw.ends_with('/') {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            shiplog_debug!("expanding {}", target.display());
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
        }
    }
    Ok(())
}
