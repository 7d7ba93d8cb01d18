//! Build configuration for the release pipeline.
//!
//! Configuration is loaded from `shipwright.toml` in the working directory
//! (every field has a default, so the file is optional) and can be overridden
//! on the command line with dotted `key=value` pairs, e.g.
//! `version.number=0.9a3 server.port=8000`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{shiplog_debug, Error, Result};

/// Version metadata stamped into source artifacts during a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    pub number: String,
    pub name: String,
    pub api: String,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            number: "0.9a3".to_string(),
            name: "Edison".to_string(),
            api: "4".to_string(),
        }
    }
}

/// Location of the server checkout and its development listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub directory: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 8080,
            directory: PathBuf::from("../server"),
        }
    }
}

/// Source files carrying the marked version block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StampConfig {
    /// Python module stamped during the server `dist` build.
    pub server_file: PathBuf,
    /// JavaScript module stamped during the embedded client build.
    pub client_file: PathBuf,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            server_file: PathBuf::from("../server/app/__init__.py"),
            client_file: PathBuf::from("plugins/boot/index.js"),
        }
    }
}

/// Upstream framework checkouts pulled into `frameworks/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworksConfig {
    /// Clone with git instead of downloading a branch tarball.
    pub git: bool,
    /// Re-fetch even when the destination already exists.
    pub force: bool,
    /// Account owning the upstream repositories.
    pub account: String,
    /// Repository names to fetch.
    pub repos: Vec<String>,
    pub dest: PathBuf,
}

impl Default for FrameworksConfig {
    fn default() -> Self {
        Self {
            git: false,
            force: false,
            account: "pcwalton".to_string(),
            repos: vec!["tiki".to_string(), "core_test".to_string()],
            dest: PathBuf::from("frameworks"),
        }
    }
}

/// A downloadable zip bundle normalized into a local tool directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    pub url: String,
    pub cache: PathBuf,
    pub dest: PathBuf,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            cache: PathBuf::new(),
            dest: PathBuf::new(),
        }
    }
}

impl BundleConfig {
    fn compiler() -> Self {
        Self {
            url: "https://dl.google.com/closure-compiler/compiler-latest.zip".to_string(),
            cache: PathBuf::from("external/compiler-latest.zip"),
            dest: PathBuf::from("external/compiler"),
        }
    }

    fn jsdocs() -> Self {
        Self {
            url: "https://jsdoc-toolkit.googlecode.com/files/jsdoc_toolkit-2.3.0.zip".to_string(),
            cache: PathBuf::from("external/jsdoc_toolkit-2.3.0.zip"),
            dest: PathBuf::from("external/jsdoc-toolkit"),
        }
    }
}

/// Single-file snapshot downloads wrapped as plugins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JqueryConfig {
    pub url: String,
    pub dest: PathBuf,
}

impl Default for JqueryConfig {
    fn default() -> Self {
        Self {
            url: "https://code.jquery.com/jquery-1.4.2.js".to_string(),
            dest: PathBuf::from("plugins/thirdparty/jquery.js"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix used for release directory and archive names.
    pub product: String,
    pub builddir: PathBuf,
    pub version: VersionConfig,
    pub server: ServerConfig,
    pub stamp: StampConfig,
    pub frameworks: FrameworksConfig,
    pub compiler: BundleConfig,
    pub jsdocs: BundleConfig,
    pub jquery: JqueryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            product: "editor".to_string(),
            builddir: PathBuf::from("tmp"),
            version: VersionConfig::default(),
            server: ServerConfig::default(),
            stamp: StampConfig::default(),
            frameworks: FrameworksConfig::default(),
            compiler: BundleConfig::compiler(),
            jsdocs: BundleConfig::jsdocs(),
            jquery: JqueryConfig::default(),
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        PathBuf::from("shipwright.toml")
    }

    /// Load configuration from the given path, or from `shipwright.toml` in
    /// the working directory. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        shiplog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            shiplog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        shiplog_debug!(
            "Config loaded: version={}, builddir={}",
            config.version.number,
            config.builddir.display()
        );
        Ok(config)
    }

    /// Apply a dotted `key=value` override from the command line.
    pub fn apply_override(&mut self, spec: &str) -> Result<()> {
        let (key, value) = spec
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("expected key=value, got '{}'", spec)))?;
        match key {
            "product" => self.product = value.to_string(),
            "builddir" => self.builddir = PathBuf::from(value),
            "version.number" => self.version.number = value.to_string(),
            "version.name" => self.version.name = value.to_string(),
            "version.api" => self.version.api = value.to_string(),
            "server.address" => self.server.address = value.to_string(),
            "server.port" => {
                self.server.port = value
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid port '{}'", value)))?;
            }
            "server.directory" => self.server.directory = PathBuf::from(value),
            "stamp.server_file" => self.stamp.server_file = PathBuf::from(value),
            "stamp.client_file" => self.stamp.client_file = PathBuf::from(value),
            "frameworks.git" => self.frameworks.git = parse_bool(key, value)?,
            "frameworks.force" => self.frameworks.force = parse_bool(key, value)?,
            "frameworks.account" => self.frameworks.account = value.to_string(),
            _ => {
                return Err(Error::Config(format!("unknown configuration key '{}'", key)));
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(Error::Config(format!(
            "invalid boolean '{}' for key '{}'",
            value, key
        ))),
    }
}
