//! Layered configuration for ferry.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults (serde field defaults).
//! 2. A configuration file: an explicit path, or `ferry.{toml,yaml,json}` in
//!    the platform configuration directory.
//! 3. Environment variables prefixed `FERRY_` (nested keys split on `__`,
//!    e.g. `FERRY_RETRY__DELAY_SECS`).
//! 4. Command-line overrides.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hard ceiling on the number of entities in one remote container.
pub const MAX_CAPACITY: usize = 10_000;
pub const ENV_PREFIX: &str = "FERRY_";
const APPLICATION: &str = "ferry";

#[derive(Clone, Deserialize)]
pub struct Config {
    /// Remote project identifier.
    pub project: String,
    /// Directory tree to ingest.
    pub local_root: PathBuf,
    /// Slash separated folder path under the project.
    #[serde(default)]
    pub remote_prefix: Option<String>,
    #[serde(default = "default_max_capacity")]
    pub max_capacity: usize,
    /// Size of both the extraction and upload worker pools.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Write a manifest instead of uploading.
    #[serde(default)]
    pub manifest_only: bool,
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,
    #[serde(default)]
    pub dry_run: bool,
    /// Log every annotation of every file.
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "std::env::temp_dir")]
    pub staging_dir: PathBuf,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Root directory of the filesystem-backed remote service.
    #[serde(default)]
    pub remote_root: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}
impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}
impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

fn default_max_capacity() -> usize {
    MAX_CAPACITY
}

/// Host parallelism, or 1 if it cannot be determined.
pub fn default_threads() -> usize {
    std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("manifest.tsv")
}

fn default_max_attempts() -> u32 {
    5
}

fn default_delay_secs() -> u64 {
    3
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

impl Config {
    /// Build the layered figment, without CLI overrides.
    ///
    /// An explicit file must exist and have a recognised extension. Without
    /// one, any `ferry.toml`, `ferry.yaml` or `ferry.json` found in the
    /// platform configuration directory is merged (in that order).
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new();
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
                }
                figment = match path.extension().and_then(|ext| ext.to_str()) {
                    Some("toml") => figment.merge(Toml::file_exact(path)),
                    Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                    Some("json") => figment.merge(Json::file_exact(path)),
                    _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
                };
            },
            None => {
                if let Some(dirs) = project_dirs() {
                    let dir = dirs.config_dir();
                    tracing::debug!(dir = %dir.display(), "Looking for configuration files");
                    figment = figment
                        .merge(Toml::file_exact(dir.join("ferry.toml")))
                        .merge(Yaml::file_exact(dir.join("ferry.yaml")))
                        .merge(Json::file_exact(dir.join("ferry.json")));
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load, apply `overrides` on top of every other source, and validate.
    ///
    /// `overrides` must serialize to a map; unset fields should be skipped
    /// rather than serialized as `None`.
    pub fn load<T: Serialize>(explicit: Option<&Path>, overrides: &T) -> Result<Self> {
        Self::from_figment(Self::figment(explicit)?.merge(Serialized::defaults(overrides)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| ErrorKind::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            exn::bail!(ErrorKind::MissingProject);
        }
        if self.max_capacity == 0 {
            exn::bail!(ErrorKind::ZeroCapacity);
        }
        if self.max_capacity > MAX_CAPACITY {
            exn::bail!(ErrorKind::CapacityExceeded {
                requested: self.max_capacity,
                max: MAX_CAPACITY,
            });
        }
        if self.threads == 0 {
            exn::bail!(ErrorKind::ZeroThreads);
        }
        if self.retry.max_attempts == 0 {
            exn::bail!(ErrorKind::ZeroAttempts);
        }
        Ok(())
    }

    /// Remote service root, defaulting to the platform data directory.
    pub fn remote_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.remote_root {
            return Ok(root.clone());
        }
        match project_dirs() {
            Some(dirs) => Ok(dirs.data_dir().join("remote")),
            None => exn::bail!(ErrorKind::Invalid("no remote root configured and no home directory".to_string())),
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Config")
            .field("project", &self.project)
            .field("local_root", &self.local_root)
            .field("remote_prefix", &self.remote_prefix)
            .field("max_capacity", &self.max_capacity)
            .field("threads", &self.threads)
            .field("manifest_only", &self.manifest_only)
            .field("manifest_path", &self.manifest_path)
            .field("dry_run", &self.dry_run)
            .field("verbose", &self.verbose)
            .field("staging_dir", &self.staging_dir)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("remote_root", &self.remote_root)
            .field("retry", &self.retry)
            .finish()
    }
}
