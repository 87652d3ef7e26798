use crate::error::{ErrorKind, Result};
use crate::upload::RetryPolicy;
use exn::ResultExt;
use ferry_config::Config;
use ferry_remote::Credentials;
use ferry_remote::path::parse_prefix;
use std::path::PathBuf;

/// Everything one pipeline run needs to know, validated.
#[derive(Debug, Clone)]
pub struct Context {
    pub project: String,
    pub local_root: PathBuf,
    /// Folder segments between the project and the shard folders.
    pub remote_prefix: Vec<String>,
    pub max_capacity: usize,
    pub threads: usize,
    pub manifest_only: bool,
    pub manifest_path: PathBuf,
    pub dry_run: bool,
    pub verbose: bool,
    pub staging_dir: PathBuf,
    pub credentials: Credentials,
    pub retry: RetryPolicy,
}

impl Context {
    /// # Errors
    /// [`ErrorKind::Configuration`] if `config` fails validation or the
    /// remote prefix contains an invalid folder name.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().or_raise(|| ErrorKind::Configuration)?;
        let remote_prefix = match config.remote_prefix.as_deref() {
            Some(raw) => parse_prefix(raw).or_raise(|| ErrorKind::Configuration)?,
            None => Vec::new(),
        };
        Ok(Self {
            project: config.project.trim().to_string(),
            local_root: config.local_root.clone(),
            remote_prefix,
            max_capacity: config.max_capacity,
            threads: config.threads,
            manifest_only: config.manifest_only,
            manifest_path: config.manifest_path.clone(),
            dry_run: config.dry_run,
            verbose: config.verbose,
            staging_dir: config.staging_dir.clone(),
            credentials: Credentials {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            retry: config.retry.into(),
        })
    }
}
