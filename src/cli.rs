//! Command-line surface.
//!
//! Every setting is optional here so configuration files and `FERRY_`
//! environment variables can supply it instead. Only the flags actually
//! given are serialized as overrides.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser, Serialize)]
#[command(name = "ferry", version, about = "Upload a local study directory into a remote project")]
pub struct Cli {
    /// Directory to upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_root: Option<PathBuf>,

    /// Remote project identifier.
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Folder path under the project to upload into, e.g. `studies/2020`.
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_prefix: Option<String>,

    /// Maximum number of files per remote folder (at most 10000).
    #[arg(short = 'c', long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<usize>,

    /// Worker threads for extraction and upload [default: CPU count].
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Write the upload plan to a manifest instead of uploading.
    #[arg(short, long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub manifest_only: bool,

    /// Where to write the manifest [default: manifest.tsv].
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,

    /// Go through the motions without creating or uploading anything.
    #[arg(short, long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,

    /// Log every annotation of every file.
    #[arg(short, long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub verbose: bool,

    /// Directory under which files are staged before upload.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,

    /// Root directory of the filesystem remote.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_root: Option<PathBuf>,

    /// Configuration file (TOML, YAML or JSON).
    #[arg(long)]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `ferry_pipeline=trace` [default: RUST_LOG, or info].
    #[arg(long)]
    #[serde(skip)]
    pub log_level: Option<String>,

    /// Log file, truncated on every run.
    #[arg(long, default_value = "ferry.log")]
    #[serde(skip)]
    pub log_file: PathBuf,
}
