#![allow(dead_code)]

use ferry_extract::Extractor;
use ferry_extract::reader::StaticReader;
use ferry_pipeline::Context;
use ferry_pipeline::upload::RetryPolicy;
use ferry_remote::{Credentials, MockService};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const PROJECT: &str = "syn1";

/// A local tree to ingest plus a staging area, both removed on drop.
pub struct Fixture {
    pub local: TempDir,
    pub staging: TempDir,
    reader: StaticReader,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            local: tempfile::tempdir().unwrap(),
            staging: tempfile::tempdir().unwrap(),
            reader: StaticReader::default(),
        }
    }

    /// Write `contents` to `relative` under the local root.
    pub fn file(&mut self, relative: &str, contents: &str) -> PathBuf {
        let path = self.local.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Write a recognised image whose dataset holds `fields`.
    pub fn image(&mut self, relative: &str, fields: &[(&'static str, &'static str)]) -> PathBuf {
        let path = self.file(relative, relative);
        self.reader = std::mem::take(&mut self.reader).with_dataset(path.clone(), fields.iter().copied());
        path
    }

    pub fn extractor(&self) -> Extractor {
        Extractor::new(Arc::new(self.reader.clone()))
    }

    pub fn context(&self) -> Context {
        Context {
            project: PROJECT.to_string(),
            local_root: self.local.path().to_path_buf(),
            remote_prefix: Vec::new(),
            max_capacity: ferry_pipeline::MAX_CAPACITY,
            threads: 4,
            manifest_only: false,
            manifest_path: self.staging.path().join("manifest.tsv"),
            dry_run: false,
            verbose: true,
            staging_dir: self.staging.path().to_path_buf(),
            credentials: Credentials::default(),
            retry: RetryPolicy::new(5, Duration::from_secs(3)),
        }
    }

    /// Entries left in the staging area, ignoring the manifest.
    pub fn staged(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.staging.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.file_name().is_some_and(|name| name != "manifest.tsv"))
            .collect()
    }
}

pub fn service() -> MockService {
    MockService::default().with_project(PROJECT, "Study")
}

pub fn key(parent: &str, name: &str) -> (String, String) {
    (parent.to_string(), name.to_string())
}

pub fn source<'a>(summary: &'a ferry_pipeline::Summary, path: &Path) -> &'a ferry_pipeline::upload::JobReport {
    summary.reports.iter().find(|report| report.source == path).unwrap()
}
