use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info";

/// Log to the console and to `file` (plain text, truncated first).
///
/// The filter is `level` if given, otherwise `RUST_LOG`, otherwise `info`.
pub fn init(level: Option<&str>, file: &Path) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).or_raise(|| ErrorKind::LogFilter(level.to_string()))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };
    let writer = File::create(file).or_raise(|| ErrorKind::LogFile(file.to_path_buf()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(writer))
                .with_ansi(false)
                .with_filter(filter.clone()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
    Ok(())
}
