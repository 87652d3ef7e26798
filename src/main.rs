mod cli;
mod error;
mod logging;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use ferry_config::Config;
use ferry_extract::{DicomReader, Extractor};
use ferry_pipeline::error::ErrorKind as PipelineErrorKind;
use ferry_pipeline::{Canceller, Context};
use ferry_remote::LocalService;
use std::process::ExitCode;
use std::sync::Arc;

const EXIT_FATAL: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.log_level.as_deref(), &cli.log_file) {
        eprintln!("ferry: {e:?}");
        return ExitCode::from(EXIT_FATAL);
    }
    match execute(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:?}");
            ExitCode::from(EXIT_FATAL)
        },
    }
}

async fn execute(cli: &Cli) -> Result<u8> {
    let config = Config::load(cli.config.as_deref(), cli).or_raise(|| ErrorKind::Configuration)?;
    tracing::debug!(?config, "Configuration loaded");
    let ctx = Context::from_config(&config).or_raise(|| ErrorKind::Configuration)?;

    let remote_root = config.remote_root().or_raise(|| ErrorKind::Configuration)?;
    let mut service = LocalService::new("local", &remote_root).or_raise(|| ErrorKind::Remote)?;
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        service = service.with_login(username, password);
    }
    let extractor = Extractor::new(Arc::new(DicomReader));

    let canceller = Canceller::new();
    let interrupts = tokio::spawn(listen_for_interrupts(canceller.clone()));
    let outcome = ferry_pipeline::run(&ctx, &service, &extractor, &canceller).await;
    interrupts.abort();

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) if matches!(&*e, PipelineErrorKind::Cancelled) => {
            tracing::warn!("Cancelled before any upload started");
            return Ok(EXIT_CANCELLED);
        },
        Err(e) => return Err(e).or_raise(|| ErrorKind::Pipeline),
    };
    summary.log();
    Ok(u8::try_from(summary.exit_code()).unwrap_or(EXIT_FATAL))
}

/// Turn every Ctrl-C into a cancellation request; only the first one counts.
async fn listen_for_interrupts(canceller: Canceller) {
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Interrupts will not be handled: {e}");
            return;
        }
        if !canceller.request() {
            tracing::debug!("Already canceling");
        }
    }
}
