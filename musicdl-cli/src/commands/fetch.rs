//! Fetch command - download targets into a directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use musicdl_core::ConflictDecision;
use musicdl_fetch::{CancellationToken, FetchContext, FetchOptions, FetchScheduler};
use musicdl_hosts::HostCatalog;
use musicdl_store::{CookieStore, Settings, expand_home};
use tracing::{info, warn};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the fetch command.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// URL targets; each is handled by the host that recognizes it.
    #[arg(value_name = "TARGETS")]
    pub targets: Vec<String>,

    /// Destination folder (`~` is expanded, created if missing).
    #[arg(long, short = 'd')]
    pub dest: PathBuf,

    /// Number of tracks downloaded at one time [1-8, default from settings or 4].
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u8).range(1..=8))]
    pub limit: Option<u8>,

    /// Action when the destination already has the file: ERROR, IGNORE or OVERRIDE.
    #[arg(long, short = 'c', value_name = "ERROR|IGNORE|OVERRIDE")]
    pub conflict: Option<ConflictDecision>,
}

/// Runs the fetch command.
pub async fn run(args: &FetchArgs, cli: &Cli) -> Result<ExitCode> {
    let settings = Settings::load(&cli.settings_file()).await;
    let options = FetchOptions::new(
        expand_home(&args.dest),
        args.limit.map_or(settings.default_limit, usize::from),
    )
    .with_conflict(args.conflict.unwrap_or(settings.default_conflict));

    let store = CookieStore::open(cli.cookie_file()).await;
    let ctx = FetchContext::builder()
        .settings(settings.fetch_settings())
        .credentials(Arc::new(store))
        .build();

    let registry = HostCatalog::build_registry(&ctx).context("Invalid host registry")?;
    let scheduler = FetchScheduler::new(Arc::new(registry), &ctx);

    info!(
        targets = args.targets.len(),
        limit = options.limit,
        conflict = %options.conflict,
        dest = %options.destination.display(),
        "Starting fetch"
    );

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_interrupt(cancel.clone()));

    let report = scheduler.run(&args.targets, &options, cancel).await;
    interrupt.abort();
    let report = report.context("Fetch aborted")?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_report(&report));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_report(&report)?);
        }
    }

    Ok(if report.is_success() {
        ExitCode::Success
    } else {
        ExitCode::Error
    })
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupted, finishing tracks in progress");
        cancel.cancel();
    }
}
