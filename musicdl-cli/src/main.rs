// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Music downloader CLI - fetch tracks from streaming hosts with tags and covers.
//!
//! # Examples
//!
//! ```bash
//! # Store the session cookie once
//! downloader cookies set --domain yandex.ru --key Session_id --value <CookieValue>
//!
//! # Fetch an album into ~/Music, skipping files that already exist
//! downloader fetch https://music.yandex.ru/album/123 -d ~/Music -c ignore
//!
//! # Eight parallel downloads, JSON report
//! downloader --format json --pretty fetch <url1> <url2> -d ~/Music -l 8
//!
//! # Host information
//! downloader about yandex.ru
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use musicdl_store::{cookies_path, default_config_dir, settings_path};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{about, cookies, fetch};

// ============================================================================
// CLI Definition
// ============================================================================

/// Music downloader - fetch, tag and store music from streaming hosts.
#[derive(Parser)]
#[command(name = "downloader")]
#[command(about = "Fetches music from streaming hosts, applying tags and cover art")]
#[command(long_about = r#"
Music downloader fetches tracks from streaming hosts, applying tags and cover.

Supported hosts:
  • Yandex Music (domain yandex.ru, key Session_id)

Examples:
  downloader cookies set --domain yandex.ru --key Session_id --value <CookieValue>
  downloader fetch <url> -c ignore -d ~/Downloads
  downloader about yandex.ru
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Quiet mode (no logs, errors only via exit code and report).
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Directory holding the cookie store.
    #[arg(long, global = true, value_name = "DIR")]
    pub cookies: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Returns the cookie store file, honoring `--cookies`.
    pub fn cookie_file(&self) -> PathBuf {
        let dir = self
            .cookies
            .as_deref()
            .map_or_else(default_config_dir, musicdl_store::expand_home);
        cookies_path(&dir)
    }

    /// Returns the settings file.
    pub fn settings_file(&self) -> PathBuf {
        settings_path(&default_config_dir())
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch music from all URL targets applying tags and cover.
    Fetch(fetch::FetchArgs),

    /// Get, set or delete stored cookies.
    Cookies(cookies::CookiesArgs),

    /// Show information about a domain or the whole package.
    About(about::AboutArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Every target and track succeeded (skips included).
    Success = 0,
    /// Command error, or a fetch report with failures.
    Error = 1,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

/// Default directives. Library crates log under `musicdl_*`; this binary's
/// crate is `downloader`.
fn default_directives(debug: bool) -> &'static str {
    if debug {
        "musicdl=debug,downloader=debug,info"
    } else {
        "musicdl=info,downloader=info,warn"
    }
}

fn log_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)))
}

fn setup_logging(debug: bool, quiet: bool) {
    if quiet {
        return;
    }

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .with(log_filter(debug))
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.debug, cli.quiet);

    let result = match &cli.command {
        Commands::Fetch(args) => fetch::run(args, &cli).await,
        Commands::Cookies(args) => cookies::run(args, &cli).await,
        Commands::About(args) => about::run(args, &cli),
    };

    match result {
        Ok(code) => code.into(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::Error.into()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
